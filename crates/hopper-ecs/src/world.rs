//! The [`World`] is the top-level container for the ECS. It owns the entity
//! allocator and one [`ComponentTable`] per component kind.
//!
//! Tables are public fields so that systems can borrow several of them at
//! once (iterate one, mutate another) without going through the world's
//! generic accessors.

use crate::components::{
    AiControlled, Collision, Goal, Physics, PlayerControlled, Position, PreviousPosition,
    Renderable, ScoreValue, State, Velocity,
};
use crate::entity::{EntityAllocator, EntityId};
use crate::table::ComponentTable;
use crate::EcsError;

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// A type stored in one of the world's component tables.
///
/// Implemented for every type in [`components`](crate::components); it maps
/// the type to its table so the generic accessors on [`World`] work.
pub trait Component: Clone + 'static {
    /// Name of the table, used in logs and snapshots.
    const NAME: &'static str;

    fn table(world: &World) -> &ComponentTable<Self>;

    fn table_mut(world: &mut World) -> &mut ComponentTable<Self>;
}

macro_rules! impl_component {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Component for $ty {
                const NAME: &'static str = stringify!($field);

                #[inline]
                fn table(world: &World) -> &ComponentTable<Self> {
                    &world.$field
                }

                #[inline]
                fn table_mut(world: &mut World) -> &mut ComponentTable<Self> {
                    &mut world.$field
                }
            }
        )*

        impl World {
            /// Remove every component entry belonging to `entity`.
            fn purge_components(&mut self, entity: EntityId) {
                $( self.$field.remove(entity); )*
            }
        }
    };
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// All entities and their component tables.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub(crate) allocator: EntityAllocator,
    pub position: ComponentTable<Position>,
    pub previous_position: ComponentTable<PreviousPosition>,
    pub velocity: ComponentTable<Velocity>,
    pub renderable: ComponentTable<Renderable>,
    pub player_controlled: ComponentTable<PlayerControlled>,
    pub physics: ComponentTable<Physics>,
    pub ai_controlled: ComponentTable<AiControlled>,
    pub collision: ComponentTable<Collision>,
    pub state: ComponentTable<State>,
    pub score_value: ComponentTable<ScoreValue>,
    pub goal: ComponentTable<Goal>,
}

impl_component! {
    Position => position,
    PreviousPosition => previous_position,
    Velocity => velocity,
    Renderable => renderable,
    PlayerControlled => player_controlled,
    Physics => physics,
    AiControlled => ai_controlled,
    Collision => collision,
    State => state,
    ScoreValue => score_value,
    Goal => goal,
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Allocate a new live entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Destroy an entity and purge all of its components.
    ///
    /// Idempotent: returns `false` and does nothing if the entity is not live.
    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        if !self.allocator.deallocate(entity) {
            return false;
        }
        self.purge_components(entity);
        tracing::trace!(entity = %entity, "entity destroyed");
        true
    }

    /// Whether the entity is live.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Live entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.allocator.iter()
    }

    /// The id the next [`create_entity`](Self::create_entity) will return.
    pub fn next_entity_id(&self) -> u64 {
        self.allocator.next_id()
    }

    // -- generic component access ------------------------------------------

    /// Get a component value.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        T::table(self).get(entity)
    }

    /// Get a mutable component value.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        T::table_mut(self).get_mut(entity)
    }

    /// Whether the entity has a component of type `T`.
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        T::table(self).contains(entity)
    }

    /// Set a component on a live entity, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DeadEntity`] if the entity is not live; the tables
    /// are left untouched.
    pub fn insert<T: Component>(&mut self, entity: EntityId, value: T) -> Result<(), EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::DeadEntity {
                entity,
                component: T::NAME,
            });
        }
        T::table_mut(self).insert(entity, value);
        Ok(())
    }

    /// Remove a component, returning it if present.
    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        T::table_mut(self).remove(entity)
    }

    // -- queries -------------------------------------------------------------

    /// The single player-controlled entity, if any.
    pub fn player(&self) -> Option<EntityId> {
        self.player_controlled.first()
    }

    /// Top-left and size of the entity's collision box, if it has both a
    /// [`Position`] and a [`Collision`].
    pub fn aabb(&self, entity: EntityId) -> Option<(Position, Collision)> {
        let pos = self.position.get(entity)?;
        let col = self.collision.get(entity)?;
        Some((*pos, *col))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
