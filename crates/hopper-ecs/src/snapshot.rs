//! World snapshot support.
//!
//! Provides [`WorldSnapshot`] -- a fully serializable, deterministic dump of
//! the world: the allocator state and every component table as ordered
//! `(entity, value)` rows. Two worlds with identical contents produce
//! byte-identical serialized snapshots, which is what state hashing relies on.

use serde::{Deserialize, Serialize};

use crate::components::{
    AiControlled, Collision, Goal, Physics, PlayerControlled, Position, PreviousPosition,
    Renderable, ScoreValue, State, Velocity,
};
use crate::entity::{EntityAllocator, EntityId};
use crate::table::ComponentTable;
use crate::world::World;

/// Serializable snapshot of the [`EntityAllocator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorSnapshot {
    /// The id the next allocation will produce.
    pub next_id: u64,
    /// Live ids in ascending order.
    pub alive: Vec<EntityId>,
}

/// A complete, serializable snapshot of the world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub allocator: AllocatorSnapshot,
    pub position: Vec<(EntityId, Position)>,
    pub previous_position: Vec<(EntityId, PreviousPosition)>,
    pub velocity: Vec<(EntityId, Velocity)>,
    pub renderable: Vec<(EntityId, Renderable)>,
    pub player_controlled: Vec<(EntityId, PlayerControlled)>,
    pub physics: Vec<(EntityId, Physics)>,
    pub ai_controlled: Vec<(EntityId, AiControlled)>,
    pub collision: Vec<(EntityId, Collision)>,
    pub state: Vec<(EntityId, State)>,
    pub score_value: Vec<(EntityId, ScoreValue)>,
    pub goal: Vec<(EntityId, Goal)>,
}

impl World {
    /// Capture a complete snapshot of the world state.
    pub fn capture_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            allocator: AllocatorSnapshot {
                next_id: self.allocator.next_id(),
                alive: self.allocator.iter().collect(),
            },
            position: self.position.to_rows(),
            previous_position: self.previous_position.to_rows(),
            velocity: self.velocity.to_rows(),
            renderable: self.renderable.to_rows(),
            player_controlled: self.player_controlled.to_rows(),
            physics: self.physics.to_rows(),
            ai_controlled: self.ai_controlled.to_rows(),
            collision: self.collision.to_rows(),
            state: self.state.to_rows(),
            score_value: self.score_value.to_rows(),
            goal: self.goal.to_rows(),
        }
    }

    /// Rebuild a world from a snapshot.
    ///
    /// Rows referring to entities that are not listed as alive are dropped
    /// with a warning, so the restored world never holds components for dead
    /// entities.
    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Self {
        let allocator = EntityAllocator::restore(
            snapshot.allocator.next_id,
            snapshot.allocator.alive.iter().copied(),
        );

        fn rows<T: Clone>(
            allocator: &EntityAllocator,
            table: &'static str,
            rows: &[(EntityId, T)],
        ) -> ComponentTable<T> {
            rows.iter()
                .filter(|(e, _)| {
                    let alive = allocator.is_alive(*e);
                    if !alive {
                        tracing::warn!(
                            entity = %e,
                            table,
                            "snapshot row refers to a dead entity -- skipping"
                        );
                    }
                    alive
                })
                .cloned()
                .collect()
        }

        Self {
            position: rows(&allocator, "position", &snapshot.position),
            previous_position: rows(&allocator, "previous_position", &snapshot.previous_position),
            velocity: rows(&allocator, "velocity", &snapshot.velocity),
            renderable: rows(&allocator, "renderable", &snapshot.renderable),
            player_controlled: rows(&allocator, "player_controlled", &snapshot.player_controlled),
            physics: rows(&allocator, "physics", &snapshot.physics),
            ai_controlled: rows(&allocator, "ai_controlled", &snapshot.ai_controlled),
            collision: rows(&allocator, "collision", &snapshot.collision),
            state: rows(&allocator, "state", &snapshot.state),
            score_value: rows(&allocator, "score_value", &snapshot.score_value),
            goal: rows(&allocator, "goal", &snapshot.goal),
            allocator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_world_snapshot() {
        let world = World::new();
        let snap = world.capture_snapshot();
        assert_eq!(snap.allocator.next_id, 0);
        assert!(snap.allocator.alive.is_empty());
        assert!(snap.position.is_empty());
    }

    #[test]
    fn snapshot_restore_preserves_contents_and_allocation() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        world.insert(a, Position::new(1.0, 2.0)).unwrap();
        world.insert(b, Velocity::new(3.0, 4.0)).unwrap();
        world.destroy_entity(a);

        let snap = world.capture_snapshot();
        let mut restored = World::from_snapshot(&snap);

        assert!(!restored.is_alive(a));
        assert!(restored.is_alive(b));
        assert_eq!(restored.get::<Velocity>(b), Some(&Velocity::new(3.0, 4.0)));
        assert_eq!(restored.capture_snapshot(), snap);

        // Allocation continues where the original left off.
        let c = restored.create_entity();
        assert_eq!(c.to_raw(), 2);
    }

    #[test]
    fn rows_for_dead_entities_are_dropped() {
        let mut world = World::new();
        let a = world.create_entity();
        world.insert(a, Position::new(1.0, 1.0)).unwrap();
        let mut snap = world.capture_snapshot();
        snap.allocator.alive.clear();

        let restored = World::from_snapshot(&snap);
        assert!(restored.position.is_empty());
    }

    #[test]
    fn identical_worlds_serialize_identically() {
        let build = || {
            let mut world = World::new();
            for i in 0..5 {
                let e = world.create_entity();
                world.insert(e, Position::new(i as f64, 0.0)).unwrap();
            }
            serde_json::to_vec(&world.capture_snapshot()).unwrap()
        };
        assert_eq!(build(), build());
    }
}
