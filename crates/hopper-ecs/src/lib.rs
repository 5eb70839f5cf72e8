//! Hopper ECS -- sparse-table Entity Component System for the platformer core.
//!
//! Entities are opaque, monotonically allocated ids. Each component kind is
//! stored in its own typed [`ComponentTable`](table::ComponentTable), so
//! "does entity X have component Y" is an explicit lookup rather than an
//! implicit null check. Tables iterate in ascending entity order, which keeps
//! every system pass deterministic.
//!
//! # Quick Start
//!
//! ```
//! use hopper_ecs::prelude::*;
//!
//! let mut world = World::new();
//! let entity = world.create_entity();
//! world.insert(entity, Position::new(0.0, 0.0)).unwrap();
//! world.insert(entity, Velocity::new(1.0, 0.0)).unwrap();
//!
//! assert_eq!(world.get::<Position>(entity), Some(&Position::new(0.0, 0.0)));
//!
//! world.destroy_entity(entity);
//! assert!(!world.has::<Velocity>(entity));
//! ```

#![deny(unsafe_code)]

pub mod components;
pub mod entity;
pub mod snapshot;
pub mod table;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// A component was written to an entity that is not live.
    #[error("cannot set '{component}' on entity {entity:?}: entity is not alive")]
    DeadEntity {
        entity: entity::EntityId,
        component: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::components::{
        AiControlled, Collision, Direction, EntityKind, Goal, Physics, PlayerControlled,
        Position, PreviousPosition, Renderable, ScoreValue, State, Velocity,
    };
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::snapshot::{AllocatorSnapshot, WorldSnapshot};
    pub use crate::table::ComponentTable;
    pub use crate::world::{Component, World};
    pub use crate::EcsError;
}
