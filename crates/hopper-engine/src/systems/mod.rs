//! Per-tick systems.
//!
//! Each system is a free function over an explicit `&mut World`. The driver
//! runs them in a fixed order -- input, AI, physics, collision -- and every
//! system sees the mutations committed by the ones before it. Entities that
//! lack a component a system needs are skipped, never treated as errors.

pub mod ai;
pub mod collision;
pub mod input;
pub mod physics;

pub use ai::ai_system;
pub use collision::{collision_system, Aabb, CollisionReport};
pub use input::{input_system, InputState};
pub use physics::physics_system;

/// Names of the systems in execution order, as reported in diagnostics.
pub const SYSTEM_ORDER: [&str; 4] = ["input", "ai", "physics", "collision"];
