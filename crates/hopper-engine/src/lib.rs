//! Hopper Engine -- the platformer simulation core built on [`hopper_ecs`].
//!
//! The crate turns a tile grid into a world ([`level`]), runs the per-tick
//! system pipeline over it ([`systems`]), drives session status, score, lives
//! and time ([`game`]), and publishes immutable frames for presentation
//! layers ([`frame`]). Runs can be recorded and re-verified tick by tick
//! ([`replay`]).
//!
//! The core does no I/O and never installs a `tracing` subscriber; hosts do.
//!
//! # Quick Start
//!
//! ```
//! use hopper_engine::prelude::*;
//!
//! let mut game = Game::new(LevelGrid::level_one(), GameConfig::default()).unwrap();
//! game.start_game();
//!
//! let input = InputState { right: true, jump: true, ..Default::default() };
//! for _ in 0..120 {
//!     game.update(1.0 / 60.0, &input);
//! }
//!
//! let frame = game.frame();
//! assert_eq!(frame.hud.status, GameStatus::Playing);
//! assert!(frame.camera_x >= 0.0);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod frame;
pub mod game;
pub mod level;
pub mod replay;
pub mod systems;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use hopper_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use hopper_ecs::prelude::*;

    pub use crate::config::{ConfigError, GameConfig};
    pub use crate::frame::{EntityView, FrameSnapshot, Hud};
    pub use crate::game::{
        Game, GameError, GameEvent, GameStatus, SessionControl, SessionSnapshot, TickDiagnostics,
        TickOutcome,
    };
    pub use crate::level::{load_world, LevelError, LevelGrid, LoadedLevel, Tile};
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayError, ReplayLog, ReplayRecorder,
        ReplayResult,
    };
    pub use crate::systems::{
        ai_system, collision_system, input_system, physics_system, Aabb, CollisionReport,
        InputState,
    };
}
