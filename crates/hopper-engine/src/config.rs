//! Tunable simulation constants.
//!
//! [`GameConfig`] gathers every constant the systems and driver read: tile
//! and level geometry, movement tuning, and session rules. Defaults describe
//! the built-in level. Hosts can override any subset from JSON; missing
//! fields fall back to their defaults.
//!
//! ```
//! use hopper_engine::config::GameConfig;
//!
//! let config = GameConfig::from_json_str(r#"{ "gravity": 1200.0 }"#).unwrap();
//! assert_eq!(config.gravity, 1200.0);
//! assert_eq!(config.tile_size, GameConfig::default().tile_size);
//! ```

use hopper_ecs::components::Position;
use serde::{Deserialize, Serialize};

/// Errors produced while loading or validating a [`GameConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value the simulation cannot run with.
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    /// The JSON input could not be parsed.
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Simulation constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Edge length of one grid cell, in pixels.
    pub tile_size: f64,
    /// Level width in tiles.
    pub level_width: usize,
    /// Level height in tiles.
    pub level_height: usize,
    /// Downward acceleration in pixels/s^2.
    pub gravity: f64,
    /// Terminal falling speed in pixels/s.
    pub max_fall_speed: f64,
    /// Horizontal player speed in pixels/s.
    pub player_speed: f64,
    /// Initial upward speed of a jump in pixels/s.
    pub jump_force: f64,
    /// Horizontal enemy patrol speed in pixels/s.
    pub enemy_speed: f64,
    /// How far an enemy may stray from its spawn column, in pixels.
    pub enemy_patrol_range: f64,
    /// Lives at the start of a session.
    pub initial_lives: u32,
    /// Countdown at the start of a session, in seconds.
    pub initial_time: f64,
    /// Length of the post-hit invincibility window, in seconds.
    pub invincibility_duration: f64,
    /// Width of the host viewport, in pixels. The camera keeps the player
    /// centred in it.
    pub viewport_width: f64,
    /// Points for collecting a coin-block.
    pub coin_score: u32,
    /// Points for stomping an enemy.
    pub enemy_score: u32,
    /// Player collision box edge as a fraction of `tile_size`.
    pub player_size_ratio: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: 40.0,
            level_width: 60,
            level_height: 15,
            gravity: 1800.0,
            max_fall_speed: 900.0,
            player_speed: 250.0,
            jump_force: 720.0,
            enemy_speed: 60.0,
            enemy_patrol_range: 80.0,
            initial_lives: 3,
            initial_time: 300.0,
            invincibility_duration: 2.0,
            viewport_width: 800.0,
            coin_score: 100,
            enemy_score: 200,
            player_size_ratio: 0.8,
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input and
    /// [`ConfigError::Invalid`] if a field fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("tile_size", self.tile_size),
            ("gravity", self.gravity),
            ("max_fall_speed", self.max_fall_speed),
            ("player_speed", self.player_speed),
            ("jump_force", self.jump_force),
            ("initial_time", self.initial_time),
            ("invincibility_duration", self.invincibility_duration),
            ("viewport_width", self.viewport_width),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive and finite, got {value}"),
                });
            }
        }

        let non_negative = [
            ("enemy_speed", self.enemy_speed),
            ("enemy_patrol_range", self.enemy_patrol_range),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be non-negative and finite, got {value}"),
                });
            }
        }

        if !(self.player_size_ratio > 0.0 && self.player_size_ratio <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "player_size_ratio",
                reason: format!("must be in (0, 1], got {}", self.player_size_ratio),
            });
        }
        // The spawn row sits four tiles above the bottom edge.
        if self.level_height < 4 {
            return Err(ConfigError::Invalid {
                field: "level_height",
                reason: format!("must be at least 4, got {}", self.level_height),
            });
        }
        if self.level_width < 3 {
            return Err(ConfigError::Invalid {
                field: "level_width",
                reason: format!("must be at least 3, got {}", self.level_width),
            });
        }
        if self.initial_lives == 0 {
            return Err(ConfigError::Invalid {
                field: "initial_lives",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Where the player appears at session start and after falling off.
    pub fn spawn_point(&self) -> Position {
        Position::new(
            2.0 * self.tile_size,
            (self.level_height as f64 - 4.0) * self.tile_size,
        )
    }

    /// Height of the level in pixels. Falling below it costs a life.
    pub fn world_height(&self) -> f64 {
        self.level_height as f64 * self.tile_size
    }

    /// Edge length of the player's collision box.
    pub fn player_size(&self) -> f64 {
        self.tile_size * self.player_size_ratio
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
