//! The platformer component data model.
//!
//! Every component is a plain data record. Which components an entity carries
//! determines what it is: enemies carry [`AiControlled`], the player carries
//! [`PlayerControlled`], and so on.

use serde::{Deserialize, Serialize};

/// World-space top-left corner, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate, growing rightwards.
    pub x: f64,
    /// Vertical coordinate, growing downwards.
    pub y: f64,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Where an entity was before the most recent physics integration step.
///
/// Collision resolution uses it to tell which side of a collider the entity
/// came from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreviousPosition {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl From<Position> for PreviousPosition {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Linear velocity in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    /// Horizontal velocity.
    pub vx: f64,
    /// Vertical velocity (positive is falling).
    pub vy: f64,
}

impl Velocity {
    /// Construct a velocity.
    pub const fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }
}

/// What an entity looks like to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Player,
    Enemy,
    Ground,
    CoinBlock,
    Goal,
}

/// Marks an entity as drawable and says how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderable {
    pub kind: EntityKind,
}

/// Marker for the single input-driven entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerControlled;

/// Ground contact, recomputed by collision every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Physics {
    pub on_ground: bool,
}

/// Facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

/// Patrol behaviour for enemies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiControlled {
    /// Horizontal anchor the patrol range is measured from.
    pub initial_x: f64,
    /// Current facing.
    pub direction: Direction,
}

/// Axis-aligned bounding box size. Combined with [`Position`] it gives the
/// entity's collision box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub width: f64,
    pub height: f64,
}

/// Mutable status flags.
///
/// The player populates `direction`, `is_invincible` and `is_jumping`;
/// coin-blocks populate only `is_collected`. Unpopulated fields are `None`
/// and are omitted from snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_invincible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_jumping: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_collected: Option<bool>,
}

impl State {
    /// Initial player flags: facing right, not invincible, not jumping.
    pub fn player() -> Self {
        Self {
            direction: Some(Direction::Right),
            is_invincible: Some(false),
            is_jumping: Some(false),
            is_collected: None,
        }
    }

    /// Initial coin-block flags: not yet collected.
    pub fn coin_block() -> Self {
        Self {
            is_collected: Some(false),
            ..Self::default()
        }
    }

    pub fn invincible(&self) -> bool {
        self.is_invincible.unwrap_or(false)
    }

    pub fn jumping(&self) -> bool {
        self.is_jumping.unwrap_or(false)
    }

    pub fn collected(&self) -> bool {
        self.is_collected.unwrap_or(false)
    }
}

/// Points awarded when the entity is consumed (stomped or collected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreValue {
    pub value: u32,
}

/// Marker for the level-end trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Goal;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_state_defaults() {
        let s = State::player();
        assert_eq!(s.direction, Some(Direction::Right));
        assert!(!s.invincible());
        assert!(!s.jumping());
        assert!(s.is_collected.is_none());
    }

    #[test]
    fn coin_state_only_populates_collected() {
        let s = State::coin_block();
        assert_eq!(s.is_collected, Some(false));
        assert!(s.direction.is_none());
        assert!(s.is_invincible.is_none());
        assert!(s.is_jumping.is_none());
    }

    #[test]
    fn state_omits_unpopulated_fields() {
        let json = serde_json::to_value(State::coin_block()).unwrap();
        assert_eq!(json, serde_json::json!({"is_collected": false}));
    }

    #[test]
    fn kind_serializes_kebab_case() {
        let json = serde_json::to_value(EntityKind::CoinBlock).unwrap();
        assert_eq!(json, serde_json::json!("coin-block"));
    }
}
