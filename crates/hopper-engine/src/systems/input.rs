//! Player input handling.

use hopper_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

/// Input flags sampled once per tick from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl InputState {
    pub const IDLE: Self = Self {
        left: false,
        right: false,
        jump: false,
    };

    pub const LEFT: Self = Self {
        left: true,
        right: false,
        jump: false,
    };

    pub const RIGHT: Self = Self {
        left: false,
        right: true,
        jump: false,
    };

    pub const JUMP: Self = Self {
        left: false,
        right: false,
        jump: true,
    };
}

/// Apply input flags to the player-controlled entity.
///
/// Horizontal: left is evaluated before right, so holding both moves right.
/// Facing only changes on nonzero horizontal input. A jump only starts from
/// the ground.
pub fn input_system(world: &mut World, input: &InputState, config: &GameConfig) {
    let Some(player) = world.player() else {
        return;
    };
    let (Some(velocity), Some(state)) = (
        world.velocity.get_mut(player),
        world.state.get_mut(player),
    ) else {
        return;
    };

    velocity.vx = 0.0;
    if input.left {
        velocity.vx = -config.player_speed;
        state.direction = Some(Direction::Left);
    }
    if input.right {
        velocity.vx = config.player_speed;
        state.direction = Some(Direction::Right);
    }

    if !input.jump {
        return;
    }
    let Some(physics) = world.physics.get_mut(player) else {
        return;
    };
    if physics.on_ground {
        velocity.vy = -config.jump_force;
        physics.on_ground = false;
        state.is_jumping = Some(true);
        tracing::trace!(entity = %player, "jump");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_world(on_ground: bool) -> (World, EntityId) {
        let mut world = World::new();
        let p = world.create_entity();
        world.player_controlled.insert(p, PlayerControlled);
        world.velocity.insert(p, Velocity::default());
        world.state.insert(p, State::player());
        world.physics.insert(p, Physics { on_ground });
        (world, p)
    }

    #[test]
    fn left_and_right_set_speed_and_facing() {
        let config = GameConfig::default();
        let (mut world, p) = player_world(true);

        input_system(&mut world, &InputState::LEFT, &config);
        assert_eq!(world.velocity.get(p).unwrap().vx, -config.player_speed);
        assert_eq!(world.state.get(p).unwrap().direction, Some(Direction::Left));

        input_system(&mut world, &InputState::RIGHT, &config);
        assert_eq!(world.velocity.get(p).unwrap().vx, config.player_speed);
        assert_eq!(world.state.get(p).unwrap().direction, Some(Direction::Right));
    }

    #[test]
    fn both_held_moves_right() {
        let config = GameConfig::default();
        let (mut world, p) = player_world(true);
        let both = InputState {
            left: true,
            right: true,
            jump: false,
        };
        input_system(&mut world, &both, &config);
        assert_eq!(world.velocity.get(p).unwrap().vx, config.player_speed);
        assert_eq!(world.state.get(p).unwrap().direction, Some(Direction::Right));
    }

    #[test]
    fn no_horizontal_input_stops_but_keeps_facing() {
        let config = GameConfig::default();
        let (mut world, p) = player_world(true);
        input_system(&mut world, &InputState::LEFT, &config);
        input_system(&mut world, &InputState::IDLE, &config);
        assert_eq!(world.velocity.get(p).unwrap().vx, 0.0);
        assert_eq!(world.state.get(p).unwrap().direction, Some(Direction::Left));
    }

    #[test]
    fn jump_requires_ground() {
        let config = GameConfig::default();

        let (mut world, p) = player_world(false);
        input_system(&mut world, &InputState::JUMP, &config);
        assert_eq!(world.velocity.get(p).unwrap().vy, 0.0);
        assert!(!world.state.get(p).unwrap().jumping());

        let (mut world, p) = player_world(true);
        input_system(&mut world, &InputState::JUMP, &config);
        assert_eq!(world.velocity.get(p).unwrap().vy, -config.jump_force);
        assert!(!world.physics.get(p).unwrap().on_ground);
        assert!(world.state.get(p).unwrap().jumping());
    }

    #[test]
    fn missing_components_are_skipped() {
        let config = GameConfig::default();
        let mut world = World::new();
        let p = world.create_entity();
        world.player_controlled.insert(p, PlayerControlled);
        world.velocity.insert(p, Velocity::default());
        input_system(&mut world, &InputState::RIGHT, &config);
        assert_eq!(world.velocity.get(p).unwrap().vx, 0.0);
    }
}
