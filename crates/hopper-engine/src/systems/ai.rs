//! Enemy patrol behaviour.

use hopper_ecs::prelude::*;

use crate::config::GameConfig;

/// Keep every AI-controlled entity within its patrol range.
///
/// Past the left bound the entity turns right, past the right bound it turns
/// left; inside the range its velocity is left alone. The result depends only
/// on the current position and the patrol anchor.
pub fn ai_system(world: &mut World, config: &GameConfig) {
    let range = config.enemy_patrol_range;
    for (entity, ai) in world.ai_controlled.iter_mut() {
        let (Some(position), Some(velocity)) =
            (world.position.get(entity), world.velocity.get_mut(entity))
        else {
            continue;
        };

        if position.x < ai.initial_x - range {
            velocity.vx = config.enemy_speed;
            ai.direction = Direction::Right;
        } else if position.x > ai.initial_x + range {
            velocity.vx = -config.enemy_speed;
            ai.direction = Direction::Left;
        }
    }
}
