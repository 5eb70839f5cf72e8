//! Gravity and velocity integration.

use hopper_ecs::prelude::*;

use crate::config::GameConfig;

/// Integrate every entity that has both a position and a velocity.
///
/// The pre-step position is stored in [`PreviousPosition`] (for entities that
/// carry one) so collision can tell which side a collider was entered from.
/// Gravity is applied to `vy`, clamped at `max_fall_speed`, and then the
/// position advances by `velocity * dt` on both axes. Nothing here looks at
/// other entities.
pub fn physics_system(world: &mut World, dt: f64, config: &GameConfig) {
    for (entity, velocity) in world.velocity.iter_mut() {
        let Some(position) = world.position.get_mut(entity) else {
            continue;
        };

        if let Some(previous) = world.previous_position.get_mut(entity) {
            *previous = (*position).into();
        }

        velocity.vy = (velocity.vy + config.gravity * dt).min(config.max_fall_speed);

        position.x += velocity.vx * dt;
        position.y += velocity.vy * dt;
    }
}
