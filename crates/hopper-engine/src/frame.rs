//! Read-only projection of the simulation for presentation layers.
//!
//! A [`FrameSnapshot`] is built by the driver after every mutating call and
//! handed out behind an `Arc`, so a renderer can hold on to it while the next
//! tick runs. It never borrows the live [`World`].

use hopper_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::game::GameStatus;

/// One drawable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: f64,
    pub y: f64,
    /// Collision box size; zero for entities without one.
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_invincible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_jumping: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_ground: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_collected: Option<bool>,
}

/// Scalar values for the heads-up display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub score: u64,
    pub lives: u32,
    /// Remaining time in seconds.
    pub time: f64,
    pub status: GameStatus,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Every entity with a position and a renderable kind, ascending id.
    pub entities: Vec<EntityView>,
    pub hud: Hud,
    /// Horizontal scroll offset in world pixels.
    pub camera_x: f64,
}

impl FrameSnapshot {
    /// Project `world` into a frame.
    pub fn capture(world: &World, hud: Hud, camera_x: f64) -> Self {
        let entities = world
            .renderable
            .iter()
            .filter_map(|(id, renderable)| {
                let position = world.position.get(id)?;
                let size = world.collision.get(id);
                let state = world.state.get(id);
                Some(EntityView {
                    id,
                    kind: renderable.kind,
                    x: position.x,
                    y: position.y,
                    width: size.map_or(0.0, |c| c.width),
                    height: size.map_or(0.0, |c| c.height),
                    // Enemies carry their facing on the patrol component.
                    direction: state.and_then(|s| s.direction).or_else(|| {
                        world.ai_controlled.get(id).map(|ai| ai.direction)
                    }),
                    is_invincible: state.and_then(|s| s.is_invincible),
                    is_jumping: state.and_then(|s| s.is_jumping),
                    on_ground: world.physics.get(id).map(|p| p.on_ground),
                    is_collected: state.and_then(|s| s.is_collected),
                })
            })
            .collect();

        Self {
            entities,
            hud,
            camera_x,
        }
    }

    /// Views that intersect the horizontal window
    /// `[camera_x, camera_x + viewport_width)`.
    pub fn visible(&self, viewport_width: f64) -> impl Iterator<Item = &EntityView> + '_ {
        let left = self.camera_x;
        let right = self.camera_x + viewport_width;
        self.entities
            .iter()
            .filter(move |view| view.x + view.width > left && view.x < right)
    }

    /// The player's view, if the world has a player.
    pub fn player(&self) -> Option<&EntityView> {
        self.entities
            .iter()
            .find(|view| view.kind == EntityKind::Player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hud() -> Hud {
        Hud {
            score: 300,
            lives: 2,
            time: 120.5,
            status: GameStatus::Playing,
        }
    }

    fn world_with_row() -> World {
        let mut world = World::new();
        for i in 0..5 {
            let e = world.create_entity();
            world.position.insert(e, Position::new(i as f64 * 400.0, 0.0));
            world.collision.insert(
                e,
                Collision {
                    width: 40.0,
                    height: 40.0,
                },
            );
            world.renderable.insert(
                e,
                Renderable {
                    kind: EntityKind::Ground,
                },
            );
        }
        world
    }

    #[test]
    fn capture_lists_renderables_in_id_order() {
        let mut world = world_with_row();
        // No Renderable: not part of the frame.
        let hidden = world.create_entity();
        world.position.insert(hidden, Position::new(0.0, 0.0));

        let frame = FrameSnapshot::capture(&world, hud(), 0.0);
        assert_eq!(frame.entities.len(), 5);
        let ids: Vec<u64> = frame.entities.iter().map(|v| v.id.to_raw()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(frame.hud, hud());
    }

    #[test]
    fn visible_filters_by_camera_window() {
        let world = world_with_row();
        let frame = FrameSnapshot::capture(&world, hud(), 380.0);
        let xs: Vec<f64> = frame.visible(800.0).map(|v| v.x).collect();
        // 0..40 ends before 380; 1200 starts at the right edge.
        assert_eq!(xs, vec![400.0, 800.0]);
    }

    #[test]
    fn player_view_carries_flags() {
        let mut world = World::new();
        let p = world.create_entity();
        world.position.insert(p, Position::new(80.0, 440.0));
        world.renderable.insert(
            p,
            Renderable {
                kind: EntityKind::Player,
            },
        );
        world.physics.insert(p, Physics { on_ground: true });
        world.state.insert(p, State::player());

        let frame = FrameSnapshot::capture(&world, hud(), 0.0);
        let view = frame.player().unwrap();
        assert_eq!(view.direction, Some(Direction::Right));
        assert_eq!(view.on_ground, Some(true));
        assert_eq!(view.is_invincible, Some(false));
        assert!(view.is_collected.is_none());
        assert_eq!(view.width, 0.0);
    }

    #[test]
    fn enemy_view_follows_patrol_direction() {
        let config = crate::config::GameConfig::default();
        let mut world = World::new();
        let e = world.create_entity();
        world.position.insert(e, Position::new(0.0, 0.0));
        world.velocity.insert(e, Velocity::new(-config.enemy_speed, 0.0));
        world.renderable.insert(
            e,
            Renderable {
                kind: EntityKind::Enemy,
            },
        );
        world.ai_controlled.insert(
            e,
            AiControlled {
                initial_x: 200.0,
                direction: Direction::Left,
            },
        );

        let before = FrameSnapshot::capture(&world, hud(), 0.0);
        assert_eq!(before.entities[0].direction, Some(Direction::Left));

        // x = 0 is past the left patrol bound, so the enemy turns around.
        crate::systems::ai_system(&mut world, &config);
        let after = FrameSnapshot::capture(&world, hud(), 0.0);
        assert_eq!(after.entities[0].direction, Some(Direction::Right));
    }

    #[test]
    fn serialized_view_omits_absent_flags() {
        let world = world_with_row();
        let frame = FrameSnapshot::capture(&world, hud(), 0.0);
        let json = serde_json::to_value(&frame.entities[0]).unwrap();
        assert!(json.get("direction").is_none());
        assert_eq!(json["kind"], "ground");
    }
}
