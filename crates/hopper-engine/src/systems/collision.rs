//! Corrective AABB collision for the player, plus enemy ground contact.
//!
//! Runs after physics has already moved everything. Nothing here predicts
//! motion: overlaps are detected on the integrated positions and pushed back
//! out, using [`PreviousPosition`] to tell which side a collider was entered
//! from. Outcomes that need driver bookkeeping (score, lives, status) are
//! returned in a [`CollisionReport`] instead of being applied here.

use hopper_ecs::prelude::*;

use crate::config::GameConfig;

// ---------------------------------------------------------------------------
// Aabb
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Aabb {
    /// Box with top-left corner at `position` and the given size.
    pub fn new(position: Position, size: Collision) -> Self {
        Self {
            left: position.x,
            top: position.y,
            right: position.x + size.width,
            bottom: position.y + size.height,
        }
    }

    /// Strict overlap: boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }

    /// Vertical midpoint.
    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }
}

// ---------------------------------------------------------------------------
// CollisionReport
// ---------------------------------------------------------------------------

/// What collision found this tick. The driver turns these into score, lives
/// and status changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// The player ran into an enemy without stomping it.
    pub player_hit: bool,
    /// Enemies stomped this tick, ascending id order.
    pub stomped: Vec<EntityId>,
    /// Coin-blocks struck from below this tick, ascending id order.
    pub collected: Vec<EntityId>,
    /// The player touched the goal. When set, nothing else was resolved.
    pub goal_reached: bool,
}

impl CollisionReport {
    /// `true` if nothing happened.
    pub fn is_empty(&self) -> bool {
        !self.player_hit
            && !self.goal_reached
            && self.stomped.is_empty()
            && self.collected.is_empty()
    }
}

/// How a non-AI collider behaves when the player overlaps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collider {
    Goal,
    /// Coin-block not yet collected. Only reacts to a hit from below.
    Coin,
    /// Ground or an already-collected coin-block.
    Solid,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Resolve this tick's collisions.
///
/// Order of work:
/// 1. AI entities falling onto solid terrain are set down on top of it.
/// 2. Player vs terrain, ascending id order. Touching the goal ends the pass
///    immediately with only `goal_reached` set.
/// 3. `Physics::on_ground` is rewritten from what step 2 found.
/// 4. Player vs enemies, unless the player is invincible.
///
/// Returns an empty report if there is no player or it lacks a position,
/// velocity or collision box.
pub fn collision_system(world: &mut World, config: &GameConfig) -> CollisionReport {
    let mut report = CollisionReport::default();

    let colliders = terrain_colliders(world);
    settle_enemies(world, &colliders);

    let Some(player) = world.player() else {
        return report;
    };
    let (Some(&start), Some(&size), Some(&velocity)) = (
        world.position.get(player),
        world.collision.get(player),
        world.velocity.get(player),
    ) else {
        return report;
    };
    let previous = world
        .previous_position
        .get(player)
        .map(|p| Aabb::new(Position::new(p.x, p.y), size))
        .unwrap_or_else(|| Aabb::new(start, size));

    let mut position = start;
    let mut velocity = velocity;
    let mut supported = false;

    for &(entity, collider, block) in &colliders {
        let body = Aabb::new(position, size);
        if !body.overlaps(&block) {
            continue;
        }

        match collider {
            Collider::Goal => {
                report.goal_reached = true;
                write_back(world, player, position, velocity);
                return report;
            }
            Collider::Coin => {
                if velocity.vy < 0.0 && previous.top >= block.bottom {
                    report.collected.push(entity);
                    velocity.vy = 0.0;
                    position.y = block.bottom;
                }
            }
            Collider::Solid => {
                if velocity.vy >= 0.0 && previous.bottom <= block.top {
                    position.y = block.top - size.height;
                    velocity.vy = 0.0;
                    supported = true;
                } else if velocity.vy < 0.0 && previous.top >= block.bottom {
                    position.y = block.bottom;
                    velocity.vy = 0.0;
                } else if velocity.vx > 0.0 {
                    position.x = block.left - size.width;
                    velocity.vx = 0.0;
                } else if velocity.vx < 0.0 {
                    position.x = block.right;
                    velocity.vx = 0.0;
                }
            }
        }
    }

    write_back(world, player, position, velocity);
    if let Some(physics) = world.physics.get_mut(player) {
        physics.on_ground = supported;
    }
    if supported {
        if let Some(state) = world.state.get_mut(player) {
            state.is_jumping = Some(false);
        }
    }

    let invincible = world.state.get(player).is_some_and(State::invincible);
    if !invincible {
        resolve_enemies(world, player, config, &mut report);
    }

    report
}

/// Every collision-bearing entity the player resolves against, ascending id.
fn terrain_colliders(world: &World) -> Vec<(EntityId, Collider, Aabb)> {
    world
        .collision
        .iter()
        .filter(|(entity, _)| {
            !world.player_controlled.contains(*entity) && !world.ai_controlled.contains(*entity)
        })
        .filter_map(|(entity, size)| {
            let position = world.position.get(entity)?;
            let renderable = world.renderable.get(entity)?;
            let collider = if world.goal.contains(entity) || renderable.kind == EntityKind::Goal {
                Collider::Goal
            } else if renderable.kind == EntityKind::CoinBlock
                && !world.state.get(entity).is_some_and(State::collected)
            {
                Collider::Coin
            } else {
                Collider::Solid
            };
            Some((entity, collider, Aabb::new(*position, *size)))
        })
        .collect()
}

/// Keep AI entities from sinking through solid terrain. Vertical only and
/// never reported.
fn settle_enemies(world: &mut World, colliders: &[(EntityId, Collider, Aabb)]) {
    for (entity, _) in world.ai_controlled.iter() {
        let (Some(position), Some(size), Some(velocity)) = (
            world.position.get_mut(entity),
            world.collision.get(entity),
            world.velocity.get_mut(entity),
        ) else {
            continue;
        };
        let previous_bottom = world
            .previous_position
            .get(entity)
            .map_or(position.y, |p| p.y)
            + size.height;

        for (_, collider, block) in colliders {
            if *collider != Collider::Solid || velocity.vy < 0.0 {
                continue;
            }
            let body = Aabb::new(*position, *size);
            if body.overlaps(block) && previous_bottom <= block.top {
                position.y = block.top - size.height;
                velocity.vy = 0.0;
            }
        }
    }
}

fn resolve_enemies(
    world: &mut World,
    player: EntityId,
    config: &GameConfig,
    report: &mut CollisionReport,
) {
    let Some((position, size)) = world.aabb(player) else {
        return;
    };
    let body = Aabb::new(position, size);
    // Sampled once so stomping one enemy does not turn the next into a hit.
    let falling = world.velocity.get(player).is_some_and(|v| v.vy > 0.0);

    let enemies: Vec<(EntityId, Aabb)> = world
        .ai_controlled
        .entities()
        .filter_map(|entity| {
            let (pos, size) = world.aabb(entity)?;
            Some((entity, Aabb::new(pos, size)))
        })
        .collect();

    for (enemy, enemy_box) in enemies {
        if !body.overlaps(&enemy_box) {
            continue;
        }
        if falling && body.bottom < enemy_box.center_y() {
            report.stomped.push(enemy);
            if let Some(velocity) = world.velocity.get_mut(player) {
                velocity.vy = -config.jump_force / 2.0;
            }
        } else {
            report.player_hit = true;
        }
    }
}

fn write_back(world: &mut World, player: EntityId, position: Position, velocity: Velocity) {
    if let Some(p) = world.position.get_mut(player) {
        *p = position;
    }
    if let Some(v) = world.velocity.get_mut(player) {
        *v = velocity;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
