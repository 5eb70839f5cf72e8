//! Property tests for the simulation driver.
//!
//! Random input sequences are fed through `Game::update` on the built-in
//! level, and session invariants are checked after every tick.

use hopper_engine::prelude::*;
use proptest::prelude::*;

const DT: f64 = 1.0 / 60.0;

fn input_strategy() -> impl Strategy<Value = InputState> {
    (any::<bool>(), any::<bool>(), any::<bool>())
        .prop_map(|(left, right, jump)| InputState { left, right, jump })
}

/// Inputs held for a random number of ticks each.
fn script_strategy() -> impl Strategy<Value = Vec<(InputState, u8)>> {
    prop::collection::vec((input_strategy(), 1u8..15), 1..40)
}

fn started() -> Game {
    let mut game = Game::new(LevelGrid::level_one(), GameConfig::default()).unwrap();
    game.start_game();
    game
}

/// Whether some solid collider's top edge sits exactly under the player.
fn resting_on_something(world: &World, player: EntityId) -> bool {
    let (pos, size) = world.aabb(player).unwrap();
    let bottom = pos.y + size.height;
    world
        .collision
        .iter()
        .filter(|(e, _)| *e != player && !world.ai_controlled.contains(*e))
        .any(|(e, c)| {
            let Some(p) = world.position.get(e) else {
                return false;
            };
            let solid = match world.renderable.get(e).map(|r| r.kind) {
                Some(EntityKind::Ground) => true,
                Some(EntityKind::CoinBlock) => world.state.get(e).is_some_and(State::collected),
                _ => false,
            };
            solid
                && (bottom - p.y).abs() < 1e-6
                && pos.x < p.x + c.width
                && pos.x + size.width > p.x
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn single_player_and_fresh_ground_contact(script in script_strategy()) {
        let mut game = started();
        for (input, repeat) in script {
            for _ in 0..repeat {
                game.update(DT, &input);
                prop_assert_eq!(game.world().player_controlled.len(), 1);
                if game.status() != GameStatus::Playing {
                    continue;
                }
                let player = game.player().unwrap();
                let on_ground = game.world().physics.get(player).unwrap().on_ground;
                if on_ground {
                    prop_assert!(resting_on_something(game.world(), player));
                }
            }
        }
    }

    #[test]
    fn same_inputs_same_state(script in script_strategy()) {
        let mut a = started();
        let mut b = started();
        for (input, repeat) in &script {
            for _ in 0..*repeat {
                let outcome_a = a.update(DT, input).clone();
                let outcome_b = b.update(DT, input).clone();
                prop_assert_eq!(outcome_a, outcome_b);
            }
        }
        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(a.frame(), b.frame());
    }

    #[test]
    fn score_and_lives_move_one_way(script in script_strategy()) {
        let mut game = started();
        let mut score = game.score();
        let mut lives = game.lives();
        for (input, repeat) in script {
            for _ in 0..repeat {
                game.update(DT, &input);
                prop_assert!(game.score() >= score);
                prop_assert!(game.lives() <= lives);
                prop_assert!(game.time() >= 0.0);
                prop_assert!(game.camera_x() >= 0.0);
                score = game.score();
                lives = game.lives();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stomp tie-break
// ---------------------------------------------------------------------------

const STOMP_LEVEL: &str = "
    00000000000000000000
    00000000000000000000
    00000000000000000000
    00000000000000000000
    00000003000000000000
    11111111111111111111
    11111111111111111111
    11111111111111111111
";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Falling with the bottom edge above the enemy's midpoint is always a
    /// stomp, whatever the horizontal overlap.
    #[test]
    fn falling_above_midpoint_always_stomps(offset in -30.0f64..38.0, vy in 100.0f64..600.0) {
        let config = GameConfig {
            level_width: 20,
            level_height: 8,
            ..Default::default()
        };
        let mut game = Game::new(LevelGrid::from_ascii(STOMP_LEVEL).unwrap(), config).unwrap();
        game.start_game();
        let player = game.player().unwrap();
        let enemy = game.world().ai_controlled.first().unwrap();
        let enemy_x = game.world().position.get(enemy).unwrap().x;

        let world = game.world_mut();
        let start = Position::new(enemy_x + offset, 130.0);
        world.position.insert(player, start);
        world.previous_position.insert(player, start.into());
        world.velocity.insert(player, Velocity::new(0.0, vy));

        let outcome = game.update(1.0 / 64.0, &InputState::IDLE).clone();

        let stomped = outcome
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::EnemyStomped { entity, .. } if *entity == enemy));
        let player_hit = outcome
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerHit { .. }));
        prop_assert!(stomped);
        prop_assert!(!player_hit);
        prop_assert_eq!(game.lives(), 3);
        prop_assert!(game.world().velocity.get(player).unwrap().vy < 0.0);
    }
}
