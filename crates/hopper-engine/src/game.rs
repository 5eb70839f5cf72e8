//! The simulation driver and session state machine.
//!
//! [`Game`] owns the [`World`] and everything that lives outside it: status,
//! score, lives, the countdown, the invincibility timer and the camera. Each
//! call to [`Game::update`] is one tick:
//!
//! 1. The countdown runs down; at zero the session is over.
//! 2. An active invincibility window runs down.
//! 3. Input, AI, physics and collision run in that fixed order.
//! 4. Collision outcomes are applied (lives, score, stomped enemies, coins,
//!    goal).
//! 5. A player that fell below the level loses a life and respawns.
//! 6. The camera follows the player.
//!
//! After every mutating call a fresh [`FrameSnapshot`] is published for
//! presentation layers.
//!
//! # Example
//!
//! ```
//! use hopper_engine::prelude::*;
//!
//! let mut game = Game::new(LevelGrid::level_one(), GameConfig::default()).unwrap();
//! assert_eq!(game.status(), GameStatus::StartScreen);
//!
//! game.start_game();
//! for _ in 0..60 {
//!     game.update(1.0 / 60.0, &InputState::RIGHT);
//! }
//!
//! assert_eq!(game.tick_count(), 60);
//! assert!(game.frame().player().unwrap().x > 80.0);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use hopper_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigError, GameConfig};
use crate::frame::{FrameSnapshot, Hud};
use crate::level::{load_world, LevelError, LevelGrid};
use crate::systems::{ai_system, collision_system, input_system, physics_system, InputState};

/// Timers that count down by repeated `-= dt` stop within this distance of
/// zero, so a window lasts `duration / dt` ticks despite rounding.
const TIMER_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while building or restoring a [`Game`].
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Level(#[from] LevelError),

    /// A session snapshot whose world holds no player-controlled entity.
    #[error("session snapshot has no player entity")]
    MissingPlayer,
}

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    StartScreen,
    Playing,
    Paused,
    GameOver,
    Win,
}

impl GameStatus {
    /// `GameOver` and `Win` only leave through [`Game::reset_game`].
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver | Self::Win)
    }
}

/// Host-issued session commands. Replays record these alongside input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionControl {
    Start,
    TogglePause,
    Reset,
}

// ---------------------------------------------------------------------------
// Tick results
// ---------------------------------------------------------------------------

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum GameEvent {
    /// The countdown reached zero.
    TimeUp,
    /// The post-hit invincibility window closed.
    InvincibilityEnded,
    /// The player ran into an enemy. `lives` is what is left.
    PlayerHit { lives: u32 },
    EnemyStomped { entity: EntityId, points: u32 },
    CoinCollected { entity: EntityId, points: u32 },
    GoalReached,
    /// The player dropped below the level. `lives` is what is left.
    FellOffMap { lives: u32 },
    /// The player was put back at the spawn point.
    Respawned,
    StatusChanged { from: GameStatus, to: GameStatus },
}

/// Result of the most recent [`Game::update`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// `false` if the call was ignored (not playing, or a bad `dt`).
    pub ran: bool,
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
}

impl TickOutcome {
    /// The status this tick moved the session into, if any.
    pub fn status_change(&self) -> Option<GameStatus> {
        self.events.iter().find_map(|event| match event {
            GameEvent::StatusChanged { to, .. } => Some(*to),
            _ => None,
        })
    }
}

/// Wall-clock timings of the last tick. Not part of the simulation state.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Time per system, in execution order.
    pub system_times: Vec<(&'static str, Duration)>,
    /// Time for the whole tick, bookkeeping included.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// The complete simulation state of a session.
///
/// Restoring a snapshot with [`Game::restore_session`] and then feeding the
/// same inputs reproduces the same run exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub world: WorldSnapshot,
    pub status: GameStatus,
    pub score: u64,
    pub lives: u32,
    pub time: f64,
    pub invincibility_timer: f64,
    pub camera_x: f64,
    pub tick_count: u64,
}

impl SessionSnapshot {
    /// BLAKE3 hex digest (64 lowercase hex chars) of the serialized state.
    pub fn hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        if let Err(err) = serde_json::to_writer(&mut hasher, self) {
            tracing::error!(%err, "failed to serialize session state for hashing");
        }
        hasher.finalize().to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// One play session over a fixed level.
pub struct Game {
    grid: LevelGrid,
    config: GameConfig,
    world: World,
    status: GameStatus,
    score: u64,
    lives: u32,
    time: f64,
    invincibility_timer: f64,
    camera_x: f64,
    tick_count: u64,
    last_diagnostics: TickDiagnostics,
    last_outcome: TickOutcome,
    frame: Arc<FrameSnapshot>,
}

impl Game {
    /// Build a session on the start screen.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate or `grid` does not match the
    /// configured level dimensions.
    pub fn new(grid: LevelGrid, config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        let loaded = load_world(&grid, &config)?;

        let frame = Arc::new(FrameSnapshot::capture(
            &loaded.world,
            Hud {
                score: 0,
                lives: config.initial_lives,
                time: config.initial_time,
                status: GameStatus::StartScreen,
            },
            0.0,
        ));

        Ok(Self {
            world: loaded.world,
            status: GameStatus::StartScreen,
            score: 0,
            lives: config.initial_lives,
            time: config.initial_time,
            invincibility_timer: 0.0,
            camera_x: 0.0,
            tick_count: 0,
            last_diagnostics: TickDiagnostics::default(),
            last_outcome: TickOutcome::default(),
            frame,
            grid,
            config,
        })
    }

    /// Build a session and put it in the state captured by `snapshot`.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new), plus [`GameError::MissingPlayer`] if the
    /// snapshot's world has no player.
    pub fn from_session(
        grid: LevelGrid,
        config: GameConfig,
        snapshot: &SessionSnapshot,
    ) -> Result<Self, GameError> {
        let mut game = Self::new(grid, config)?;
        game.restore_session(snapshot)?;
        Ok(game)
    }

    // -- session controls ---------------------------------------------------

    /// Leave the start screen. No-op from any other status.
    pub fn start_game(&mut self) {
        if self.status == GameStatus::StartScreen {
            self.set_status(GameStatus::Playing);
            self.publish();
        }
    }

    /// Flip between playing and paused. No-op from any other status.
    pub fn toggle_pause(&mut self) {
        let next = match self.status {
            GameStatus::Playing => GameStatus::Paused,
            GameStatus::Paused => GameStatus::Playing,
            _ => return,
        };
        self.set_status(next);
        self.publish();
    }

    /// Throw the session away and rebuild it from the level, on the start
    /// screen.
    pub fn reset_game(&mut self) {
        match load_world(&self.grid, &self.config) {
            Ok(loaded) => self.world = loaded.world,
            // The grid was checked against the config in `new`.
            Err(err) => warn!(%err, "level reload failed; keeping the current world"),
        }
        self.status = GameStatus::StartScreen;
        self.score = 0;
        self.lives = self.config.initial_lives;
        self.time = self.config.initial_time;
        self.invincibility_timer = 0.0;
        self.camera_x = 0.0;
        self.tick_count = 0;
        self.last_diagnostics = TickDiagnostics::default();
        self.last_outcome = TickOutcome::default();
        info!("session reset");
        self.publish();
    }

    /// Dispatch a recorded [`SessionControl`].
    pub fn apply_control(&mut self, control: SessionControl) {
        match control {
            SessionControl::Start => self.start_game(),
            SessionControl::TogglePause => self.toggle_pause(),
            SessionControl::Reset => self.reset_game(),
        }
    }

    // -- tick ---------------------------------------------------------------

    /// Advance the simulation by `dt` seconds with the given input.
    ///
    /// Does nothing unless the session is playing. A negative or non-finite
    /// `dt` is logged and ignored.
    pub fn update(&mut self, dt: f64, input: &InputState) -> &TickOutcome {
        self.last_outcome = TickOutcome::default();
        if self.status != GameStatus::Playing {
            return &self.last_outcome;
        }
        if !(dt.is_finite() && dt >= 0.0) {
            warn!(dt, tick = self.tick_count, "ignoring tick with invalid dt");
            return &self.last_outcome;
        }

        let tick_start = Instant::now();
        let mut system_times = Vec::with_capacity(4);
        let mut events = Vec::new();
        self.tick_count += 1;

        self.time -= dt;
        if self.time <= TIMER_EPSILON {
            self.time = 0.0;
            events.push(GameEvent::TimeUp);
            events.extend(self.set_status(GameStatus::GameOver));
            return self.finish_tick(events, system_times, tick_start);
        }

        self.run_invincibility(dt, &mut events);

        let start = Instant::now();
        input_system(&mut self.world, input, &self.config);
        system_times.push(("input", start.elapsed()));

        let start = Instant::now();
        ai_system(&mut self.world, &self.config);
        system_times.push(("ai", start.elapsed()));

        let start = Instant::now();
        physics_system(&mut self.world, dt, &self.config);
        system_times.push(("physics", start.elapsed()));

        let start = Instant::now();
        let report = collision_system(&mut self.world, &self.config);
        system_times.push(("collision", start.elapsed()));

        let player = self.world.player();

        if report.player_hit {
            self.lives = self.lives.saturating_sub(1);
            if let Some(state) = player.and_then(|p| self.world.state.get_mut(p)) {
                state.is_invincible = Some(true);
            }
            self.invincibility_timer = self.config.invincibility_duration;
            debug!(lives = self.lives, "player hit");
            events.push(GameEvent::PlayerHit { lives: self.lives });
            if self.lives == 0 {
                events.extend(self.set_status(GameStatus::GameOver));
                return self.finish_tick(events, system_times, tick_start);
            }
        }

        for enemy in report.stomped {
            let points = self.world.score_value.get(enemy).map_or(0, |s| s.value);
            self.world.destroy_entity(enemy);
            self.score += u64::from(points);
            debug!(entity = %enemy, points, score = self.score, "enemy stomped");
            events.push(GameEvent::EnemyStomped {
                entity: enemy,
                points,
            });
        }

        for coin in report.collected {
            let Some(state) = self.world.state.get_mut(coin) else {
                continue;
            };
            if state.collected() {
                continue;
            }
            state.is_collected = Some(true);
            let points = self.world.score_value.get(coin).map_or(0, |s| s.value);
            self.score += u64::from(points);
            debug!(entity = %coin, points, score = self.score, "coin collected");
            events.push(GameEvent::CoinCollected {
                entity: coin,
                points,
            });
        }

        if report.goal_reached {
            events.push(GameEvent::GoalReached);
            events.extend(self.set_status(GameStatus::Win));
            return self.finish_tick(events, system_times, tick_start);
        }

        if let Some(player) = player {
            let fell = self
                .world
                .position
                .get(player)
                .is_some_and(|p| p.y > self.config.world_height());
            if fell {
                self.lives = self.lives.saturating_sub(1);
                debug!(lives = self.lives, "player fell off the map");
                events.push(GameEvent::FellOffMap { lives: self.lives });
                if self.lives == 0 {
                    events.extend(self.set_status(GameStatus::GameOver));
                    return self.finish_tick(events, system_times, tick_start);
                }
                self.respawn(player);
                events.push(GameEvent::Respawned);
            }

            if let Some(position) = self.world.position.get(player) {
                self.camera_x = (position.x - self.config.viewport_width / 2.0).max(0.0);
            }
        }

        self.finish_tick(events, system_times, tick_start)
    }

    fn run_invincibility(&mut self, dt: f64, events: &mut Vec<GameEvent>) {
        let Some(player) = self.world.player() else {
            return;
        };
        let Some(state) = self.world.state.get_mut(player) else {
            return;
        };
        if !state.invincible() {
            return;
        }
        self.invincibility_timer -= dt;
        if self.invincibility_timer <= TIMER_EPSILON {
            state.is_invincible = Some(false);
            self.invincibility_timer = 0.0;
            events.push(GameEvent::InvincibilityEnded);
        }
    }

    fn respawn(&mut self, player: EntityId) {
        let spawn = self.config.spawn_point();
        if let Some(position) = self.world.position.get_mut(player) {
            *position = spawn;
        }
        if let Some(previous) = self.world.previous_position.get_mut(player) {
            *previous = spawn.into();
        }
        if let Some(velocity) = self.world.velocity.get_mut(player) {
            *velocity = Velocity::default();
        }
        debug!(entity = %player, lives = self.lives, "player respawned");
    }

    fn finish_tick(
        &mut self,
        events: Vec<GameEvent>,
        system_times: Vec<(&'static str, Duration)>,
        tick_start: Instant,
    ) -> &TickOutcome {
        self.publish();
        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: tick_start.elapsed(),
        };
        trace!(
            tick = self.tick_count,
            events = events.len(),
            total = ?self.last_diagnostics.total_time,
            "tick complete"
        );
        self.last_outcome = TickOutcome { ran: true, events };
        &self.last_outcome
    }

    fn set_status(&mut self, to: GameStatus) -> Option<GameEvent> {
        let from = self.status;
        if from == to {
            return None;
        }
        self.status = to;
        info!(?from, ?to, score = self.score, lives = self.lives, "status changed");
        Some(GameEvent::StatusChanged { from, to })
    }

    fn publish(&mut self) {
        let hud = Hud {
            score: self.score,
            lives: self.lives,
            time: self.time,
            status: self.status,
        };
        self.frame = Arc::new(FrameSnapshot::capture(&self.world, hud, self.camera_x));
    }

    // -- snapshots ----------------------------------------------------------

    /// Capture the full simulation state.
    pub fn capture_session(&self) -> SessionSnapshot {
        SessionSnapshot {
            world: self.world.capture_snapshot(),
            status: self.status,
            score: self.score,
            lives: self.lives,
            time: self.time,
            invincibility_timer: self.invincibility_timer,
            camera_x: self.camera_x,
            tick_count: self.tick_count,
        }
    }

    /// Replace the simulation state with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingPlayer`] (leaving `self` untouched) if the
    /// snapshot's world has no player.
    pub fn restore_session(&mut self, snapshot: &SessionSnapshot) -> Result<(), GameError> {
        let world = World::from_snapshot(&snapshot.world);
        if world.player().is_none() {
            return Err(GameError::MissingPlayer);
        }
        self.world = world;
        self.status = snapshot.status;
        self.score = snapshot.score;
        self.lives = snapshot.lives;
        self.time = snapshot.time;
        self.invincibility_timer = snapshot.invincibility_timer;
        self.camera_x = snapshot.camera_x;
        self.tick_count = snapshot.tick_count;
        self.last_diagnostics = TickDiagnostics::default();
        self.last_outcome = TickOutcome::default();
        self.publish();
        Ok(())
    }

    /// BLAKE3 hex digest of the current simulation state.
    pub fn state_hash(&self) -> String {
        self.capture_session().hash()
    }

    // -- accessors ----------------------------------------------------------

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    /// Remaining time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn invincibility_timer(&self) -> f64 {
        self.invincibility_timer
    }

    pub fn camera_x(&self) -> f64 {
        self.camera_x
    }

    /// Ticks that actually ran since the session was built or reset.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &LevelGrid {
        &self.grid
    }

    /// Read-only access to the live world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the live world.
    ///
    /// Meant for scenario setup and tests. The published frame is not
    /// refreshed until the next mutating call.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The player entity, if the world has one.
    pub fn player(&self) -> Option<EntityId> {
        self.world.player()
    }

    /// The most recently published frame.
    pub fn frame(&self) -> Arc<FrameSnapshot> {
        Arc::clone(&self.frame)
    }

    pub fn last_outcome(&self) -> &TickOutcome {
        &self.last_outcome
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("status", &self.status)
            .field("score", &self.score)
            .field("lives", &self.lives)
            .field("time", &self.time)
            .field("tick_count", &self.tick_count)
            .field("entities", &self.world.entity_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_game() -> Game {
        Game::new(LevelGrid::level_one(), GameConfig::default()).unwrap()
    }

    #[test]
    fn new_game_waits_on_start_screen() {
        let mut game = new_game();
        assert_eq!(game.status(), GameStatus::StartScreen);
        assert_eq!(game.lives(), 3);
        assert_eq!(game.time(), 300.0);

        let outcome = game.update(0.1, &InputState::RIGHT);
        assert!(!outcome.ran);
        assert_eq!(game.tick_count(), 0);
        assert_eq!(game.time(), 300.0);
    }

    #[test]
    fn start_only_leaves_start_screen() {
        let mut game = new_game();
        game.toggle_pause();
        assert_eq!(game.status(), GameStatus::StartScreen);
        game.start_game();
        assert_eq!(game.status(), GameStatus::Playing);
        game.start_game();
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.frame().hud.status, GameStatus::Playing);
    }

    #[test]
    fn paused_game_does_not_tick() {
        let mut game = new_game();
        game.start_game();
        game.toggle_pause();
        let before = game.state_hash();
        assert!(!game.update(0.1, &InputState::JUMP).ran);
        assert_eq!(game.state_hash(), before);
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut game = new_game();
        game.start_game();
        let before = game.state_hash();
        assert!(!game.update(f64::NAN, &InputState::IDLE).ran);
        assert!(!game.update(-0.1, &InputState::IDLE).ran);
        assert!(!game.update(f64::INFINITY, &InputState::IDLE).ran);
        assert_eq!(game.state_hash(), before);
    }

    #[test]
    fn diagnostics_cover_every_system() {
        let mut game = new_game();
        game.start_game();
        game.update(1.0 / 60.0, &InputState::IDLE);
        let names: Vec<&str> = game
            .last_diagnostics()
            .system_times
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(names, crate::systems::SYSTEM_ORDER);
    }

    #[test]
    fn player_settles_on_ground_after_spawn() {
        let mut game = new_game();
        game.start_game();
        for _ in 0..60 {
            game.update(1.0 / 60.0, &InputState::IDLE);
        }
        let player = game.player().unwrap();
        let config = game.config().clone();
        let ground_top = 13.0 * config.tile_size;
        let y = game.world().position.get(player).unwrap().y;
        assert_eq!(y, ground_top - config.player_size());
        assert!(game.world().physics.get(player).unwrap().on_ground);
    }

    #[test]
    fn reset_returns_to_fresh_start_screen() {
        let mut game = new_game();
        game.start_game();
        let fresh = {
            let g = new_game();
            g.state_hash()
        };
        for _ in 0..30 {
            game.update(1.0 / 60.0, &InputState::RIGHT);
        }
        game.reset_game();
        assert_eq!(game.status(), GameStatus::StartScreen);
        assert_eq!(game.tick_count(), 0);
        assert_eq!(game.state_hash(), fresh);
    }

    #[test]
    fn session_round_trip_preserves_hash() {
        let mut game = new_game();
        game.start_game();
        for _ in 0..20 {
            game.update(1.0 / 60.0, &InputState::RIGHT);
        }
        let snapshot = game.capture_session();
        let restored =
            Game::from_session(LevelGrid::level_one(), GameConfig::default(), &snapshot).unwrap();
        assert_eq!(restored.state_hash(), game.state_hash());
        assert_eq!(snapshot.hash().len(), 64);
    }

    #[test]
    fn snapshot_without_player_is_rejected() {
        let mut game = new_game();
        let mut snapshot = game.capture_session();
        snapshot.world.player_controlled.clear();
        let before = game.state_hash();
        assert!(matches!(
            game.restore_session(&snapshot),
            Err(GameError::MissingPlayer)
        ));
        assert_eq!(game.state_hash(), before);
    }

    #[test]
    fn status_serializes_camel_case() {
        let json = serde_json::to_value(GameStatus::GameOver).unwrap();
        assert_eq!(json, serde_json::json!("gameOver"));
        assert!(GameStatus::Win.is_terminal());
        assert!(!GameStatus::Paused.is_terminal());
    }
}
