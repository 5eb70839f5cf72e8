//! Deterministic replay with input recording and checkpoint verification.
//!
//! A [`ReplayRecorder`] captures the starting [`SessionSnapshot`], then the
//! `dt` and [`InputState`] of every tick, any session controls issued along
//! the way, and periodic state hash checkpoints. The resulting [`ReplayLog`]
//! can be fed back through [`replay`], which restores the starting session,
//! re-runs every tick and reports the first checkpoint whose hash differs.
//!
//! # Recording and replaying
//!
//! ```
//! use hopper_engine::prelude::*;
//!
//! let grid = LevelGrid::level_one();
//! let config = GameConfig::default();
//! let mut game = Game::new(grid.clone(), config.clone()).unwrap();
//! game.start_game();
//!
//! let mut recorder = ReplayRecorder::new(game.capture_session(), 10);
//! for i in 0..100 {
//!     let input = if i % 20 < 10 { InputState::RIGHT } else { InputState::JUMP };
//!     recorder.record_tick(1.0 / 60.0, input, Some(game.state_hash()));
//!     game.update(1.0 / 60.0, &input);
//! }
//! let log = recorder.finish(Some(game.state_hash()));
//!
//! let result = replay(grid, config, &log).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! assert_eq!(result.final_hash_matches, Some(true));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::game::{Game, GameError, SessionControl, SessionSnapshot};
use crate::level::LevelGrid;
use crate::systems::InputState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while validating or starting a replay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The game could not be built or the starting session restored.
    #[error("failed to set up replay: {0}")]
    Setup(#[from] GameError),

    /// The log holds two entries of the same kind for one frame.
    #[error("replay log contains duplicate {kind} entry at frame {frame}")]
    DuplicateEntry { kind: &'static str, frame: u64 },

    /// An entry refers to a frame past the end of the recording.
    #[error("replay entry at frame {frame} is past the recorded {total_frames} frames")]
    FrameOutOfRange { frame: u64, total_frames: u64 },

    /// The restored starting session does not hash to the recorded value.
    #[error("initial session hash mismatch: recorded {expected}, restored {actual}")]
    InitialHashMismatch { expected: String, actual: String },
}

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A complete replay: starting session plus everything needed to re-run it.
///
/// Fully serializable, so logs can be stored as regression fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    /// The session captured when recording started.
    pub initial_session: SessionSnapshot,
    /// Hash of `initial_session`, checked before any tick runs.
    pub initial_hash: String,
    /// Number of recorded ticks.
    pub total_frames: u64,
    /// Hash after the last recorded tick, if the recorder was given one.
    pub final_hash: Option<String>,
    /// Ordered entries.
    pub entries: Vec<ReplayEntry>,
}

/// A single entry in a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// The `dt` and input of one tick.
    Frame {
        frame: u64,
        dt: f64,
        input: InputState,
    },
    /// A session control issued before `frame` ran. Controls issued after the
    /// last tick carry `frame == total_frames`.
    Control { frame: u64, control: SessionControl },
    /// State hash taken before `frame` ran.
    Checkpoint { frame: u64, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The outcome of [`replay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every recorded frame ran without a checkpoint mismatch.
    pub completed: bool,
    pub frames_replayed: u64,
    /// The first checkpoint whose hash differed. `None` if all matched.
    pub first_divergence: Option<ReplayDivergence>,
    /// Hash of the session after the last replayed frame.
    pub final_hash: String,
    /// Whether `final_hash` equals the recorded one. `None` if the log has
    /// no final hash or replay stopped early.
    pub final_hash_matches: Option<bool>,
}

/// Details of a determinism failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub frame: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a run into a [`ReplayLog`].
///
/// Call [`record_tick`](Self::record_tick) before each [`Game::update`] and
/// [`record_control`](Self::record_control) before each session control.
pub struct ReplayRecorder {
    log: ReplayLog,
    /// Checkpoint every this many frames. 0 checkpoints whenever a hash is
    /// supplied.
    checkpoint_interval: u64,
    frames_recorded: u64,
}

impl ReplayRecorder {
    /// Start recording from `initial`.
    pub fn new(initial: SessionSnapshot, checkpoint_interval: u64) -> Self {
        let initial_hash = initial.hash();
        Self {
            log: ReplayLog {
                initial_session: initial,
                initial_hash,
                total_frames: 0,
                final_hash: None,
                entries: Vec::new(),
            },
            checkpoint_interval,
            frames_recorded: 0,
        }
    }

    /// Record one tick. `state_hash` is the game's hash before the tick runs;
    /// it becomes a checkpoint if the frame falls on the interval.
    pub fn record_tick(&mut self, dt: f64, input: InputState, state_hash: Option<String>) {
        let frame = self.frames_recorded;

        if let Some(hash) = state_hash {
            let should_checkpoint =
                self.checkpoint_interval == 0 || frame % self.checkpoint_interval == 0;
            if should_checkpoint {
                self.log.entries.push(ReplayEntry::Checkpoint {
                    frame,
                    state_hash: hash,
                });
            }
        }

        self.log
            .entries
            .push(ReplayEntry::Frame { frame, dt, input });
        self.frames_recorded += 1;
    }

    /// Record a session control issued before the next tick.
    pub fn record_control(&mut self, control: SessionControl) {
        self.log.entries.push(ReplayEntry::Control {
            frame: self.frames_recorded,
            control,
        });
    }

    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded
    }

    /// Finish recording. `final_hash` is the game's hash after the last tick.
    pub fn finish(mut self, final_hash: Option<String>) -> ReplayLog {
        self.log.total_frames = self.frames_recorded;
        self.log.final_hash = final_hash;
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Re-run `log` on a fresh game built from `grid` and `config`.
///
/// For each frame: pending controls are applied, the checkpoint (if any) is
/// compared, then the tick runs. Replay stops at the first divergence.
///
/// # Errors
///
/// The log is validated before anything runs. Duplicate frames or
/// checkpoints, entries past the end, a game that cannot be built, or a
/// starting session that does not hash to `initial_hash` are errors.
pub fn replay(
    grid: LevelGrid,
    config: GameConfig,
    log: &ReplayLog,
) -> Result<ReplayResult, ReplayError> {
    let mut frames: BTreeMap<u64, (f64, InputState)> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u64, &str> = BTreeMap::new();
    let mut controls: BTreeMap<u64, Vec<SessionControl>> = BTreeMap::new();

    for entry in &log.entries {
        match entry {
            ReplayEntry::Frame { frame, dt, input } => {
                check_range(*frame, log.total_frames, false)?;
                if frames.insert(*frame, (*dt, *input)).is_some() {
                    return Err(ReplayError::DuplicateEntry {
                        kind: "frame",
                        frame: *frame,
                    });
                }
            }
            ReplayEntry::Checkpoint { frame, state_hash } => {
                check_range(*frame, log.total_frames, false)?;
                if checkpoints.insert(*frame, state_hash).is_some() {
                    return Err(ReplayError::DuplicateEntry {
                        kind: "checkpoint",
                        frame: *frame,
                    });
                }
            }
            ReplayEntry::Control { frame, control } => {
                check_range(*frame, log.total_frames, true)?;
                controls.entry(*frame).or_default().push(*control);
            }
        }
    }

    let mut game = Game::from_session(grid, config, &log.initial_session)?;
    let actual = game.state_hash();
    if actual != log.initial_hash {
        return Err(ReplayError::InitialHashMismatch {
            expected: log.initial_hash.clone(),
            actual,
        });
    }

    let mut frames_replayed = 0;
    for frame in 0..log.total_frames {
        for control in controls.get(&frame).into_iter().flatten() {
            game.apply_control(*control);
        }

        if let Some(expected) = checkpoints.get(&frame) {
            let actual_hash = game.state_hash();
            if actual_hash != *expected {
                tracing::warn!(frame, "replay diverged at checkpoint");
                return Ok(ReplayResult {
                    completed: false,
                    frames_replayed,
                    first_divergence: Some(ReplayDivergence {
                        frame,
                        expected_hash: (*expected).to_owned(),
                        actual_hash: actual_hash.clone(),
                    }),
                    final_hash: actual_hash,
                    final_hash_matches: None,
                });
            }
        }

        // A frame missing from the log replays as an idle zero-length tick.
        let (dt, input) = frames.get(&frame).copied().unwrap_or_default();
        game.update(dt, &input);
        frames_replayed += 1;
    }

    for control in controls.get(&log.total_frames).into_iter().flatten() {
        game.apply_control(*control);
    }

    let final_hash = game.state_hash();
    let final_hash_matches = log.final_hash.as_ref().map(|h| *h == final_hash);
    Ok(ReplayResult {
        completed: true,
        frames_replayed,
        first_divergence: None,
        final_hash,
        final_hash_matches,
    })
}

fn check_range(frame: u64, total_frames: u64, inclusive: bool) -> Result<(), ReplayError> {
    let in_range = if inclusive {
        frame <= total_frames
    } else {
        frame < total_frames
    };
    if in_range {
        Ok(())
    } else {
        Err(ReplayError::FrameOutOfRange {
            frame,
            total_frames,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn started_game() -> Game {
        let mut game = Game::new(LevelGrid::level_one(), GameConfig::default()).unwrap();
        game.start_game();
        game
    }

    fn record(ticks: u64, interval: u64) -> ReplayLog {
        let mut game = started_game();
        let mut recorder = ReplayRecorder::new(game.capture_session(), interval);
        for i in 0..ticks {
            let input = match i % 30 {
                0..=14 => InputState::RIGHT,
                15 => InputState::JUMP,
                _ => InputState::IDLE,
            };
            recorder.record_tick(1.0 / 60.0, input, Some(game.state_hash()));
            game.update(1.0 / 60.0, &input);
        }
        recorder.finish(Some(game.state_hash()))
    }

    #[test]
    fn checkpoints_follow_interval() {
        let log = record(25, 10);
        let frames: Vec<u64> = log
            .entries
            .iter()
            .filter_map(|e| match e {
                ReplayEntry::Checkpoint { frame, .. } => Some(*frame),
                _ => None,
            })
            .collect();
        assert_eq!(frames, vec![0, 10, 20]);
        assert_eq!(log.total_frames, 25);
    }

    #[test]
    fn faithful_replay_matches() {
        let log = record(120, 15);
        let result = replay(LevelGrid::level_one(), GameConfig::default(), &log).unwrap();
        assert!(result.completed);
        assert_eq!(result.frames_replayed, 120);
        assert_eq!(result.final_hash_matches, Some(true));
    }

    #[test]
    fn tampered_input_is_detected() {
        let mut log = record(60, 10);
        for entry in &mut log.entries {
            if let ReplayEntry::Frame { frame: 5, input, .. } = entry {
                *input = InputState::LEFT;
            }
        }
        let result = replay(LevelGrid::level_one(), GameConfig::default(), &log).unwrap();
        assert!(!result.completed);
        assert_eq!(result.first_divergence.unwrap().frame, 10);
        assert_eq!(result.frames_replayed, 10);
    }

    #[test]
    fn duplicate_checkpoint_is_rejected() {
        let mut log = record(5, 1);
        log.entries.push(ReplayEntry::Checkpoint {
            frame: 0,
            state_hash: "x".to_owned(),
        });
        assert!(matches!(
            replay(LevelGrid::level_one(), GameConfig::default(), &log),
            Err(ReplayError::DuplicateEntry {
                kind: "checkpoint",
                frame: 0
            })
        ));
    }

    #[test]
    fn entries_past_the_end_are_rejected() {
        let mut log = record(5, 0);
        log.entries.push(ReplayEntry::Frame {
            frame: 9,
            dt: 0.1,
            input: InputState::IDLE,
        });
        assert!(matches!(
            replay(LevelGrid::level_one(), GameConfig::default(), &log),
            Err(ReplayError::FrameOutOfRange { frame: 9, .. })
        ));
    }

    #[test]
    fn corrupted_initial_session_is_rejected() {
        let mut log = record(5, 0);
        log.initial_session.score = 9_999;
        assert!(matches!(
            replay(LevelGrid::level_one(), GameConfig::default(), &log),
            Err(ReplayError::InitialHashMismatch { .. })
        ));
    }

    #[test]
    fn controls_are_replayed() {
        let mut game = Game::new(LevelGrid::level_one(), GameConfig::default()).unwrap();
        let mut recorder = ReplayRecorder::new(game.capture_session(), 0);

        recorder.record_control(SessionControl::Start);
        game.start_game();
        for i in 0..30 {
            if i == 10 {
                recorder.record_control(SessionControl::TogglePause);
                game.toggle_pause();
            }
            recorder.record_tick(0.02, InputState::RIGHT, Some(game.state_hash()));
            game.update(0.02, &InputState::RIGHT);
        }
        recorder.record_control(SessionControl::TogglePause);
        game.toggle_pause();
        let log = recorder.finish(Some(game.state_hash()));

        let result = replay(LevelGrid::level_one(), GameConfig::default(), &log).unwrap();
        assert!(result.completed);
        assert_eq!(result.final_hash_matches, Some(true));
    }

    #[test]
    fn log_survives_json() {
        let log = record(10, 5);
        let json = serde_json::to_string(&log).unwrap();
        let back: ReplayLog = serde_json::from_str(&json).unwrap();
        let result = replay(LevelGrid::level_one(), GameConfig::default(), &back).unwrap();
        assert_eq!(result.final_hash_matches, Some(true));
    }
}
