//! Headless run of the built-in level with scripted input.
//!
//! The script holds right and hops at a fixed cadence, printing the HUD once
//! per simulated second, until the session ends or the tick budget runs out.
//! A recorded replay of the run is verified at the end.
//!
//! Run with: `cargo run -p hopper-engine --example headless_run -- [seconds] [config.json]`
//!
//! Set `RUST_LOG=hopper_engine=debug` to see stomps, coins and hits.

use anyhow::Context;
use hopper_engine::prelude::*;

const DT: f64 = 1.0 / 60.0;

fn scripted_input(tick: u64) -> InputState {
    InputState {
        left: false,
        right: true,
        jump: tick % 45 < 3,
    }
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seconds: u64 = match args.next() {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid number of seconds: {arg:?}"))?,
        None => 60,
    };
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            GameConfig::from_json_str(&json).with_context(|| format!("bad config in {path}"))?
        }
        None => GameConfig::default(),
    };

    let grid = LevelGrid::level_one();
    let mut game = Game::new(grid.clone(), config.clone()).context("failed to build game")?;
    let mut recorder = ReplayRecorder::new(game.capture_session(), 60);

    recorder.record_control(SessionControl::Start);
    game.start_game();

    let ticks = seconds * 60;
    for tick in 0..ticks {
        let input = scripted_input(tick);
        recorder.record_tick(DT, input, Some(game.state_hash()));
        let outcome = game.update(DT, &input);

        if let Some(status) = outcome.status_change() {
            tracing::info!(tick, ?status, "session ended");
        }
        if tick % 60 == 0 {
            let hud = game.frame().hud;
            println!(
                "t={:>3}s score={:>5} lives={} time={:>6.2} status={:?} camera_x={:.1}",
                tick / 60,
                hud.score,
                hud.lives,
                hud.time,
                hud.status,
                game.camera_x()
            );
        }
        if game.status().is_terminal() {
            break;
        }
    }

    let diag = game.last_diagnostics();
    for (name, time) in &diag.system_times {
        tracing::debug!(system = *name, micros = time.as_micros() as u64, "last tick timing");
    }

    println!(
        "final: status={:?} score={} lives={} ticks={} hash={}",
        game.status(),
        game.score(),
        game.lives(),
        game.tick_count(),
        game.state_hash()
    );

    let log = recorder.finish(Some(game.state_hash()));
    let result = replay(grid, config, &log).context("replay failed to start")?;
    anyhow::ensure!(
        result.first_divergence.is_none() && result.final_hash_matches == Some(true),
        "replay diverged: {:?}",
        result.first_divergence
    );
    println!("replay verified over {} frames", result.frames_replayed);

    Ok(())
}
