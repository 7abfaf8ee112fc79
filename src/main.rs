//! Star Rift entry point
//!
//! Headless demo: loads an optional config file, lets the autopilot play for
//! a while of simulated time and prints the session stats.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use star_rift::consts::*;
use star_rift::services::LogServices;
use star_rift::sim::{GamePhase, TickInput};
use star_rift::{GameConfig, GameLoop, Settings};

#[derive(Parser, Debug)]
#[command(name = "star-rift")]
#[command(about = "Headless Star Rift run flown by the autopilot")]
struct Cli {
    /// Stage/boss/enemy config (JSON); built-in tuning when omitted
    config: Option<PathBuf>,
    /// Run seed
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
    /// Simulated seconds to run for
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Star Rift (headless) starting...");

    let config = match &cli.config {
        Some(path) => match GameConfig::load_file(path) {
            Ok((config, problems)) => {
                for problem in &problems {
                    log::warn!("{}", problem);
                }
                config
            }
            Err(e) => {
                log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => GameConfig::default(),
    };

    let mut game = GameLoop::new(cli.seed, config, Settings::default(), LogServices::new());
    game.set_input(TickInput {
        idle_mode: true,
        ..Default::default()
    });

    let frames = (cli.seconds.max(0.0) / FRAME_DT) as u32;
    for _ in 0..frames {
        game.tick(FRAME_DT);
        if game.world().phase == GamePhase::GameOver {
            break;
        }
    }

    let world = game.world();
    println!(
        "seed {}  score {}  stage {}  level {}  time {:.1}s",
        cli.seed, world.score, world.stage, world.level, world.time
    );
    match serde_json::to_string_pretty(game.stats()) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to encode stats: {}", e),
    }

    game.shutdown();
    ExitCode::SUCCESS
}
