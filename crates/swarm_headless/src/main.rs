//! Headless swarm mission runner.
//!
//! This binary runs the debris-cleanup simulation without graphics,
//! controlled via JSON on stdin/stdout. Designed for scripted controllers,
//! CI testing, and mission authoring.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p swarm_headless
//!
//! # Run a mission to completion
//! cargo run -p swarm_headless -- run --mission missions/sweep.ron
//!
//! # Pace ticks in real time and stream snapshots
//! cargo run -p swarm_headless -- run --realtime --snapshots
//!
//! # Generate a seeded mission file
//! cargo run -p swarm_headless -- generate --seed 42 --count 30 --output sweep.ron
//!
//! # Validate a mission file
//! cargo run -p swarm_headless -- validate sweep.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swarm_headless::{
    mission_loader::{generated_mission, load_mission, open_simulation},
    runner::{verify_determinism, HeadlessRunner, RunOptions, DEFAULT_MAX_TICKS},
};
use swarm_core::mission::MissionFile;

#[derive(Parser)]
#[command(name = "swarm_headless")]
#[command(about = "Headless swarm mission runner for scripted control and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mission until every piece is home or the tick limit is hit
    Run {
        /// Mission file to load (built-in default if omitted)
        #[arg(short, long)]
        mission: Option<PathBuf>,

        /// Maximum number of ticks
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Pace ticks at the mission's tick interval
        #[arg(long)]
        realtime: bool,

        /// Print a state line after every tick
        #[arg(long)]
        snapshots: bool,
    },

    /// Serve the JSON-lines protocol on stdin/stdout
    Interactive {
        /// Mission file to load (built-in default if omitted)
        #[arg(short, long)]
        mission: Option<PathBuf>,
    },

    /// Print a seeded, randomly placed mission as RON
    Generate {
        /// Mission name
        #[arg(long, default_value = "Generated sweep")]
        name: String,

        /// Random seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of robots
        #[arg(short, long, default_value = "3")]
        robots: u32,

        /// Number of debris pieces
        #[arg(short, long, default_value = "12")]
        count: u32,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load and validate a mission file
    Validate {
        /// Mission file path
        path: PathBuf,
    },

    /// Verify determinism by running the same mission several times
    Verify {
        /// Mission file to load (built-in default if omitted)
        #[arg(short, long)]
        mission: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Maximum ticks per run
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr (stdout is for protocol). RUST_LOG overrides the flag.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Some(Commands::Run {
            mission,
            max_ticks,
            realtime,
            snapshots,
        }) => cmd_run(
            mission,
            RunOptions {
                max_ticks,
                realtime,
                snapshots,
            },
        ),
        Some(Commands::Interactive { mission }) => cmd_interactive(mission),
        Some(Commands::Generate {
            name,
            seed,
            robots,
            count,
            output,
        }) => cmd_generate(&name, seed, robots, count, output),
        Some(Commands::Validate { path }) => cmd_validate(&path),
        Some(Commands::Verify {
            mission,
            runs,
            max_ticks,
        }) => cmd_verify(mission, runs, max_ticks),
        None => cmd_interactive(None),
    }
}

fn load_or_default(path: Option<PathBuf>) -> MissionFile {
    match path {
        Some(path) => match load_mission(&path) {
            Ok(mission) => mission,
            Err(e) => {
                eprintln!("Failed to load mission: {e}");
                std::process::exit(1);
            }
        },
        None => MissionFile::default_mission(),
    }
}

/// Run a mission to completion
fn cmd_run(mission: Option<PathBuf>, options: RunOptions) {
    let mission = load_or_default(mission);
    tracing::info!(mission = %mission.name, realtime = options.realtime, "Starting run");

    let mut runner = match HeadlessRunner::from_mission(&mission) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Invalid mission: {e}");
            std::process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = runner.run(&options, &mut stdout) {
        eprintln!("Run failed: {e}");
        std::process::exit(1);
    }
}

/// Serve the interactive protocol
fn cmd_interactive(mission: Option<PathBuf>) {
    tracing::info!("Starting interactive session");

    let mission = load_or_default(mission);
    let mut runner = match HeadlessRunner::from_mission(&mission) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Invalid mission: {e}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    if let Err(e) = runner.run_interactive(stdin, &mut stdout) {
        eprintln!("Session failed: {e}");
        std::process::exit(1);
    }
}

/// Generate a seeded mission file
fn cmd_generate(name: &str, seed: u64, robots: u32, count: u32, output: Option<PathBuf>) {
    let mission = generated_mission(name, seed, robots, count);
    if let Err(e) = mission.build() {
        eprintln!("Cannot generate mission: {e}");
        std::process::exit(1);
    }

    let text = match mission.to_ron() {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, text) {
                eprintln!("Failed to write {}: {e}", path.display());
                std::process::exit(1);
            }
            tracing::info!("Wrote mission to {}", path.display());
        }
        None => println!("{text}"),
    }
}

/// Validate a mission file
fn cmd_validate(path: &Path) {
    match open_simulation(Some(path)) {
        Ok(sim) => {
            eprintln!("OK: {}", path.display());
            eprintln!("  Robots: {}", sim.robots().len());
            eprintln!("  Debris: {}", sim.debris().len());
            eprintln!("  Tick interval: {} ms", sim.params().tick_interval_ms);
        }
        Err(e) => {
            eprintln!("FAIL: {e}");
            std::process::exit(1);
        }
    }
}

/// Verify determinism
fn cmd_verify(mission: Option<PathBuf>, runs: u32, max_ticks: u64) {
    let mission = load_or_default(mission);
    tracing::info!(
        "Verifying determinism: {} ({} runs)",
        mission.name,
        runs
    );

    let hashes = match verify_determinism(&mission, runs, max_ticks) {
        Ok(hashes) => hashes,
        Err(e) => {
            eprintln!("Invalid mission: {e}");
            std::process::exit(1);
        }
    };

    if hashes.windows(2).all(|w| w[0] == w[1]) {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, hash) in hashes.iter().enumerate() {
            eprintln!("  Run {run}: {hash:016x}");
        }
        std::process::exit(1);
    }
}
