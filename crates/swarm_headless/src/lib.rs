//! Headless mission runner for scripted control and CI verification.
//!
//! This crate runs the swarm simulation without any renderer. It can be
//! controlled via JSON commands on stdin, with mission state on stdout.
//! This enables:
//!
//! - **Scripted control**: an external controller starts, pauses and steps
//!   the swarm
//! - **CI verification**: automated runs of whole missions and determinism
//!   checks
//! - **Mission authoring**: generate and validate RON mission files
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (start, tick, query, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! printf '{"cmd":"start"}\n{"cmd":"tick","count":60}\n' | cargo run -p swarm_headless
//!
//! # Run a mission to completion, streaming snapshots
//! cargo run -p swarm_headless -- run --mission missions/sweep.ron --snapshots
//!
//! # Verify determinism
//! cargo run -p swarm_headless -- verify --runs 5
//! ```

pub mod mission_loader;
pub mod protocol;
pub mod runner;

pub use mission_loader::{load_mission, MissionError};
pub use protocol::{Command, Response};
pub use runner::{HeadlessRunner, RunOptions};
