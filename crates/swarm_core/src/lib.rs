//! # Swarm Core
//!
//! Deterministic simulation core for the debris-cleanup robot swarm.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (placement uses a seeded `ChaCha8Rng`)
//! - No floating-point math in the tick loop (uses fixed-point)
//!
//! This separation enables:
//! - Headless runs and scripted missions
//! - Save/restore of a running mission
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`components`] - Robot, debris and battery definitions
//! - [`registry`] - The fixed set of robots and debris
//! - [`selector`] - Nearest-target selection
//! - [`systems`] - Per-tick robot state machine
//! - [`scheduler`] - Tick loop lifecycle and one-shot timers
//! - [`simulation`] - Core simulation loop
//! - [`mission`] - Mission layouts
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod config;
pub mod error;
pub mod math;
pub mod mission;
pub mod placement;
pub mod registry;
pub mod scheduler;
pub mod selector;
pub mod simulation;
pub mod stats;
pub mod systems;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{SimConfig, TickParams};
    pub use crate::error::{Result, SwarmError};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::mission::{DebrisSpec, MissionFile};
    pub use crate::placement::FieldConfig;
    pub use crate::registry::EntityRegistry;
    pub use crate::simulation::{Simulation, Snapshot, SwarmState, TickEvents, TickObserver};
    pub use crate::stats::MissionStats;
    pub use crate::systems::SwarmEvent;
}
