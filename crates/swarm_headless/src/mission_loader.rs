//! Mission file loading.
//!
//! Missions are RON files describing the mother station, the robot roster
//! and the debris layout. See [`MissionFile`] for the format.

use std::path::Path;

use swarm_core::error::SwarmError;
use swarm_core::mission::MissionFile;
use swarm_core::placement::FieldConfig;
use swarm_core::simulation::Simulation;
use thiserror::Error;

/// Error type for mission operations.
#[derive(Error, Debug)]
pub enum MissionError {
    /// File not found.
    #[error("Mission file not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("Failed to access mission file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a well-formed mission.
    #[error("{0}")]
    ParseError(SwarmError),
    /// The mission parsed but cannot be simulated.
    #[error("Invalid mission: {0}")]
    Invalid(#[from] SwarmError),
}

/// Load a mission from a RON file.
pub fn load_mission<P: AsRef<Path>>(path: P) -> Result<MissionFile, MissionError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MissionError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    MissionFile::from_ron(&contents, &path.display().to_string())
        .map_err(MissionError::ParseError)
}

/// Write a mission to a RON file.
pub fn save_mission<P: AsRef<Path>>(path: P, mission: &MissionFile) -> Result<(), MissionError> {
    std::fs::write(path, mission.to_ron()?)?;
    Ok(())
}

/// Load the mission at `path`, or the built-in default when `path` is `None`,
/// and build a stopped simulation from it.
pub fn open_simulation(path: Option<&Path>) -> Result<Simulation, MissionError> {
    let mission = match path {
        Some(path) => {
            tracing::info!("Loading mission: {}", path.display());
            load_mission(path)?
        }
        None => MissionFile::default_mission(),
    };
    Ok(Simulation::from_mission(&mission)?)
}

/// A mission whose debris is entirely seeded random placement.
#[must_use]
pub fn generated_mission(name: &str, seed: u64, robots: u32, count: u32) -> MissionFile {
    MissionFile {
        name: name.to_string(),
        robots: (1..=robots).map(|i| format!("SR-{i:02}")).collect(),
        debris: Vec::new(),
        field: Some(FieldConfig::default().with_seed(seed).with_count(count)),
        ..MissionFile::default_mission()
    }
}
