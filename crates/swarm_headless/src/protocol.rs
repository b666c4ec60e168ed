//! JSON protocol for headless mission control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** State updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner outputs state after each `tick` command (or on `query`)
//! 4. On `quit`, outputs `{"type":"bye"}` and exits
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"start"}
//! <- {"type":"ack","cmd":"start"}
//! -> {"cmd":"tick","count":20}
//! <- {"type":"state","tick":20,"running":true,"robots":[...],"debris":[...],...}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":20,"hash":1234567890}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};
use swarm_core::components::{Debris, Material, Robot, RobotStatus};
use swarm_core::math::Fixed;
use swarm_core::simulation::Snapshot;

/// Protocol version reported in the ready message.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Schedule the tick loop.
    Start,

    /// Halt the tick loop.
    Stop,

    /// Restore the initial layout and halt.
    Reset,

    /// Advance simulation by N ticks (default: 1).
    Tick {
        /// Number of ticks to run.
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current state without advancing time.
    Query,

    /// Report the state hash (for determinism verification).
    Hash,

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
    },

    /// Acknowledgment of a command.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// Error processing a command.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, if the line parsed.
        cmd: Option<String>,
    },

    /// Full mission state.
    State(MissionState),

    /// State hash for determinism verification.
    StateHash {
        /// Current tick.
        tick: u64,
        /// Deterministic state hash.
        hash: u64,
    },

    /// End-of-run totals.
    Summary(RunSummary),

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Mission state in plain floats for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionState {
    /// Tick number.
    pub tick: u64,
    /// Simulated milliseconds since reset.
    pub elapsed_ms: u64,
    /// Whether the loop is running.
    pub running: bool,
    /// Debris delivered home.
    pub collected_count: u32,
    /// Mother-station position.
    pub home: (f64, f64),
    /// Every robot.
    pub robots: Vec<RobotState>,
    /// Every debris piece.
    pub debris: Vec<DebrisState>,
}

/// State of a single robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    /// Robot ID.
    pub id: String,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Collection-cycle status.
    pub status: RobotStatus,
    /// Battery percent.
    pub battery: f64,
    /// Debris on board or targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrying: Option<String>,
    /// Current destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<(f64, f64)>,
    /// Points visited on the current trip.
    pub path_len: usize,
}

/// State of a single debris piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebrisState {
    /// Debris ID.
    pub id: String,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Claimed or delivered.
    pub collected: bool,
    /// Material.
    pub material: Material,
    /// Relative size.
    pub size: f64,
}

/// Totals printed at the end of a `run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Mission name.
    pub mission: String,
    /// Ticks executed.
    pub ticks: u64,
    /// Debris delivered home.
    pub collected_count: u32,
    /// Debris in the mission.
    pub total_debris: usize,
    /// Whether every piece was delivered.
    pub complete: bool,
    /// Plane distance covered by all robots.
    pub distance_travelled: f64,
    /// Final state hash.
    pub hash: u64,
}

fn to_f64(value: Fixed) -> f64 {
    value.to_num()
}

impl From<&Robot> for RobotState {
    fn from(robot: &Robot) -> Self {
        Self {
            id: robot.id.to_string(),
            x: to_f64(robot.position.x),
            y: to_f64(robot.position.y),
            status: robot.status,
            battery: to_f64(robot.battery.level()),
            carrying: robot.carrying.as_ref().map(ToString::to_string),
            target: robot.target.map(|t| (to_f64(t.x), to_f64(t.y))),
            path_len: robot.path.len(),
        }
    }
}

impl From<&Debris> for DebrisState {
    fn from(piece: &Debris) -> Self {
        Self {
            id: piece.id.to_string(),
            x: to_f64(piece.position.x),
            y: to_f64(piece.position.y),
            collected: piece.collected,
            material: piece.material,
            size: to_f64(piece.size),
        }
    }
}

impl From<&Snapshot> for MissionState {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            tick: snapshot.tick,
            elapsed_ms: snapshot.elapsed_ms,
            running: snapshot.running,
            collected_count: snapshot.collected_count,
            home: (to_f64(snapshot.home.x), to_f64(snapshot.home.y)),
            robots: snapshot.robots.iter().map(RobotState::from).collect(),
            debris: snapshot.debris.iter().map(DebrisState::from).collect(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Create a state response from a snapshot.
    pub fn state(snapshot: &Snapshot) -> Self {
        Self::State(MissionState::from(snapshot))
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_core::mission::MissionFile;
    use swarm_core::simulation::Simulation;

    #[test]
    fn test_parse_tick_command() {
        let cmd = Command::from_json(r#"{"cmd":"tick","count":60}"#).unwrap();
        assert_eq!(cmd, Command::Tick { count: 60 });
    }

    #[test]
    fn test_default_tick_count() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert_eq!(cmd, Command::Tick { count: 1 });
    }

    #[test]
    fn test_parse_lifecycle_commands() {
        for (json, expected) in [
            (r#"{"cmd":"start"}"#, Command::Start),
            (r#"{"cmd":"stop"}"#, Command::Stop),
            (r#"{"cmd":"reset"}"#, Command::Reset),
            (r#"{"cmd":"quit"}"#, Command::Quit),
        ] {
            let cmd = Command::from_json(json).unwrap();
            assert_eq!(cmd.name(), json.split('"').nth(3).unwrap());
            assert_eq!(cmd, expected);
        }
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Command::from_json(r#"{"cmd":"spawn"}"#).is_err());
    }

    #[test]
    fn test_serialize_state_response() {
        let sim = Simulation::from_mission(&MissionFile::default_mission()).unwrap();
        let json = Response::state(&sim.snapshot()).to_json_line();

        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"state""#));
        assert!(json.contains(r#""tick":0"#));
        assert!(json.contains(r#""status":"idle""#));
        assert!(json.contains(r#""material":"titanium""#));
        assert!(json.contains(r#""home":[50.0,50.0]"#));
        // Idle robots carry nothing and have no target.
        assert!(!json.contains("carrying"));
    }

    #[test]
    fn test_serialize_simple_responses() {
        assert_eq!(
            Response::ready(0).to_json_line(),
            "{\"type\":\"ready\",\"version\":\"1.0\",\"tick\":0}\n"
        );
        assert_eq!(Response::Bye.to_json_line(), "{\"type\":\"bye\"}\n");
        assert!(Response::error("boom", Some("tick"))
            .to_json_line()
            .contains(r#""cmd":"tick""#));
    }
}
