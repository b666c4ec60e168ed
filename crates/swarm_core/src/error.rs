//! Error types for the swarm simulation.
//!
//! The tick loop itself never fails; these cover construction,
//! validation, configuration loading and save/restore.

use thiserror::Error;

use crate::components::RobotStatus;

/// Result type alias using [`SwarmError`].
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Top-level error type for all swarm simulation errors.
#[derive(Debug, Error)]
pub enum SwarmError {
    /// Two entities of the same kind share an identifier.
    #[error("Duplicate {kind} ID: {id}")]
    DuplicateId {
        /// Entity kind ("robot" or "debris").
        kind: &'static str,
        /// The repeated identifier.
        id: String,
    },

    /// A position lies outside the normalized 0-100 plane.
    #[error("{what} is outside the mission plane: ({x}, {y})")]
    OutOfBounds {
        /// What was being placed.
        what: String,
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },

    /// Unknown robot identifier.
    #[error("Robot not found: {0}")]
    RobotNotFound(String),

    /// Unknown debris identifier.
    #[error("Debris not found: {0}")]
    DebrisNotFound(String),

    /// A robot status change that skips or reverses the collection cycle.
    #[error("Invalid status transition for robot {robot}: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Robot whose status was being changed.
        robot: String,
        /// Current status.
        from: RobotStatus,
        /// Requested status.
        to: RobotStatus,
    },

    /// Configuration values that cannot drive a simulation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid simulation state (bad snapshot bytes, broken invariants).
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}
