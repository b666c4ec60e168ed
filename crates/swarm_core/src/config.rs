//! Simulation tuning.
//!
//! [`SimConfig`] is the human-facing form that lives in mission files.
//! It is validated once into [`TickParams`], the fixed-point values the
//! tick loop actually uses.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwarmError};
use crate::math::{fixed_serde, Fixed, MAX_PLANE_DISTANCE};
use crate::scheduler::DEFAULT_TICK_INTERVAL_MS;

/// Tunable simulation settings.
///
/// # Example RON
///
/// ```ron
/// SimConfig(
///     tick_interval_ms: 50,
///     robot_speed: 1.5,
///     battery_drain: 0.1,
///     arrival_threshold: 0.5,
///     dwell_ms: 1000,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Milliseconds between ticks.
    pub tick_interval_ms: u32,
    /// Plane units a robot covers per tick.
    pub robot_speed: f64,
    /// Battery percent lost per moving tick.
    pub battery_drain: f64,
    /// Distance at which a robot counts as arrived.
    pub arrival_threshold: f64,
    /// How long a robot spends collecting, in milliseconds.
    pub dwell_ms: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            robot_speed: 1.5,
            battery_drain: 0.1,
            arrival_threshold: 0.5,
            dwell_ms: 1000,
        }
    }
}

impl SimConfig {
    /// Validate and convert to fixed-point tick parameters.
    pub fn to_params(&self) -> Result<TickParams> {
        if self.tick_interval_ms == 0 {
            return Err(SwarmError::InvalidConfig(
                "tick_interval_ms must be greater than zero".into(),
            ));
        }

        let speed = to_fixed("robot_speed", self.robot_speed)?;
        if speed <= Fixed::ZERO {
            return Err(SwarmError::InvalidConfig(format!(
                "robot_speed must be positive, got {}",
                self.robot_speed
            )));
        }

        let battery_drain = to_fixed("battery_drain", self.battery_drain)?;
        if battery_drain < Fixed::ZERO || battery_drain > Fixed::from_num(100) {
            return Err(SwarmError::InvalidConfig(format!(
                "battery_drain must be within 0..=100, got {}",
                self.battery_drain
            )));
        }

        let arrival_threshold = to_fixed("arrival_threshold", self.arrival_threshold)?;
        if arrival_threshold < Fixed::ZERO || arrival_threshold > MAX_PLANE_DISTANCE {
            return Err(SwarmError::InvalidConfig(format!(
                "arrival_threshold must be within 0..={MAX_PLANE_DISTANCE}, got {}",
                self.arrival_threshold
            )));
        }

        Ok(TickParams {
            tick_interval_ms: self.tick_interval_ms,
            speed,
            battery_drain,
            arrival_threshold,
            dwell_ms: self.dwell_ms,
        })
    }
}

fn to_fixed(field: &str, value: f64) -> Result<Fixed> {
    if !value.is_finite() {
        return Err(SwarmError::InvalidConfig(format!(
            "{field} must be a finite number, got {value}"
        )));
    }
    Fixed::checked_from_num(value)
        .ok_or_else(|| SwarmError::InvalidConfig(format!("{field} is out of range: {value}")))
}

/// Validated fixed-point parameters used by every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickParams {
    /// Milliseconds between ticks.
    pub tick_interval_ms: u32,
    /// Plane units covered per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Battery lost per moving tick.
    #[serde(with = "fixed_serde")]
    pub battery_drain: Fixed,
    /// Arrival distance.
    #[serde(with = "fixed_serde")]
    pub arrival_threshold: Fixed,
    /// Collecting dwell in milliseconds.
    pub dwell_ms: u32,
}

impl Default for TickParams {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            speed: Fixed::from_num(1.5),
            battery_drain: Fixed::from_num(0.1),
            arrival_threshold: Fixed::from_num(0.5),
            dwell_ms: 1000,
        }
    }
}

impl TickParams {
    /// Override the robot speed.
    #[must_use]
    pub const fn with_speed(mut self, speed: Fixed) -> Self {
        self.speed = speed;
        self
    }

    /// Override the collecting dwell.
    #[must_use]
    pub const fn with_dwell_ms(mut self, dwell_ms: u32) -> Self {
        self.dwell_ms = dwell_ms;
        self
    }

    /// Number of whole ticks the dwell lasts, rounded up.
    #[must_use]
    pub const fn dwell_ticks(&self) -> u32 {
        self.dwell_ms.div_ceil(self.tick_interval_ms)
    }
}
