//! Entity component definitions.
//!
//! Robots and debris are plain data. All behavior that changes them
//! over time lives in [`crate::systems`] and [`crate::simulation`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwarmError};
use crate::math::{fixed_serde, option_vec2_serde, Fixed, Vec2Fixed};

/// Unique identifier for a collection robot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotId(pub String);

/// Unique identifier for a debris piece.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DebrisId(pub String);

impl RobotId {
    /// Create a robot ID from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DebrisId {
    /// Create a debris ID from anything string-like.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RobotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for DebrisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Debris
// ============================================================================

/// Material label carried by a debris piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Spent stage and hull fragments.
    Aluminum,
    /// Engine and pressure-vessel parts.
    Titanium,
    /// Fairings and structural panels.
    CarbonComposite,
    /// Detached solar arrays.
    SolarPanel,
    /// Dead satellite avionics.
    Electronics,
}

impl Material {
    /// Every material, in declaration order.
    pub const ALL: [Material; 5] = [
        Material::Aluminum,
        Material::Titanium,
        Material::CarbonComposite,
        Material::SolarPanel,
        Material::Electronics,
    ];

    /// The snake_case label used on the wire.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Material::Aluminum => "aluminum",
            Material::Titanium => "titanium",
            Material::CarbonComposite => "carbon_composite",
            Material::SolarPanel => "solar_panel",
            Material::Electronics => "electronics",
        }
    }
}

/// A piece of debris that robots collect.
///
/// Only `collected` changes after creation. It flips to `true` the moment
/// a robot claims the piece, not when the robot reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debris {
    /// Unique identifier.
    pub id: DebrisId,
    /// Position in the mission plane.
    pub position: Vec2Fixed,
    /// Whether a robot has claimed this piece.
    pub collected: bool,
    /// Material label.
    pub material: Material,
    /// Size scalar.
    #[serde(with = "fixed_serde")]
    pub size: Fixed,
}

impl Debris {
    /// Create an uncollected debris piece.
    #[must_use]
    pub fn new(id: impl Into<String>, position: Vec2Fixed, material: Material, size: Fixed) -> Self {
        Self {
            id: DebrisId::new(id),
            position,
            collected: false,
            material,
            size,
        }
    }

    /// Whether this piece can still be targeted.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !self.collected
    }
}

// ============================================================================
// Robots
// ============================================================================

/// Collection cycle of a robot.
///
/// The only legal order is
/// `Idle -> MovingToTarget -> Collecting -> Returning -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    /// Parked at the mother station, waiting for a target.
    #[default]
    Idle,
    /// Flying toward claimed debris.
    MovingToTarget,
    /// Capturing debris; ends after a fixed dwell.
    Collecting,
    /// Carrying debris back to the mother station.
    Returning,
}

impl RobotStatus {
    /// The status that follows this one in the collection cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::MovingToTarget,
            Self::MovingToTarget => Self::Collecting,
            Self::Collecting => Self::Returning,
            Self::Returning => Self::Idle,
        }
    }

    /// Whether moving from `self` to `to` follows the cycle.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == to
    }

    /// Whether robots in this status move and drain battery each tick.
    #[must_use]
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::MovingToTarget | Self::Returning)
    }
}

/// Battery charge, clamped to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Battery(#[serde(with = "fixed_serde")] Fixed);

impl Battery {
    /// Full charge.
    pub const FULL: Self = Self(Fixed::const_from_int(100));

    /// Empty charge.
    pub const EMPTY: Self = Self(Fixed::ZERO);

    /// Create a battery level, clamped into range.
    #[must_use]
    pub fn new(level: Fixed) -> Self {
        Self(level.clamp(Self::EMPTY.0, Self::FULL.0))
    }

    /// Current charge level.
    #[must_use]
    pub const fn level(self) -> Fixed {
        self.0
    }

    /// Whether the battery is completely drained.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 <= Fixed::ZERO
    }

    /// Drain the battery, never going below zero.
    ///
    /// Returns true if this drain emptied a battery that still had charge.
    pub fn drain(&mut self, amount: Fixed) -> bool {
        let was_empty = self.is_empty();
        *self = Self::new(self.0 - amount);
        !was_empty && self.is_empty()
    }

    /// Recharge to full.
    pub fn recharge(&mut self) {
        *self = Self::FULL;
    }
}

impl Default for Battery {
    fn default() -> Self {
        Self::FULL
    }
}

/// A collection robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    /// Unique identifier.
    pub id: RobotId,
    /// Current position.
    pub position: Vec2Fixed,
    /// Where the robot is heading, if anywhere.
    #[serde(with = "option_vec2_serde")]
    pub target: Option<Vec2Fixed>,
    /// Collection cycle status.
    pub status: RobotStatus,
    /// Battery charge.
    pub battery: Battery,
    /// Debris this robot has claimed and is working on.
    pub carrying: Option<DebrisId>,
    /// Trail of positions for the current trip.
    pub path: Vec<Vec2Fixed>,
}

impl Robot {
    /// Create an idle robot with a full battery at `home`.
    #[must_use]
    pub fn new(id: impl Into<String>, home: Vec2Fixed) -> Self {
        Self {
            id: RobotId::new(id),
            position: home,
            target: None,
            status: RobotStatus::Idle,
            battery: Battery::FULL,
            carrying: None,
            path: Vec::new(),
        }
    }

    /// Move to the next status in the collection cycle.
    ///
    /// Returns the new status.
    pub fn advance_status(&mut self) -> RobotStatus {
        self.status = self.status.next();
        self.status
    }

    /// Set a specific status, rejecting anything that skips the cycle.
    pub fn set_status(&mut self, to: RobotStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(SwarmError::InvalidTransition {
                robot: self.id.0.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Check the carrying/status pairing.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.status == RobotStatus::Idle {
            return self.carrying.is_none() && self.target.is_none();
        }
        self.carrying.is_some() && (!self.status.is_moving() || self.target.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cycle() {
        let mut status = RobotStatus::Idle;
        let mut seen = Vec::new();
        for _ in 0..4 {
            status = status.next();
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                RobotStatus::MovingToTarget,
                RobotStatus::Collecting,
                RobotStatus::Returning,
                RobotStatus::Idle,
            ]
        );
    }

    #[test]
    fn test_set_status_rejects_skips() {
        let mut robot = Robot::new("r1", Vec2Fixed::ZERO);
        let err = robot.set_status(RobotStatus::Collecting).unwrap_err();
        assert!(matches!(
            err,
            SwarmError::InvalidTransition {
                from: RobotStatus::Idle,
                to: RobotStatus::Collecting,
                ..
            }
        ));
        assert_eq!(robot.status, RobotStatus::Idle);

        robot.set_status(RobotStatus::MovingToTarget).unwrap();
        assert!(robot.set_status(RobotStatus::Idle).is_err());
    }

    #[test]
    fn test_battery_clamps() {
        let mut battery = Battery::new(Fixed::from_num(150));
        assert_eq!(battery, Battery::FULL);

        assert!(!battery.drain(Fixed::from_num(99)));
        assert_eq!(battery.level(), Fixed::ONE);

        // Crossing zero reports once, then stays at zero
        assert!(battery.drain(Fixed::from_num(5)));
        assert_eq!(battery, Battery::EMPTY);
        assert!(!battery.drain(Fixed::from_num(5)));
        assert_eq!(battery, Battery::EMPTY);

        battery.recharge();
        assert_eq!(battery.level(), Fixed::from_num(100));
    }

    #[test]
    fn test_material_labels_match_serde() {
        for material in Material::ALL {
            let encoded = ron::to_string(&material).unwrap();
            assert_eq!(encoded, material.label());
        }
    }

    #[test]
    fn test_new_robot_is_consistent() {
        let robot = Robot::new("r1", Vec2Fixed::from_int(50, 50));
        assert!(robot.is_consistent());
        assert_eq!(robot.battery, Battery::FULL);
        assert!(robot.path.is_empty());
    }
}
