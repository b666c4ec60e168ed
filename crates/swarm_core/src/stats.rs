//! Mission telemetry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Material, RobotId};
use crate::math::{fixed_serde, Fixed};

/// Running total for one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialTally {
    /// Pieces delivered to the mother station.
    pub count: u32,
    /// Sum of delivered piece sizes.
    #[serde(with = "fixed_serde")]
    pub total_size: Fixed,
}

/// Totals accumulated over a mission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MissionStats {
    /// Debris delivered home. This is the global collected counter.
    pub collected_count: u32,
    /// Debris claimed by a robot (delivered or still in flight).
    pub claimed_count: u32,
    /// Deliveries broken down by material.
    pub by_material: BTreeMap<Material, MaterialTally>,
    /// Completed round trips per robot.
    pub trips_by_robot: BTreeMap<RobotId, u32>,
    /// Total plane distance covered by all robots.
    #[serde(with = "fixed_serde")]
    pub distance_travelled: Fixed,
}

impl MissionStats {
    /// Record a claim.
    pub fn record_claim(&mut self) {
        self.claimed_count += 1;
    }

    /// Record distance covered in one move.
    pub fn record_distance(&mut self, distance: Fixed) {
        self.distance_travelled = self.distance_travelled.saturating_add(distance);
    }

    /// Record a robot arriving home with a piece.
    pub fn record_delivery(&mut self, robot: &RobotId, material: Material, size: Fixed) {
        self.collected_count += 1;

        let tally = self.by_material.entry(material).or_default();
        tally.count += 1;
        tally.total_size = tally.total_size.saturating_add(size);

        *self.trips_by_robot.entry(robot.clone()).or_default() += 1;
    }

    /// Claimed pieces still on their way home.
    #[must_use]
    pub const fn in_flight(&self) -> u32 {
        self.claimed_count.saturating_sub(self.collected_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_updates_all_totals() {
        let mut stats = MissionStats::default();
        let robot = RobotId::new("SR-01");

        stats.record_claim();
        stats.record_claim();
        stats.record_delivery(&robot, Material::Titanium, Fixed::from_num(2));
        stats.record_delivery(&robot, Material::Titanium, Fixed::from_num(3));

        assert_eq!(stats.collected_count, 2);
        assert_eq!(stats.in_flight(), 0);
        let titanium = stats.by_material[&Material::Titanium];
        assert_eq!(titanium.count, 2);
        assert_eq!(titanium.total_size, Fixed::from_num(5));
        assert_eq!(stats.trips_by_robot[&robot], 2);
    }

    #[test]
    fn test_distance_accumulates() {
        let mut stats = MissionStats::default();
        stats.record_distance(Fixed::from_num(1.5));
        stats.record_distance(Fixed::from_num(1.5));
        assert_eq!(stats.distance_travelled, Fixed::from_num(3));
    }
}
