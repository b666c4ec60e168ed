//! Entity registry for robots, debris and the mother station.
//!
//! The registry is a fixed population: nothing is spawned or removed
//! while the mission runs. Iteration order is the order entities were
//! supplied in, which is what keeps target selection deterministic.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::components::{Debris, Robot, RobotStatus};
use crate::error::{Result, SwarmError};
use crate::math::Vec2Fixed;

/// Storage for every robot and debris piece in a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRegistry {
    /// Mother-station position robots launch from and return to.
    home: Vec2Fixed,
    /// Robots in registry order.
    robots: Vec<Robot>,
    /// Debris in registry order.
    debris: Vec<Debris>,
}

impl EntityRegistry {
    /// Build a registry, checking IDs are unique and everything is on the plane.
    pub fn new(home: Vec2Fixed, robots: Vec<Robot>, debris: Vec<Debris>) -> Result<Self> {
        ensure_in_plane("mother station", home)?;

        let mut seen = HashSet::new();
        for robot in &robots {
            if !seen.insert(robot.id.as_str()) {
                return Err(SwarmError::DuplicateId {
                    kind: "robot",
                    id: robot.id.0.clone(),
                });
            }
            ensure_in_plane(&format!("robot {}", robot.id), robot.position)?;
        }

        seen.clear();
        for piece in &debris {
            if !seen.insert(piece.id.as_str()) {
                return Err(SwarmError::DuplicateId {
                    kind: "debris",
                    id: piece.id.0.clone(),
                });
            }
            ensure_in_plane(&format!("debris {}", piece.id), piece.position)?;
        }

        Ok(Self {
            home,
            robots,
            debris,
        })
    }

    /// Build a registry with fresh robots parked at `home`.
    pub fn with_robot_ids<I, S>(home: Vec2Fixed, robot_ids: I, debris: Vec<Debris>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let robots = robot_ids
            .into_iter()
            .map(|id| Robot::new(id, home))
            .collect();
        Self::new(home, robots, debris)
    }

    /// Mother-station position.
    #[must_use]
    pub const fn home(&self) -> Vec2Fixed {
        self.home
    }

    /// All robots in registry order.
    #[must_use]
    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    /// All debris in registry order, collected or not.
    #[must_use]
    pub fn debris(&self) -> &[Debris] {
        &self.debris
    }

    /// Look up a robot mutably by ID.
    pub fn robot_mut(&mut self, id: &str) -> Result<&mut Robot> {
        self.robots
            .iter_mut()
            .find(|r| r.id.as_str() == id)
            .ok_or_else(|| SwarmError::RobotNotFound(id.to_string()))
    }

    /// Look up a debris piece by ID.
    #[must_use]
    pub fn debris_by_id(&self, id: &str) -> Option<&Debris> {
        self.debris.iter().find(|d| d.id.as_str() == id)
    }

    /// Debris that no robot has claimed yet.
    pub fn available_debris(&self) -> impl Iterator<Item = &Debris> {
        self.debris.iter().filter(|d| d.is_available())
    }

    /// Number of unclaimed debris pieces.
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available_debris().count()
    }

    /// Mark the debris at `index` as collected.
    ///
    /// Returns `None` if the index is out of range or the piece was already
    /// claimed, so a piece can never be handed out twice.
    pub fn claim(&mut self, index: usize) -> Option<&Debris> {
        claim_in(&mut self.debris, index)
    }

    /// Split borrows so systems can walk robots while claiming debris.
    pub(crate) fn parts_mut(&mut self) -> (Vec2Fixed, &mut [Robot], &mut [Debris]) {
        (self.home, &mut self.robots, &mut self.debris)
    }

    /// Check cross-entity invariants.
    ///
    /// Every robot's status must agree with what it carries, carried debris
    /// must exist and be flagged collected, and no piece may be carried twice.
    pub fn check_invariants(&self) -> Result<()> {
        let mut carried = HashSet::new();
        for robot in &self.robots {
            if !robot.is_consistent() {
                return Err(SwarmError::InvalidState(format!(
                    "robot {} is {:?} but carrying {:?}",
                    robot.id, robot.status, robot.carrying
                )));
            }
            if let Some(debris_id) = &robot.carrying {
                let piece = self
                    .debris_by_id(debris_id.as_str())
                    .ok_or_else(|| SwarmError::DebrisNotFound(debris_id.0.clone()))?;
                if !piece.collected {
                    return Err(SwarmError::InvalidState(format!(
                        "robot {} carries unclaimed debris {}",
                        robot.id, debris_id
                    )));
                }
                if !carried.insert(debris_id.as_str()) {
                    return Err(SwarmError::InvalidState(format!(
                        "debris {debris_id} is carried by more than one robot"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of robots currently in `status`.
    #[must_use]
    pub fn count_in_status(&self, status: RobotStatus) -> usize {
        self.robots.iter().filter(|r| r.status == status).count()
    }
}

/// Claim helper shared with systems that hold a split borrow.
pub(crate) fn claim_in(debris: &mut [Debris], index: usize) -> Option<&Debris> {
    let piece = debris.get_mut(index)?;
    if piece.collected {
        return None;
    }
    piece.collected = true;
    Some(piece)
}

fn ensure_in_plane(what: &str, position: Vec2Fixed) -> Result<()> {
    if position.in_plane() {
        Ok(())
    } else {
        Err(SwarmError::OutOfBounds {
            what: what.to_string(),
            x: position.x.to_num(),
            y: position.y.to_num(),
        })
    }
}
