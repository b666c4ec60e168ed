//! Simulation systems.
//!
//! Systems contain the logic that advances robots each tick.
//! They operate on registry data directly and use fixed-point math
//! throughout.

use serde::{Deserialize, Serialize};

use crate::components::{Debris, DebrisId, Robot, RobotId, RobotStatus};
use crate::config::TickParams;
use crate::math::{fixed_sqrt, Fixed, Vec2Fixed};
use crate::registry::{claim_in, EntityRegistry};
use crate::scheduler::{Scheduler, TimerKind};
use crate::selector::nearest_available_index;
use crate::stats::MissionStats;

/// Events generated by the robot systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SwarmEvent {
    /// An idle robot reserved a piece and set off toward it.
    ///
    /// The piece is flagged `collected` at this point, before the robot
    /// reaches it. That early flag is what stops two robots chasing it.
    DebrisClaimed {
        /// The robot.
        robot: RobotId,
        /// The claimed piece.
        debris: DebrisId,
    },
    /// A robot reached its debris and began collecting.
    ArrivedAtDebris {
        /// The robot.
        robot: RobotId,
        /// The piece being collected.
        debris: DebrisId,
    },
    /// The collecting dwell ended and the robot headed home.
    CollectionFinished {
        /// The robot.
        robot: RobotId,
        /// The piece on board.
        debris: DebrisId,
    },
    /// A robot delivered its piece and went idle.
    ReturnedHome {
        /// The robot.
        robot: RobotId,
        /// The delivered piece.
        debris: DebrisId,
    },
    /// A robot's battery ran out while moving.
    BatteryDepleted {
        /// The robot.
        robot: RobotId,
    },
}

/// Step `current` toward `target` by at most `speed`.
///
/// Snaps exactly onto `target` when it is no further than one step away,
/// which also covers `current == target` without dividing by zero.
/// Otherwise the step's squared length never exceeds `speed * speed`.
#[must_use]
pub fn move_towards(current: Vec2Fixed, target: Vec2Fixed, speed: Fixed) -> Vec2Fixed {
    let delta = target - current;
    let length_sq = delta.dot(delta);
    let mut distance = fixed_sqrt(length_sq);

    if distance <= speed {
        return target;
    }

    // fixed_sqrt rounds down; scale by a length that is never short.
    if distance * distance < length_sq {
        distance += Fixed::DELTA;
    }

    // Magnitudes only, so rounding always shrinks the step.
    let mut step_x = delta.x.abs() * speed / distance;
    let mut step_y = delta.y.abs() * speed / distance;
    let limit = speed * speed;
    while step_x * step_x + step_y * step_y > limit {
        if step_x >= step_y {
            step_x -= Fixed::DELTA;
        } else {
            step_y -= Fixed::DELTA;
        }
    }

    Vec2Fixed::new(
        offset(current.x, delta.x, step_x),
        offset(current.y, delta.y, step_y),
    )
}

fn offset(from: Fixed, direction: Fixed, step: Fixed) -> Fixed {
    if direction < Fixed::ZERO {
        from - step
    } else {
        from + step
    }
}

/// Whether two points are within `threshold` of each other.
#[must_use]
pub fn is_within(a: Vec2Fixed, b: Vec2Fixed, threshold: Fixed) -> bool {
    a.distance_squared(b) <= threshold.saturating_mul(threshold)
}

/// Advance every robot by one tick.
///
/// Robots are processed in registry order. An idle robot's claim is
/// visible to every robot processed after it in the same tick.
pub fn robot_system(
    registry: &mut EntityRegistry,
    scheduler: &mut Scheduler,
    params: &TickParams,
    stats: &mut MissionStats,
) -> Vec<SwarmEvent> {
    let mut events = Vec::new();
    let (home, robots, debris) = registry.parts_mut();

    for robot in robots.iter_mut() {
        match robot.status {
            RobotStatus::Idle => {
                if let Some(event) = assign_nearest(robot, debris) {
                    stats.record_claim();
                    events.push(event);
                }
            }

            RobotStatus::MovingToTarget => {
                let (Some(target), Some(debris_id)) = (robot.target, robot.carrying.clone())
                else {
                    continue;
                };
                travel(robot, target, params, stats, &mut events);

                if is_within(robot.position, target, params.arrival_threshold) {
                    robot.advance_status();
                    scheduler.schedule_after(
                        params.dwell_ms,
                        TimerKind::DwellComplete(robot.id.clone()),
                    );

                    tracing::debug!(robot = %robot.id, debris = %debris_id, "Arrived at debris");
                    events.push(SwarmEvent::ArrivedAtDebris {
                        robot: robot.id.clone(),
                        debris: debris_id,
                    });
                }
            }

            // Leaves this status only through its dwell timer.
            RobotStatus::Collecting => {}

            RobotStatus::Returning => {
                travel(robot, home, params, stats, &mut events);

                if is_within(robot.position, home, params.arrival_threshold) {
                    if let Some(event) = complete_return(robot, debris, stats) {
                        events.push(event);
                    }
                }
            }
        }
    }

    events
}

/// Finish a robot's collecting dwell and send it home.
///
/// Timers for robots that are no longer collecting are ignored.
pub fn finish_dwell(registry: &mut EntityRegistry, robot_id: &RobotId) -> Option<SwarmEvent> {
    let home = registry.home();
    let robot = match registry.robot_mut(robot_id.as_str()) {
        Ok(robot) => robot,
        Err(err) => {
            tracing::warn!(%err, "Dwell timer fired for unknown robot");
            return None;
        }
    };

    if let Err(err) = robot.set_status(RobotStatus::Returning) {
        tracing::debug!(%err, "Stale dwell timer ignored");
        return None;
    }
    robot.target = Some(home);

    let debris = robot.carrying.clone()?;
    tracing::debug!(robot = %robot_id, debris = %debris, "Collection finished, returning");
    Some(SwarmEvent::CollectionFinished {
        robot: robot_id.clone(),
        debris,
    })
}

fn assign_nearest(robot: &mut Robot, debris: &mut [Debris]) -> Option<SwarmEvent> {
    let index = nearest_available_index(robot.position, debris)?;
    let piece = claim_in(debris, index)?;

    robot.advance_status();
    robot.target = Some(piece.position);
    robot.carrying = Some(piece.id.clone());
    robot.path = vec![robot.position];

    tracing::debug!(robot = %robot.id, debris = %piece.id, "Debris claimed");
    Some(SwarmEvent::DebrisClaimed {
        robot: robot.id.clone(),
        debris: piece.id.clone(),
    })
}

fn travel(
    robot: &mut Robot,
    destination: Vec2Fixed,
    params: &TickParams,
    stats: &mut MissionStats,
    events: &mut Vec<SwarmEvent>,
) {
    let previous = robot.position;
    robot.position = move_towards(previous, destination, params.speed);
    robot.path.push(robot.position);
    stats.record_distance(previous.distance(robot.position));

    if robot.battery.drain(params.battery_drain) {
        tracing::warn!(robot = %robot.id, "Battery depleted");
        events.push(SwarmEvent::BatteryDepleted {
            robot: robot.id.clone(),
        });
    }
}

fn complete_return(
    robot: &mut Robot,
    debris: &[Debris],
    stats: &mut MissionStats,
) -> Option<SwarmEvent> {
    robot.advance_status();
    robot.target = None;
    robot.path.clear();
    robot.battery.recharge();

    let debris_id = robot.carrying.take()?;
    let material = debris.iter().find(|d| d.id == debris_id).map(|piece| {
        stats.record_delivery(&robot.id, piece.material, piece.size);
        piece.material.label()
    });

    tracing::debug!(
        robot = %robot.id,
        debris = %debris_id,
        material = material.unwrap_or("unknown"),
        "Returned home"
    );
    Some(SwarmEvent::ReturnedHome {
        robot: robot.id.clone(),
        debris: debris_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Battery, Material};

    fn pos(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::from_int(x, y)
    }

    fn registry(robots: &[&str], debris: &[(&str, i32, i32)]) -> EntityRegistry {
        let debris = debris
            .iter()
            .map(|(id, x, y)| Debris::new(*id, pos(*x, *y), Material::Aluminum, Fixed::ONE))
            .collect();
        EntityRegistry::with_robot_ids(Vec2Fixed::ZERO, robots.iter().copied(), debris).unwrap()
    }

    #[test]
    fn test_move_towards_steps_by_speed() {
        let next = move_towards(pos(0, 0), pos(10, 0), Fixed::from_num(1.5));
        assert_eq!(next, Vec2Fixed::new(Fixed::from_num(1.5), Fixed::ZERO));
    }

    #[test]
    fn test_move_towards_snaps_within_one_step() {
        let target = pos(1, 1);
        assert_eq!(move_towards(pos(0, 0), target, Fixed::from_num(2)), target);
        assert_eq!(move_towards(target, target, Fixed::from_num(2)), target);
    }

    #[test]
    fn test_move_towards_exact_step_lands_on_target() {
        let target = pos(3, 4);
        assert_eq!(move_towards(pos(0, 0), target, Fixed::from_num(5)), target);
    }

    #[test]
    fn test_move_towards_step_stays_within_speed() {
        let speed = Fixed::from_num(1.5);
        let limit = speed * speed;
        let thirds = Fixed::ONE / Fixed::from_num(3);
        let origin = Vec2Fixed::ZERO;

        for i in 0..300 {
            for j in 0..300 {
                let target = Vec2Fixed::new(
                    thirds * Fixed::from_num(i),
                    thirds * Fixed::from_num(j),
                );
                let next = move_towards(origin, target, speed);
                assert!(
                    origin.distance_squared(next) <= limit,
                    "step toward {target:?} overshot speed: {next:?}"
                );
            }
        }
    }

    #[test]
    fn test_move_towards_heads_in_every_direction() {
        let centre = pos(50, 50);
        let speed = Fixed::from_num(2);
        for target in [pos(60, 50), pos(40, 50), pos(50, 60), pos(50, 40), pos(43, 57)] {
            let next = move_towards(centre, target, speed);
            assert!(next.distance(target) < centre.distance(target));
            assert!(centre.distance_squared(next) <= speed * speed);
        }
    }

    #[test]
    fn test_is_within_large_threshold() {
        let far = Fixed::from_num(50_000);
        assert!(is_within(pos(0, 0), pos(100, 100), far));
        assert!(!is_within(pos(0, 0), pos(1, 0), Fixed::from_num(0.5)));
    }

    #[test]
    fn test_idle_robot_claims_nearest_without_moving() {
        let mut registry = registry(&["r1"], &[("far", 50, 50), ("near", 5, 5)]);
        let mut scheduler = Scheduler::default();
        let mut stats = MissionStats::default();

        let events = robot_system(&mut registry, &mut scheduler, &TickParams::default(), &mut stats);

        let robot = &registry.robots()[0];
        assert_eq!(robot.status, RobotStatus::MovingToTarget);
        assert_eq!(robot.target, Some(pos(5, 5)));
        assert_eq!(robot.carrying, Some(DebrisId::new("near")));
        assert_eq!(robot.position, Vec2Fixed::ZERO);
        assert_eq!(robot.path, vec![Vec2Fixed::ZERO]);
        assert!(registry.debris_by_id("near").unwrap().collected);
        assert!(!registry.debris_by_id("far").unwrap().collected);
        assert_eq!(stats.claimed_count, 1);
        assert!(matches!(events[0], SwarmEvent::DebrisClaimed { .. }));
    }

    #[test]
    fn test_claims_in_same_tick_are_distinct() {
        let mut registry = registry(&["r1", "r2"], &[("a", 3, 0), ("b", 30, 0)]);
        let mut scheduler = Scheduler::default();
        let mut stats = MissionStats::default();

        robot_system(&mut registry, &mut scheduler, &TickParams::default(), &mut stats);

        let carried: Vec<_> = registry
            .robots()
            .iter()
            .map(|r| r.carrying.clone().unwrap())
            .collect();
        assert_eq!(carried, vec![DebrisId::new("a"), DebrisId::new("b")]);
    }

    #[test]
    fn test_idle_robot_stays_idle_without_targets() {
        let mut registry = registry(&["r1"], &[]);
        let mut scheduler = Scheduler::default();
        let mut stats = MissionStats::default();

        let events = robot_system(&mut registry, &mut scheduler, &TickParams::default(), &mut stats);
        assert!(events.is_empty());
        assert_eq!(registry.robots()[0].status, RobotStatus::Idle);
    }

    #[test]
    fn test_arrival_arms_dwell_timer() {
        let mut registry = registry(&["r1"], &[("a", 1, 0)]);
        let mut scheduler = Scheduler::default();
        let mut stats = MissionStats::default();
        let params = TickParams::default();

        robot_system(&mut registry, &mut scheduler, &params, &mut stats);
        let events = robot_system(&mut registry, &mut scheduler, &params, &mut stats);

        assert_eq!(registry.robots()[0].status, RobotStatus::Collecting);
        assert!(scheduler.has_pending(&TimerKind::DwellComplete(RobotId::new("r1"))));
        assert!(matches!(events[0], SwarmEvent::ArrivedAtDebris { .. }));
    }

    #[test]
    fn test_finish_dwell_ignores_non_collecting_robot() {
        let mut registry = registry(&["r1"], &[]);
        assert!(finish_dwell(&mut registry, &RobotId::new("r1")).is_none());
        assert!(finish_dwell(&mut registry, &RobotId::new("ghost")).is_none());
        assert_eq!(registry.robots()[0].status, RobotStatus::Idle);
    }

    #[test]
    fn test_finish_dwell_sends_collecting_robot_home() {
        let mut registry = registry(&["r1"], &[("a", 1, 0)]);
        let mut scheduler = Scheduler::default();
        let mut stats = MissionStats::default();
        let params = TickParams::default();
        robot_system(&mut registry, &mut scheduler, &params, &mut stats);
        robot_system(&mut registry, &mut scheduler, &params, &mut stats);

        let event = finish_dwell(&mut registry, &RobotId::new("r1"));
        assert!(matches!(event, Some(SwarmEvent::CollectionFinished { .. })));
        let robot = &registry.robots()[0];
        assert_eq!(robot.status, RobotStatus::Returning);
        assert_eq!(robot.target, Some(registry.home()));

        // A second firing would skip the cycle and is ignored.
        assert!(finish_dwell(&mut registry, &RobotId::new("r1")).is_none());
        assert_eq!(registry.robots()[0].status, RobotStatus::Returning);
    }

    #[test]
    fn test_battery_depletion_reported_once() {
        let mut registry = registry(&["r1"], &[("a", 90, 90)]);
        let mut scheduler = Scheduler::default();
        let mut stats = MissionStats::default();
        let params = TickParams {
            battery_drain: Fixed::from_num(40),
            ..TickParams::default()
        };

        let mut depleted = 0;
        for _ in 0..6 {
            let events = robot_system(&mut registry, &mut scheduler, &params, &mut stats);
            depleted += events
                .iter()
                .filter(|e| matches!(e, SwarmEvent::BatteryDepleted { .. }))
                .count();
        }

        assert_eq!(depleted, 1);
        assert_eq!(registry.robots()[0].battery, Battery::EMPTY);
        // An empty battery does not ground the robot
        assert_eq!(registry.robots()[0].status, RobotStatus::MovingToTarget);
    }
}
