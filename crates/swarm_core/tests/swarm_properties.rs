//! Property tests for the swarm stepper.
//!
//! These exercise target selection, movement stepping, claiming and the
//! battery through the public API only.

use std::collections::HashSet;

use proptest::prelude::*;
use swarm_core::components::{Debris, RobotStatus};
use swarm_core::config::TickParams;
use swarm_core::math::{Fixed, Vec2Fixed};
use swarm_core::registry::EntityRegistry;
use swarm_core::selector::{nearest_available, nearest_available_index};
use swarm_core::simulation::{step, SwarmState};
use swarm_core::systems::{move_towards, SwarmEvent};
use swarm_test_utils::determinism::strategies::{
    arb_debris_field, arb_partly_collected_field, arb_plane_point, arb_speed,
};

fn swarm_state(home: Vec2Fixed, robots: usize, field: Vec<Debris>) -> SwarmState {
    let ids: Vec<String> = (0..robots).map(|i| format!("SR-{i:02}")).collect();
    let registry =
        EntityRegistry::with_robot_ids(home, ids, field).expect("generated layout is valid");
    SwarmState::new(registry, TickParams::default().tick_interval_ms)
}

proptest! {
    #[test]
    fn prop_selected_target_is_nearest_uncollected(
        from in arb_plane_point(),
        field in arb_partly_collected_field(16),
    ) {
        let best = field
            .iter()
            .filter(|d| !d.collected)
            .map(|d| d.position.distance_squared(from))
            .min();

        match (nearest_available(from, &field), best) {
            (Some(chosen), Some(best)) => {
                prop_assert!(!chosen.collected);
                prop_assert_eq!(chosen.position.distance_squared(from), best);
                // First minimum in registry order.
                let index = nearest_available_index(from, &field).unwrap();
                prop_assert!(field[..index]
                    .iter()
                    .filter(|d| !d.collected)
                    .all(|d| d.position.distance_squared(from) > best));
            }
            (None, None) => {}
            (chosen, best) => prop_assert!(false, "selector {:?} vs brute force {:?}", chosen, best),
        }
    }

    #[test]
    fn prop_move_never_exceeds_speed_or_overshoots(
        current in arb_plane_point(),
        target in arb_plane_point(),
        speed in arb_speed(),
    ) {
        let before = current.distance(target);
        let next = move_towards(current, target, speed);

        prop_assert!(current.distance_squared(next) <= speed * speed);
        prop_assert!(next.distance(target) <= before);
        if before <= speed {
            prop_assert_eq!(next, target);
        } else {
            prop_assert!(next != target);
        }
    }

    #[test]
    fn prop_repeated_steps_reach_target_exactly(
        current in arb_plane_point(),
        target in arb_plane_point(),
        speed in arb_speed(),
    ) {
        let mut position = current;
        let mut steps = 0u32;
        while position != target {
            position = move_towards(position, target, speed);
            steps += 1;
            prop_assert!(steps <= 1_000, "never arrived");
        }

        let ideal: f64 = (current.distance(target) / speed).to_num();
        prop_assert!(f64::from(steps) <= ideal.ceil() + 1.0);
    }

    #[test]
    fn prop_claims_are_idempotent(field in arb_debris_field(12), index in 0usize..12) {
        let mut registry = EntityRegistry::new(Vec2Fixed::ZERO, Vec::new(), field.clone())
            .expect("generated layout is valid");
        let first = registry.claim(index).map(|d| d.id.clone());
        prop_assert_eq!(first.is_some(), index < field.len());
        prop_assert!(registry.claim(index).is_none());
        let expected = field.len() - usize::from(first.is_some());
        prop_assert_eq!(registry.available_count(), expected);
    }

    #[test]
    fn prop_no_piece_is_claimed_twice(
        home in arb_plane_point(),
        field in arb_debris_field(10),
        robots in 1usize..5,
    ) {
        let params = TickParams::default().with_dwell_ms(100);
        let mut state = swarm_state(home, robots, field);
        let mut claimed = HashSet::new();

        for _ in 0..600 {
            let outcome = step(&state, &params, params.tick_interval_ms);
            for event in &outcome.events {
                if let SwarmEvent::DebrisClaimed { debris, .. } = event {
                    prop_assert!(claimed.insert(debris.clone()), "{} claimed twice", debris);
                }
            }
            prop_assert!(outcome.state.registry.check_invariants().is_ok());
            state = outcome.state;
        }
    }

    #[test]
    fn prop_battery_only_recharges_on_return(
        home in arb_plane_point(),
        field in arb_debris_field(6),
    ) {
        let params = TickParams::default().with_dwell_ms(100);
        let mut state = swarm_state(home, 2, field);

        for _ in 0..400 {
            let outcome = step(&state, &params, params.tick_interval_ms);
            for (before, after) in state.registry.robots().iter().zip(outcome.state.registry.robots()) {
                prop_assert!(after.battery.level() >= Fixed::ZERO);
                prop_assert!(after.battery.level() <= Fixed::from_num(100));
                if before.status == RobotStatus::Returning && after.status == RobotStatus::Idle {
                    prop_assert_eq!(after.battery.level(), Fixed::from_num(100));
                } else {
                    prop_assert!(after.battery.level() <= before.battery.level());
                }
            }
            state = outcome.state;
        }
    }

    #[test]
    fn prop_idle_robots_claim_distinct_targets(
        home in arb_plane_point(),
        field in arb_debris_field(8),
        robots in 1usize..8,
    ) {
        let pieces = field.len();
        let state = swarm_state(home, robots, field);
        let outcome = step(&state, &TickParams::default(), 50);

        let targets: HashSet<_> = outcome
            .state
            .registry
            .robots()
            .iter()
            .filter_map(|r| r.carrying.clone())
            .collect();
        prop_assert_eq!(targets.len(), robots.min(pieces));
        prop_assert_eq!(
            outcome.state.registry.count_in_status(RobotStatus::MovingToTarget),
            robots.min(pieces)
        );
        // Claiming ticks do not move anyone.
        prop_assert!(outcome.state.registry.robots().iter().all(|r| r.position == home));
    }
}
