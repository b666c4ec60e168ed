//! Test fixtures and helpers.
//!
//! Pre-built registries and missions for consistent testing.

use fixed::types::I32F32;
use swarm_core::components::{Debris, Material};
use swarm_core::config::TickParams;
use swarm_core::math::Vec2Fixed;
use swarm_core::mission::MissionFile;
use swarm_core::placement::FieldConfig;
use swarm_core::registry::EntityRegistry;
use swarm_core::simulation::Simulation;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a plane point from integer coordinates.
#[must_use]
pub fn point(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_int(x, y)
}

/// A unit-size aluminum piece at integer coordinates.
#[must_use]
pub fn debris_at(id: &str, x: i32, y: i32) -> Debris {
    Debris::new(id, point(x, y), Material::Aluminum, fixed(1))
}

/// One robot at (0, 0) and one piece at (10, 10).
///
/// The classic round trip: with the default speed of 1.5 the robot needs
/// 10 moves each way.
#[must_use]
pub fn single_robot_registry() -> EntityRegistry {
    EntityRegistry::with_robot_ids(Vec2Fixed::ZERO, ["SR-01"], vec![debris_at("DB-001", 10, 10)])
        .expect("fixture registry is valid")
}

/// Two robots at (0, 0) and two pieces.
#[must_use]
pub fn two_robot_registry() -> EntityRegistry {
    EntityRegistry::with_robot_ids(
        Vec2Fixed::ZERO,
        ["SR-01", "SR-02"],
        vec![debris_at("DB-001", 10, 0), debris_at("DB-002", 0, 20)],
    )
    .expect("fixture registry is valid")
}

/// A stopped simulation over [`single_robot_registry`] with default params.
#[must_use]
pub fn single_robot_simulation() -> Simulation {
    Simulation::new(single_robot_registry(), TickParams::default())
}

/// The built-in mission, already started.
#[must_use]
pub fn running_default_mission() -> Simulation {
    let mut sim = Simulation::from_mission(&MissionFile::default_mission())
        .expect("default mission is valid");
    sim.start();
    sim
}

/// A started mission with `robots` robots and a seeded field of `count` pieces.
#[must_use]
pub fn running_field_mission(seed: u64, robots: usize, count: u32) -> Simulation {
    let mut mission = MissionFile::default_mission();
    mission.debris.clear();
    mission.robots = (1..=robots).map(|i| format!("SR-{i:02}")).collect();
    mission.field = Some(FieldConfig::default().with_seed(seed).with_count(count));

    let mut sim = Simulation::from_mission(&mission).expect("field mission is valid");
    sim.start();
    sim
}
