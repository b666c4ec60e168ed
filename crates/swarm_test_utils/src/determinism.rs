//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the swarm simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Two runs of the same mission must end in the same state, bit for bit.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: robot movement uses
//!   [`swarm_core::math::Fixed`] throughout; floats only appear in
//!   mission files and are converted once.
//!
//! - **Wall-clock timers**: the collecting dwell runs on the scheduler's
//!   simulated clock, never on real time.
//!
//! - **Iteration order**: robots are processed in registry order and
//!   telemetry maps are `BTreeMap`s.
//!
//! - **System randomness**: debris fields come from a seeded `ChaCha8Rng`.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual systems (movement, claiming, dwell)
//! 2. **Property tests**: random layouts must still replay exactly
//! 3. **Integration tests**: full missions are reproducible
//! 4. **Parallel tests**: N simulations on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use swarm_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            panic!(
                "Swarm simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                self.unique_hashes().len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use swarm_test_utils::determinism::verify_determinism;
/// use swarm_test_utils::fixtures::running_default_mission;
///
/// let result = verify_determinism(
///     3,   // Run 3 times
///     200, // 200 ticks each
///     running_default_mission,
///     |sim| { sim.tick(); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Simplified determinism verification for [`Simulation`].
///
/// Runs the simulation twice with identical setup and verifies the final
/// state hashes match exactly. The setup is responsible for calling
/// `start()`; a stopped simulation trivially matches itself.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        |sim| sim.state_hash(),
    );
    result.is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// variations or different memory layouts.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a save/restore round trip preserves simulation state exactly,
/// and that the restored copy keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();

    for _ in 0..num_ticks {
        sim.tick();
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };

    if sim.state_hash() != restored.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.tick();
        restored.tick();
    }
    sim.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for swarm testing.
///
/// Everything stays on the 0-100 mission plane so generated layouts
/// always pass registry validation.
pub mod strategies {
    use proptest::prelude::*;
    use swarm_core::components::{Debris, Material};
    use swarm_core::math::{Fixed, Vec2Fixed};

    /// A plane coordinate in whole hundredths, 0.00 to 100.00.
    pub fn arb_plane_coord() -> impl Strategy<Value = Fixed> {
        (0i32..=10_000).prop_map(|h| Fixed::from_num(h) / Fixed::from_num(100))
    }

    /// A point on the mission plane.
    pub fn arb_plane_point() -> impl Strategy<Value = Vec2Fixed> {
        (arb_plane_coord(), arb_plane_coord()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// A robot speed between 0.25 and 10 plane units per tick.
    pub fn arb_speed() -> impl Strategy<Value = Fixed> {
        (25i32..=1_000).prop_map(|h| Fixed::from_num(h) / Fixed::from_num(100))
    }

    /// Any debris material.
    pub fn arb_material() -> impl Strategy<Value = Material> {
        prop::sample::select(Material::ALL.to_vec())
    }

    /// An uncollected debris field with unique IDs `DB-000`, `DB-001`, ...
    pub fn arb_debris_field(max_len: usize) -> impl Strategy<Value = Vec<Debris>> {
        proptest::collection::vec((arb_plane_point(), arb_material()), 0..max_len).prop_map(
            |pieces| {
                pieces
                    .into_iter()
                    .enumerate()
                    .map(|(i, (position, material))| {
                        Debris::new(format!("DB-{i:03}"), position, material, Fixed::ONE)
                    })
                    .collect()
            },
        )
    }

    /// A debris field where a random subset is already collected.
    pub fn arb_partly_collected_field(max_len: usize) -> impl Strategy<Value = Vec<Debris>> {
        arb_debris_field(max_len).prop_flat_map(|field| {
            let len = field.len();
            (Just(field), proptest::collection::vec(any::<bool>(), len)).prop_map(
                |(mut field, flags)| {
                    for (piece, collected) in field.iter_mut().zip(flags) {
                        piece.collected = collected;
                    }
                    field
                },
            )
        })
    }
}
