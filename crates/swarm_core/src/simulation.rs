//! Core simulation loop.
//!
//! The simulation runs at a fixed tick interval and advances every robot
//! through its collection cycle deterministically. This module owns the
//! tick-loop lifecycle (`start`/`stop`/`reset`), delivers snapshots to
//! observers and exposes a pure [`step`] for callers that want to drive
//! state transitions themselves.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - No wall clock: one-shot timers run on the scheduler's simulated clock
//! - Consistent iteration order (registry order)
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use swarm_core::components::{Debris, Material, RobotStatus};
//! use swarm_core::config::TickParams;
//! use swarm_core::math::{Fixed, Vec2Fixed};
//! use swarm_core::registry::EntityRegistry;
//! use swarm_core::simulation::Simulation;
//!
//! let registry = EntityRegistry::with_robot_ids(
//!     Vec2Fixed::ZERO,
//!     ["SR-01"],
//!     vec![Debris::new("DB-001", Vec2Fixed::from_int(10, 10), Material::Titanium, Fixed::ONE)],
//! )
//! .unwrap();
//!
//! let mut sim = Simulation::new(registry, TickParams::default());
//! sim.start();
//! sim.tick();
//!
//! assert_eq!(sim.robots()[0].status, RobotStatus::MovingToTarget);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{Debris, Robot, RobotStatus};
use crate::config::TickParams;
use crate::error::{Result, SwarmError};
use crate::math::Vec2Fixed;
use crate::mission::MissionFile;
use crate::registry::EntityRegistry;
use crate::scheduler::{LoopState, Scheduler, TimerKind};
use crate::stats::MissionStats;
use crate::systems::{finish_dwell, robot_system, SwarmEvent};

/// Everything that changes from tick to tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmState {
    /// Ticks executed since the last reset.
    pub tick: u64,
    /// Robots, debris and the mother station.
    pub registry: EntityRegistry,
    /// Loop lifecycle, simulated clock and pending timers.
    pub scheduler: Scheduler,
    /// Mission telemetry, including the collected counter.
    pub stats: MissionStats,
}

impl SwarmState {
    /// Fresh state at tick zero with the loop stopped.
    #[must_use]
    pub fn new(registry: EntityRegistry, tick_interval_ms: u32) -> Self {
        Self {
            tick: 0,
            registry,
            scheduler: Scheduler::new(tick_interval_ms),
            stats: MissionStats::default(),
        }
    }

    /// Debris delivered home so far.
    #[must_use]
    pub const fn collected_count(&self) -> u32 {
        self.stats.collected_count
    }

    /// Whether every piece is claimed and every robot is back idle.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.registry.available_count() == 0
            && self.registry.count_in_status(RobotStatus::Idle) == self.registry.robots().len()
    }

    /// Capture the full state for observers and renderers.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            elapsed_ms: self.scheduler.elapsed_ms(),
            running: self.scheduler.is_running(),
            home: self.registry.home(),
            robots: self.registry.robots().to_vec(),
            debris: self.registry.debris().to_vec(),
            collected_count: self.stats.collected_count,
            stats: self.stats.clone(),
        }
    }

    /// Compute a hash of the current state for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.scheduler.elapsed_ms().hash(&mut hasher);
        self.scheduler.state().hash(&mut hasher);

        for timer in self.scheduler.pending() {
            timer.due_ms.hash(&mut hasher);
            timer.kind.hash(&mut hasher);
        }

        self.registry.robots().len().hash(&mut hasher);
        for robot in self.registry.robots() {
            robot.id.hash(&mut hasher);
            robot.position.hash(&mut hasher);
            robot.target.hash(&mut hasher);
            robot.status.hash(&mut hasher);
            robot.battery.hash(&mut hasher);
            robot.carrying.hash(&mut hasher);
            robot.path.len().hash(&mut hasher);
        }

        self.registry.debris().len().hash(&mut hasher);
        for piece in self.registry.debris() {
            piece.id.hash(&mut hasher);
            piece.collected.hash(&mut hasher);
        }

        self.stats.collected_count.hash(&mut hasher);
        self.stats.claimed_count.hash(&mut hasher);

        hasher.finish()
    }
}

/// Full state handed to observers once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick number after the step.
    pub tick: u64,
    /// Simulated milliseconds since reset.
    pub elapsed_ms: u64,
    /// Whether the loop is scheduled.
    pub running: bool,
    /// Mother-station position.
    pub home: Vec2Fixed,
    /// Every robot.
    pub robots: Vec<Robot>,
    /// Every debris piece.
    pub debris: Vec<Debris>,
    /// Debris delivered home.
    pub collected_count: u32,
    /// Mission telemetry.
    pub stats: MissionStats,
}

/// Result of a pure [`step`].
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The state after the step.
    pub state: SwarmState,
    /// Events generated during the step.
    pub events: Vec<SwarmEvent>,
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick number after the step (unchanged if the loop is stopped).
    pub tick: u64,
    /// Everything that happened, in processing order.
    pub events: Vec<SwarmEvent>,
}

impl TickEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of claims made this tick.
    #[must_use]
    pub fn claims(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SwarmEvent::DebrisClaimed { .. }))
            .count()
    }

    /// Number of deliveries completed this tick.
    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SwarmEvent::ReturnedHome { .. }))
            .count()
    }
}

/// Receives a snapshot after every executed tick.
pub trait TickObserver: Send {
    /// Called once per tick with the post-tick state.
    fn on_tick(&mut self, snapshot: &Snapshot, events: &[SwarmEvent]);
}

impl<F> TickObserver for F
where
    F: FnMut(&Snapshot, &[SwarmEvent]) + Send,
{
    fn on_tick(&mut self, snapshot: &Snapshot, events: &[SwarmEvent]) {
        self(snapshot, events);
    }
}

/// Advance a state by one tick without touching the input.
///
/// The loop state is not consulted: a pure step always advances.
#[must_use]
pub fn step(state: &SwarmState, params: &TickParams, dt_ms: u32) -> StepOutcome {
    let mut next = state.clone();
    let events = advance_state(&mut next, params, dt_ms);
    StepOutcome {
        state: next,
        events,
    }
}

/// Advance a state in place by one tick.
///
/// Order: move the clock, fire due timers, then run every robot.
pub fn advance_state(state: &mut SwarmState, params: &TickParams, dt_ms: u32) -> Vec<SwarmEvent> {
    let mut events = Vec::new();

    state.scheduler.advance(dt_ms);
    for timer in state.scheduler.take_due() {
        match timer {
            TimerKind::DwellComplete(robot_id) => {
                if let Some(event) = finish_dwell(&mut state.registry, &robot_id) {
                    events.push(event);
                }
            }
        }
    }

    events.extend(robot_system(
        &mut state.registry,
        &mut state.scheduler,
        params,
        &mut state.stats,
    ));

    state.tick += 1;
    events
}

/// The swarm simulation.
///
/// Owns the initial layout (for reset), the live state and the tick
/// observers.
pub struct Simulation {
    params: TickParams,
    initial: EntityRegistry,
    state: SwarmState,
    observers: Vec<Box<dyn TickObserver>>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("params", &self.params)
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SavedSimulationRef<'a> {
    params: &'a TickParams,
    initial: &'a EntityRegistry,
    state: &'a SwarmState,
}

#[derive(Deserialize)]
struct SavedSimulation {
    params: TickParams,
    initial: EntityRegistry,
    state: SwarmState,
}

impl Simulation {
    /// Create a stopped simulation at tick zero.
    #[must_use]
    pub fn new(registry: EntityRegistry, params: TickParams) -> Self {
        let state = SwarmState::new(registry.clone(), params.tick_interval_ms);
        Self {
            params,
            initial: registry,
            state,
            observers: Vec::new(),
        }
    }

    /// Build a simulation from a mission description.
    pub fn from_mission(mission: &MissionFile) -> Result<Self> {
        let (params, registry) = mission.build()?;
        tracing::info!(
            mission = %mission.name,
            robots = registry.robots().len(),
            debris = registry.debris().len(),
            "Mission loaded"
        );
        Ok(Self::new(registry, params))
    }

    /// Tick parameters.
    #[must_use]
    pub const fn params(&self) -> &TickParams {
        &self.params
    }

    /// Live state.
    #[must_use]
    pub const fn state(&self) -> &SwarmState {
        &self.state
    }

    /// Current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.state.tick
    }

    /// Simulated milliseconds since the last reset.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.state.scheduler.elapsed_ms()
    }

    /// All robots.
    #[must_use]
    pub fn robots(&self) -> &[Robot] {
        self.state.registry.robots()
    }

    /// All debris.
    #[must_use]
    pub fn debris(&self) -> &[Debris] {
        self.state.registry.debris()
    }

    /// Mother-station position.
    #[must_use]
    pub const fn home(&self) -> Vec2Fixed {
        self.state.registry.home()
    }

    /// Debris delivered home.
    #[must_use]
    pub const fn collected_count(&self) -> u32 {
        self.state.collected_count()
    }

    /// Mission telemetry.
    #[must_use]
    pub const fn stats(&self) -> &MissionStats {
        &self.state.stats
    }

    /// Whether the tick loop is scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.scheduler.is_running()
    }

    /// Whether all debris has been brought home.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Register an observer for per-tick snapshots.
    pub fn subscribe<O>(&mut self, observer: O)
    where
        O: TickObserver + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Schedule the tick loop.
    ///
    /// Robots left mid-dwell by an earlier [`stop`](Self::stop) get a full
    /// dwell re-armed from the current time. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if !self.state.scheduler.start() {
            return false;
        }

        for robot in self.state.registry.robots() {
            let kind = TimerKind::DwellComplete(robot.id.clone());
            if robot.status == RobotStatus::Collecting && !self.state.scheduler.has_pending(&kind) {
                self.state.scheduler.schedule_after(self.params.dwell_ms, kind);
            }
        }

        tracing::info!(
            tick = self.state.tick,
            interval_ms = self.params.tick_interval_ms,
            "Simulation started"
        );
        true
    }

    /// Halt the tick loop and cancel pending timers.
    pub fn stop(&mut self) {
        let cancelled = self.state.scheduler.stop();
        tracing::info!(tick = self.state.tick, cancelled, "Simulation stopped");
    }

    /// Restore the initial layout, zero the counters and halt the loop.
    pub fn reset(&mut self) {
        self.state.scheduler.reset();
        self.state.registry = self.initial.clone();
        self.state.stats = MissionStats::default();
        self.state.tick = 0;
        tracing::info!("Simulation reset");
    }

    /// Advance the simulation by one tick interval.
    ///
    /// Does nothing while the loop is stopped.
    pub fn tick(&mut self) -> TickEvents {
        if self.state.scheduler.state() == LoopState::Stopped {
            tracing::trace!(tick = self.state.tick, "Tick skipped, simulation stopped");
            return TickEvents {
                tick: self.state.tick,
                events: Vec::new(),
            };
        }

        let events = advance_state(&mut self.state, &self.params, self.params.tick_interval_ms);

        #[cfg(debug_assertions)]
        {
            let hash = self.state.state_hash();
            tracing::debug!(tick = self.state.tick, state_hash = hash, "Simulation state hash");
        }

        #[cfg(feature = "debug-validation")]
        if let Err(err) = self.state.registry.check_invariants() {
            panic!("Swarm invariant violated at tick {}: {err}", self.state.tick);
        }

        if !self.observers.is_empty() {
            let snapshot = self.state.snapshot();
            for observer in &mut self.observers {
                observer.on_tick(&snapshot, &events);
            }
        }

        TickEvents {
            tick: self.state.tick,
            events,
        }
    }

    /// Tick until the mission completes or `max_ticks` have run.
    ///
    /// Starts the loop if needed. Returns the number of ticks executed.
    pub fn run_until_complete(&mut self, max_ticks: u64) -> u64 {
        self.start();
        let mut executed = 0;
        while executed < max_ticks && !self.is_complete() {
            self.tick();
            executed += 1;
        }
        executed
    }

    /// Capture the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Compute a hash of the current state for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.state.state_hash()
    }

    /// Serialize the simulation for save/restore.
    ///
    /// Observers are not saved.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let saved = SavedSimulationRef {
            params: &self.params,
            initial: &self.initial,
            state: &self.state,
        };
        bincode::serialize(&saved)
            .map_err(|e| SwarmError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Restore a simulation from bytes produced by [`serialize`](Self::serialize).
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let saved: SavedSimulation = bincode::deserialize(data).map_err(|e| {
            SwarmError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })?;
        saved.state.registry.check_invariants()?;
        Ok(Self {
            params: saved.params,
            initial: saved.initial,
            state: saved.state,
            observers: Vec::new(),
        })
    }
}
