//! Tick-loop lifecycle and one-shot timers on a simulated clock.
//!
//! Nothing here reads the wall clock. The clock only moves when a tick
//! advances it, so tests can step time exactly and a real-time driver
//! can pace ticks however it likes.

use serde::{Deserialize, Serialize};

use crate::components::RobotId;

/// Default tick interval in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 50;

/// Whether the tick loop is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoopState {
    /// No ticks are delivered.
    #[default]
    Stopped,
    /// Ticks are delivered every interval.
    Running,
}

/// What a one-shot timer does when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// A robot has finished its collecting dwell.
    DwellComplete(RobotId),
}

/// A pending one-shot timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OneShotTimer {
    /// Simulated time at which the timer fires.
    pub due_ms: u64,
    /// Insertion sequence, breaks ties between equal due times.
    pub seq: u64,
    /// Action to run.
    pub kind: TimerKind,
}

/// Owned scheduler handle for one simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheduler {
    interval_ms: u32,
    elapsed_ms: u64,
    state: LoopState,
    timers: Vec<OneShotTimer>,
    next_seq: u64,
}

impl Scheduler {
    /// Create a stopped scheduler at time zero.
    #[must_use]
    pub fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            elapsed_ms: 0,
            state: LoopState::Stopped,
            timers: Vec::new(),
            next_seq: 0,
        }
    }

    /// Tick interval in milliseconds.
    #[must_use]
    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Simulated time elapsed since the last reset.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Current loop state.
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Whether ticks are being delivered.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Schedule the tick loop. Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        let was_stopped = !self.is_running();
        self.state = LoopState::Running;
        was_stopped
    }

    /// Halt the tick loop and cancel every pending timer.
    ///
    /// Returns the number of timers cancelled.
    pub fn stop(&mut self) -> usize {
        self.state = LoopState::Stopped;
        let cancelled = self.timers.len();
        self.timers.clear();
        cancelled
    }

    /// Stop, cancel all timers and rewind the clock to zero.
    pub fn reset(&mut self) {
        self.stop();
        self.elapsed_ms = 0;
        self.next_seq = 0;
    }

    /// Move the clock forward. Returns the new time.
    pub fn advance(&mut self, dt_ms: u32) -> u64 {
        self.elapsed_ms += u64::from(dt_ms);
        self.elapsed_ms
    }

    /// Arm a one-shot timer `delay_ms` after the current time.
    pub fn schedule_after(&mut self, delay_ms: u32, kind: TimerKind) {
        let timer = OneShotTimer {
            due_ms: self.elapsed_ms + u64::from(delay_ms),
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        self.timers.push(timer);
    }

    /// Remove and return every timer due at or before the current time,
    /// earliest first.
    pub fn take_due(&mut self) -> Vec<TimerKind> {
        let now = self.elapsed_ms;
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|t| t.due_ms <= now);
        self.timers = pending;
        due.sort_by_key(|t| (t.due_ms, t.seq));
        due.into_iter().map(|t| t.kind).collect()
    }

    /// Timers that have not fired yet, in insertion order.
    #[must_use]
    pub fn pending(&self) -> &[OneShotTimer] {
        &self.timers
    }

    /// Whether a timer of this kind is already armed.
    #[must_use]
    pub fn has_pending(&self, kind: &TimerKind) -> bool {
        self.timers.iter().any(|t| &t.kind == kind)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dwell(id: &str) -> TimerKind {
        TimerKind::DwellComplete(RobotId::new(id))
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let mut scheduler = Scheduler::default();
        assert!(!scheduler.is_running());
        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());

        scheduler.schedule_after(100, dwell("a"));
        assert_eq!(scheduler.stop(), 1);
        assert!(!scheduler.is_running());
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_timers_fire_when_clock_reaches_due_time() {
        let mut scheduler = Scheduler::new(50);
        scheduler.schedule_after(100, dwell("a"));

        scheduler.advance(50);
        assert!(scheduler.take_due().is_empty());

        scheduler.advance(50);
        assert_eq!(scheduler.take_due(), vec![dwell("a")]);
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_due_timers_come_out_in_order() {
        let mut scheduler = Scheduler::new(50);
        scheduler.schedule_after(80, dwell("late"));
        scheduler.schedule_after(20, dwell("early"));
        scheduler.schedule_after(20, dwell("early-second"));
        scheduler.schedule_after(500, dwell("pending"));

        scheduler.advance(100);
        assert_eq!(
            scheduler.take_due(),
            vec![dwell("early"), dwell("early-second"), dwell("late")]
        );
        assert!(scheduler.has_pending(&dwell("pending")));
    }

    #[test]
    fn test_reset_rewinds_clock() {
        let mut scheduler = Scheduler::new(50);
        scheduler.start();
        scheduler.advance(250);
        scheduler.schedule_after(10, dwell("a"));

        scheduler.reset();
        assert_eq!(scheduler.elapsed_ms(), 0);
        assert!(!scheduler.is_running());
        assert!(scheduler.pending().is_empty());
    }
}
