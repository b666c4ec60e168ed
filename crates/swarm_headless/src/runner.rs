//! Headless mission runner implementation.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use swarm_core::mission::MissionFile;
use swarm_core::simulation::Simulation;
use tokio::time::MissedTickBehavior;

use crate::protocol::{Command, Response, RunSummary};

/// Tick limit for `run` when none is given.
pub const DEFAULT_MAX_TICKS: u64 = 100_000;

/// Options for a non-interactive run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after this many ticks even if debris remains.
    pub max_ticks: u64,
    /// Pace ticks at the mission's tick interval instead of running flat out.
    pub realtime: bool,
    /// Emit a state line after every tick.
    pub snapshots: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            realtime: false,
            snapshots: false,
        }
    }
}

/// Drives one simulation for the CLI.
#[derive(Debug)]
pub struct HeadlessRunner {
    sim: Simulation,
    mission: String,
}

impl HeadlessRunner {
    /// Wrap a simulation.
    pub fn new(sim: Simulation, mission: impl Into<String>) -> Self {
        Self {
            sim,
            mission: mission.into(),
        }
    }

    /// Build a runner for a mission.
    pub fn from_mission(mission: &MissionFile) -> swarm_core::error::Result<Self> {
        Ok(Self::new(Simulation::from_mission(mission)?, mission.name.clone()))
    }

    /// The wrapped simulation.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Apply one protocol command and produce its response.
    pub fn handle(&mut self, cmd: &Command) -> Response {
        match cmd {
            Command::Start => {
                self.sim.start();
                Response::ack(cmd.name())
            }
            Command::Stop => {
                self.sim.stop();
                Response::ack(cmd.name())
            }
            Command::Reset => {
                self.sim.reset();
                Response::ack(cmd.name())
            }
            Command::Tick { count } => {
                if !self.sim.is_running() {
                    return Response::error(
                        "Simulation is stopped; send start first",
                        Some(cmd.name()),
                    );
                }
                for _ in 0..*count {
                    self.sim.tick();
                }
                Response::state(&self.sim.snapshot())
            }
            Command::Query => Response::state(&self.sim.snapshot()),
            Command::Hash => Response::StateHash {
                tick: self.sim.get_tick(),
                hash: self.sim.state_hash(),
            },
            Command::Quit => Response::Bye,
        }
    }

    /// Serve the JSON-lines protocol until `quit` or end of input.
    pub fn run_interactive<R: BufRead, W: Write>(
        &mut self,
        input: R,
        output: &mut W,
    ) -> io::Result<()> {
        write_line(output, &Response::ready(self.sim.get_tick()))?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let cmd = match Command::from_json(line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    tracing::debug!(%line, "Rejected command");
                    write_line(output, &Response::error(format!("Parse error: {e}"), None))?;
                    continue;
                }
            };

            let response = self.handle(&cmd);
            write_line(output, &response)?;
            if cmd == Command::Quit {
                return Ok(());
            }
        }

        tracing::info!("Input closed, shutting down");
        write_line(output, &Response::Bye)
    }

    /// Start the mission and tick until it completes or hits the tick limit.
    ///
    /// Writes state lines when requested and always ends with a summary line.
    pub fn run<W: Write>(&mut self, options: &RunOptions, output: &mut W) -> io::Result<RunSummary> {
        let start_tick = self.sim.get_tick();
        self.sim.start();

        if options.realtime {
            self.run_paced(options, output)?;
        } else {
            while self.should_continue(start_tick, options) {
                self.step(options, output)?;
            }
        }

        let summary = self.summary(self.sim.get_tick() - start_tick);
        tracing::info!(
            ticks = summary.ticks,
            collected = summary.collected_count,
            complete = summary.complete,
            "Run finished"
        );
        write_line(output, &Response::Summary(summary.clone()))?;
        Ok(summary)
    }

    /// Totals for the current state.
    pub fn summary(&self, ticks: u64) -> RunSummary {
        RunSummary {
            mission: self.mission.clone(),
            ticks,
            collected_count: self.sim.collected_count(),
            total_debris: self.sim.debris().len(),
            complete: self.sim.is_complete(),
            distance_travelled: self.sim.stats().distance_travelled.to_num(),
            hash: self.sim.state_hash(),
        }
    }

    fn should_continue(&self, start_tick: u64, options: &RunOptions) -> bool {
        self.sim.get_tick() - start_tick < options.max_ticks && !self.sim.is_complete()
    }

    fn step<W: Write>(&mut self, options: &RunOptions, output: &mut W) -> io::Result<()> {
        self.sim.tick();
        if options.snapshots {
            write_line(output, &Response::state(&self.sim.snapshot()))?;
        }
        Ok(())
    }

    /// Tick on a tokio interval at the mission's period. Ticks never overlap.
    fn run_paced<W: Write>(&mut self, options: &RunOptions, output: &mut W) -> io::Result<()> {
        let start_tick = self.sim.get_tick();
        let period = Duration::from_millis(u64::from(self.sim.params().tick_interval_ms));
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        runtime.block_on(async {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            while self.should_continue(start_tick, options) {
                interval.tick().await;
                self.step(options, output)?;
            }
            Ok::<(), io::Error>(())
        })
    }
}

/// Run a mission `runs` times and collect the final state hashes.
pub fn verify_determinism(
    mission: &MissionFile,
    runs: u32,
    max_ticks: u64,
) -> swarm_core::error::Result<Vec<u64>> {
    let mut hashes = Vec::with_capacity(runs as usize);
    for run in 0..runs {
        let mut sim = Simulation::from_mission(mission)?;
        let ticks = sim.run_until_complete(max_ticks);
        tracing::debug!(run, ticks, hash = sim.state_hash(), "Verification run finished");
        hashes.push(sim.state_hash());
    }
    Ok(hashes)
}

fn write_line<W: Write>(output: &mut W, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MissionState;
    use swarm_core::config::SimConfig;

    fn runner() -> HeadlessRunner {
        HeadlessRunner::from_mission(&MissionFile::default_mission()).unwrap()
    }

    fn responses(output: &[u8]) -> Vec<Response> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn fast_mission() -> MissionFile {
        MissionFile {
            config: SimConfig {
                tick_interval_ms: 1,
                dwell_ms: 5,
                ..SimConfig::default()
            },
            ..MissionFile::default_mission()
        }
    }

    #[test]
    fn test_tick_requires_start() {
        let mut runner = runner();
        let response = runner.handle(&Command::Tick { count: 5 });
        assert!(matches!(response, Response::Error { .. }));
        assert_eq!(runner.simulation().get_tick(), 0);

        runner.handle(&Command::Start);
        match runner.handle(&Command::Tick { count: 5 }) {
            Response::State(MissionState { tick, running, .. }) => {
                assert_eq!(tick, 5);
                assert!(running);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_interactive_session() {
        let input = [
            r#"{"cmd":"start"}"#,
            "",
            r#"{"cmd":"tick","count":3}"#,
            "not json",
            r#"{"cmd":"hash"}"#,
            r#"{"cmd":"reset"}"#,
            r#"{"cmd":"query"}"#,
            r#"{"cmd":"quit"}"#,
            r#"{"cmd":"tick"}"#,
        ]
        .join("\n");

        let mut output = Vec::new();
        runner()
            .run_interactive(input.as_bytes(), &mut output)
            .unwrap();
        let lines = responses(&output);

        assert_eq!(lines.len(), 8);
        assert!(matches!(lines[0], Response::Ready { tick: 0, .. }));
        assert_eq!(lines[1], Response::ack("start"));
        assert!(matches!(&lines[2], Response::State(s) if s.tick == 3));
        assert!(matches!(&lines[3], Response::Error { cmd: None, .. }));
        assert!(matches!(lines[4], Response::StateHash { tick: 3, .. }));
        assert_eq!(lines[5], Response::ack("reset"));
        assert!(matches!(&lines[6], Response::State(s) if s.tick == 0 && !s.running));
        // Nothing after quit is processed.
        assert_eq!(lines[7], Response::Bye);
    }

    #[test]
    fn test_interactive_eof_says_bye() {
        let mut output = Vec::new();
        runner().run_interactive(&b""[..], &mut output).unwrap();
        let lines = responses(&output);
        assert_eq!(lines.last(), Some(&Response::Bye));
    }

    #[test]
    fn test_run_until_complete() {
        let mut output = Vec::new();
        let summary = runner().run(&RunOptions::default(), &mut output).unwrap();

        assert!(summary.complete);
        assert_eq!(summary.collected_count, 8);
        assert_eq!(summary.total_debris, 8);
        assert_eq!(responses(&output), vec![Response::Summary(summary)]);
    }

    #[test]
    fn test_run_respects_tick_limit_and_snapshots() {
        let options = RunOptions {
            max_ticks: 10,
            snapshots: true,
            ..RunOptions::default()
        };
        let mut output = Vec::new();
        let summary = runner().run(&options, &mut output).unwrap();

        assert_eq!(summary.ticks, 10);
        assert!(!summary.complete);
        let lines = responses(&output);
        assert_eq!(lines.len(), 11);
        assert!(matches!(&lines[9], Response::State(s) if s.tick == 10));
    }

    #[test]
    fn test_realtime_run_matches_flat_out_run() {
        let mission = fast_mission();
        let paced = RunOptions {
            realtime: true,
            ..RunOptions::default()
        };

        let mut sink = Vec::new();
        let realtime = HeadlessRunner::from_mission(&mission)
            .unwrap()
            .run(&paced, &mut sink)
            .unwrap();
        let flat = HeadlessRunner::from_mission(&mission)
            .unwrap()
            .run(&RunOptions::default(), &mut sink)
            .unwrap();

        assert!(realtime.complete);
        assert_eq!(realtime, flat);
    }

    #[test]
    fn test_verify_determinism_hashes_match() {
        let hashes = verify_determinism(&MissionFile::default_mission(), 3, 5_000).unwrap();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }
}
