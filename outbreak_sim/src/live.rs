//! Live headless runs: the simulation keeps going until its time is up,
//! a `quit` arrives on the command channel, or the process is interrupted.

use crate::control::Command;
use crate::exporter::SimExport;

use outbreak_core::{ShutdownReport, Simulation, Statistics};
use outbreak_env::{spawn_named, EnvError, OutbreakContext};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Random healthy phones infected at start
    pub infect: usize,

    /// Run time; `None` runs until quit or interrupt
    pub duration: Option<Duration>,

    /// How often a frame is taken
    pub frame_interval: Duration,

    /// Keep every frame for export
    pub record_frames: bool,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            infect: 1,
            duration: Some(Duration::from_secs(10)),
            frame_interval: Duration::from_millis(100),
            record_frames: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Elapsed,
    Quit,
    Interrupted,
}

/// End-of-run summary printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSummary {
    pub run_id: Uuid,
    pub seed: u64,
    pub stop_reason: StopReason,
    pub elapsed_ms: u64,
    pub statistics: Statistics,
    pub infection_rate: f64,
    pub live_tasks: usize,
    pub repairs: u64,
    pub peak_sick: usize,
    pub shutdown: ShutdownReport,
}

/// Run time from a `--duration` value in seconds. Zero means no limit;
/// negative, non-finite or out-of-range values are rejected.
pub fn parse_run_duration(secs: f64) -> Result<Option<Duration>, String> {
    if secs == 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|e| format!("invalid duration {secs}: {e}"))
}

/// Applies one control command. Returns `false` on quit.
pub fn apply_command<Ctx: OutbreakContext>(sim: &Simulation<Ctx>, command: Command) -> bool {
    match command {
        Command::Spawn(count) => {
            for _ in 0..count {
                match sim.spawn_phone() {
                    Ok(id) => info!(phone = %id, "phone spawned"),
                    Err(e) => {
                        warn!(error = %e, "spawn failed");
                        break;
                    }
                }
            }
        }
        Command::Infect => match sim.infect_random_healthy() {
            Some(id) => info!(phone = %id, "phone infected"),
            None => info!("no healthy phone to infect"),
        },
        Command::Pause => {
            sim.toggle_pause();
        }
        Command::Status => {
            let stats = sim.refresh_statistics();
            info!(
                total = stats.total,
                healthy = stats.healthy,
                infected = stats.infected,
                seeking_repair = stats.seeking_repair,
                repaired = stats.repaired,
                infection_rate = stats.infection_rate(),
                live_tasks = sim.live_tasks(),
                paused = sim.is_paused(),
                "status"
            );
        }
        Command::Quit => return false,
    }
    true
}

/// Drives a running simulation until it is time to stop.
pub async fn run_live<Ctx, I>(
    sim: &Simulation<Ctx>,
    options: &LiveOptions,
    commands: &mut mpsc::Receiver<Command>,
    export: &mut SimExport,
    interrupt: I,
) -> StopReason
where
    Ctx: OutbreakContext,
    I: Future<Output = ()>,
{
    for _ in 0..options.infect {
        if sim.infect_random_healthy().is_none() {
            break;
        }
    }

    // A deadline past the clock's range never fires
    let deadline = async {
        match options.duration.and_then(|d| Instant::now().checked_add(d)) {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(interrupt);

    let mut frames = tokio::time::interval(options.frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut commands_open = true;

    loop {
        tokio::select! {
            _ = &mut deadline => return StopReason::Elapsed,
            _ = &mut interrupt => return StopReason::Interrupted,
            command = commands.recv(), if commands_open => match command {
                Some(command) => {
                    if !apply_command(sim, command) {
                        return StopReason::Quit;
                    }
                }
                None => commands_open = false,
            },
            _ = frames.tick() => {
                let frame = sim.frame();
                debug!(
                    phones = frame.phones.len(),
                    sick = frame.statistics.sick(),
                    busy = frame.repair_shop.busy,
                    paused = frame.paused,
                    "frame"
                );
                if options.record_frames {
                    export.add_frame(frame);
                }
            }
        }
    }
}

/// Shuts the simulation down and assembles the summary.
pub async fn finish_live<Ctx: OutbreakContext>(
    sim: &Simulation<Ctx>,
    reason: StopReason,
    export: &mut SimExport,
) -> LiveSummary {
    let statistics = sim.refresh_statistics();
    let live_tasks = sim.live_tasks();
    let elapsed_ms = sim.elapsed().as_millis() as u64;
    let shutdown = sim.shutdown().await;
    let repairs = sim.repair_shop().acquisitions();
    export.finalize(statistics, shutdown, repairs);

    LiveSummary {
        run_id: export.run_id,
        seed: sim.context().seed(),
        stop_reason: reason,
        elapsed_ms,
        statistics,
        infection_rate: statistics.infection_rate(),
        live_tasks,
        repairs,
        peak_sick: export.peak_sick().max(statistics.sick()),
        shutdown,
    }
}

/// Forwards parsed stdin lines to `commands` until stdin closes.
pub fn spawn_stdin_commands(commands: mpsc::Sender<Command>) -> Result<JoinHandle<()>, EnvError> {
    spawn_named("stdin", async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(command) => {
                        if commands.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{e}"),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SeededContext;
    use outbreak_core::SimulationConfig;

    fn start(phones: usize) -> Simulation<SeededContext> {
        let config = SimulationConfig {
            initial_phones: phones,
            step_delay_ms: 2,
            ..Default::default()
        };
        Simulation::start(config, SeededContext::shared(9)).unwrap()
    }

    #[tokio::test]
    async fn test_run_until_elapsed_records_frames() {
        let sim = start(5);
        let (_tx, mut rx) = mpsc::channel(8);
        let mut export = SimExport::new("live", 9);
        let options = LiveOptions {
            duration: Some(Duration::from_millis(120)),
            frame_interval: Duration::from_millis(20),
            record_frames: true,
            ..Default::default()
        };

        let reason = run_live(&sim, &options, &mut rx, &mut export, std::future::pending()).await;
        assert_eq!(reason, StopReason::Elapsed);
        assert!(export.frames.len() >= 3);
        assert!(export.frames.iter().all(|f| f.phones.len() <= 5));

        let summary = finish_live(&sim, reason, &mut export).await;
        assert_eq!(summary.seed, 9);
        assert_eq!(summary.shutdown.aborted, 0);
        assert!(summary.peak_sick >= 1);
        assert_eq!(export.shutdown, Some(summary.shutdown));
    }

    #[tokio::test]
    async fn test_commands_drive_the_simulation() {
        let sim = start(0);
        let (tx, mut rx) = mpsc::channel(8);
        let mut export = SimExport::new("live", 9);
        let options = LiveOptions {
            infect: 0,
            duration: None,
            ..Default::default()
        };

        tx.send(Command::Spawn(3)).await.unwrap();
        tx.send(Command::Infect).await.unwrap();
        tx.send(Command::Pause).await.unwrap();
        tx.send(Command::Status).await.unwrap();
        tx.send(Command::Quit).await.unwrap();

        let reason = run_live(&sim, &options, &mut rx, &mut export, std::future::pending()).await;
        assert_eq!(reason, StopReason::Quit);
        assert_eq!(sim.registry().len(), 3);
        assert!(sim.is_paused());
        assert!(sim.refresh_statistics().sick() >= 1);
        assert!(export.frames.is_empty());
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_interrupt_and_closed_channel() {
        let sim = start(2);
        let (tx, mut rx) = mpsc::channel::<Command>(1);
        drop(tx);
        let mut export = SimExport::new("live", 9);
        let options = LiveOptions {
            duration: None,
            ..Default::default()
        };

        let interrupt = tokio::time::sleep(Duration::from_millis(30));
        let reason = run_live(&sim, &options, &mut rx, &mut export, interrupt).await;
        assert_eq!(reason, StopReason::Interrupted);
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_unbounded_duration_waits_for_interrupt() {
        let sim = start(1);
        let (_tx, mut rx) = mpsc::channel::<Command>(1);
        let mut export = SimExport::new("live", 9);
        let options = LiveOptions {
            duration: Some(Duration::MAX),
            ..Default::default()
        };

        let interrupt = tokio::time::sleep(Duration::from_millis(30));
        let reason = run_live(&sim, &options, &mut rx, &mut export, interrupt).await;
        assert_eq!(reason, StopReason::Interrupted);
        sim.shutdown().await;
    }

    #[test]
    fn test_parse_run_duration() {
        assert_eq!(parse_run_duration(0.0), Ok(None));
        assert_eq!(parse_run_duration(2.5), Ok(Some(Duration::from_millis(2_500))));
        assert!(parse_run_duration(1e30).is_err());
        assert!(parse_run_duration(f64::INFINITY).is_err());
        assert!(parse_run_duration(f64::NAN).is_err());
        assert!(parse_run_duration(-1.0).is_err());
    }

    #[tokio::test]
    async fn test_spawn_after_shutdown_is_reported_not_fatal() {
        let sim = start(0);
        sim.shutdown().await;
        assert!(apply_command(&sim, Command::Spawn(2)));
        assert!(!apply_command(&sim, Command::Quit));
    }
}
