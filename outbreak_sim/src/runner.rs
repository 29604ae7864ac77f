//! Scenario runner - replays scripted outbreak scenarios against a live
//! simulation and checks the engine's guarantees.

use crate::context::SeededContext;
use crate::scenarios::ScenarioId;

use outbreak_core::{
    Bounds, InfectionState, Phone, PhoneId, Point, SimulationConfig, Simulation, Velocity,
    MAX_HEALTH, REPAIR_THRESHOLD,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Wall-clock time spent in the scenario
    pub elapsed_ms: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Phones launched
    pub phones: usize,

    /// Infections applied by on-demand scans
    pub scan_infections: usize,

    /// Repair shop acquisitions
    pub repairs: u64,

    /// Phones that ran out of health
    pub deaths: usize,

    /// Most phones sick at once
    pub peak_sick: usize,
}

fn ensure(condition: bool, failure: impl FnOnce() -> String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(failure())
    }
}

async fn wait_for(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    timeout(limit, async {
        while !check() {
            sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .is_ok()
}

/// Runs outbreak scenarios.
pub struct ScenarioRunner {
    /// Master seed
    seed: u64,

    /// Population size for free-running scenarios
    phones: usize,

    /// Run time of the free-running outbreak
    duration: Duration,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            phones: 20,
            duration: Duration::from_secs(3),
        }
    }

    /// Sets the population size.
    pub fn with_phones(mut self, phones: usize) -> Self {
        self.phones = phones;
        self
    }

    /// Sets the outbreak duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Fast-paced configuration every scenario starts from.
    pub fn base_config(&self) -> SimulationConfig {
        SimulationConfig {
            initial_phones: 0,
            step_delay_ms: 1,
            repair_base_ms: 20,
            repair_jitter_ms: 10,
            ..Default::default()
        }
    }

    /// Wide arena with the shop in the far corner, several hundred steps
    /// away from phones launched near the origin.
    fn far_shop_config(&self) -> SimulationConfig {
        SimulationConfig {
            arena_width: 5_000,
            arena_height: 5_000,
            repair_shop: Point::new(4_900, 4_900),
            ..self.base_config()
        }
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!(scenario = %scenario, seed = self.seed, "starting scenario");
        let started = Instant::now();
        let mut metrics = ScenarioMetrics::default();

        let outcome = match scenario {
            ScenarioId::Proximity => self.run_proximity(&mut metrics).await,
            ScenarioId::RepairRush => self.run_repair_rush(&mut metrics).await,
            ScenarioId::RepairContention => self.run_repair_contention(&mut metrics).await,
            ScenarioId::DeathInRepair => self.run_death_in_repair(&mut metrics).await,
            ScenarioId::PauseFreeze => self.run_pause_freeze(&mut metrics).await,
            ScenarioId::StopMidRepair => self.run_stop_mid_repair(&mut metrics).await,
            ScenarioId::Outbreak => self.run_outbreak(&mut metrics).await,
        };

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            failure_reason: outcome.err(),
            metrics,
        }
    }

    fn start(&self, config: SimulationConfig) -> Result<Simulation<SeededContext>, String> {
        Simulation::start(config, SeededContext::shared(self.seed))
            .map_err(|e| format!("simulation failed to start: {e}"))
    }

    fn launch(
        sim: &Simulation<SeededContext>,
        metrics: &mut ScenarioMetrics,
        at: Point,
        state: InfectionState,
        health: u32,
    ) -> Result<Arc<Phone>, String> {
        let phone = Phone::new(PhoneId::next(), at, Velocity::new(1, 1), sim.bounds())
            .with_condition(state, health);
        let phone = sim.launch(phone).map_err(|e| format!("launch failed: {e}"))?;
        metrics.phones += 1;
        Ok(phone)
    }

    /// Shuts the simulation down and checks the shop ledger balances.
    async fn finish(
        sim: &Simulation<SeededContext>,
        metrics: &mut ScenarioMetrics,
    ) -> Result<(), String> {
        let stats = sim.refresh_statistics();
        metrics.deaths = metrics.phones.saturating_sub(stats.total);
        metrics.peak_sick = metrics.peak_sick.max(stats.sick());

        let report = sim.shutdown_with_grace(Duration::from_secs(2)).await;
        let shop = sim.repair_shop();
        metrics.repairs = shop.acquisitions();
        debug!(
            ?report,
            acquisitions = shop.acquisitions(),
            releases = shop.releases(),
            "scenario finished"
        );

        ensure(report.aborted == 0, || format!("{} tasks had to be aborted", report.aborted))?;
        ensure(report.panicked == 0, || format!("{} tasks panicked", report.panicked))?;
        ensure(!shop.is_busy(), || "repair shop still busy after shutdown".to_string())?;
        ensure(shop.acquisitions() == shop.releases(), || {
            format!("{} acquisitions but {} releases", shop.acquisitions(), shop.releases())
        })
    }

    /// Distance 10, radius 25: one scan infects the neighbour only.
    async fn run_proximity(&self, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let sim = self.start(self.base_config())?;
        let outcome: Result<(), String> = async {
            sim.pause();
            let carrier = Self::launch(
                &sim,
                metrics,
                Point::new(100, 100),
                InfectionState::Infected,
                MAX_HEALTH,
            )?;
            let near = Self::launch(
                &sim,
                metrics,
                Point::new(110, 100),
                InfectionState::Healthy,
                MAX_HEALTH,
            )?;
            let far = Self::launch(
                &sim,
                metrics,
                Point::new(400, 400),
                InfectionState::Healthy,
                MAX_HEALTH,
            )?;

            let infected = sim.scan_now();
            metrics.scan_infections = infected.len();

            ensure(infected == vec![near.id()], || format!("scan infected {infected:?}"))?;
            ensure(near.state() == InfectionState::Infected, || {
                "neighbour not infected".to_string()
            })?;
            ensure(near.health() == MAX_HEALTH, || "infection changed health".to_string())?;
            ensure(far.state() == InfectionState::Healthy, || {
                "distant phone infected".to_string()
            })?;
            ensure(carrier.state() == InfectionState::Infected, || {
                "carrier changed state".to_string()
            })?;
            sim.resume();
            Ok(())
        }
        .await;
        outcome.and(Self::finish(&sim, metrics).await)
    }

    /// Health 301, free shop: claimed on the first step, then repaired.
    async fn run_repair_rush(&self, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let sim = self.start(SimulationConfig {
            step_delay_ms: 20,
            ..self.base_config()
        })?;
        let outcome: Result<(), String> = async {
            let phone = Self::launch(
                &sim,
                metrics,
                Point::new(100, 100),
                InfectionState::Infected,
                REPAIR_THRESHOLD + 1,
            )?;

            let seeking = wait_for(Duration::from_millis(500), || {
                phone.state() == InfectionState::SeekingRepair
            })
            .await;
            ensure(seeking, || "phone never started seeking repair".to_string())?;
            let health = phone.health();
            ensure(health + 1 >= REPAIR_THRESHOLD, || {
                format!("claimed the shop late, at health {health}")
            })?;
            ensure(sim.repair_shop().is_busy(), || {
                "shop not busy while phone seeks it".to_string()
            })?;

            let repaired = wait_for(Duration::from_secs(10), || {
                phone.state() == InfectionState::Repaired
            })
            .await;
            ensure(repaired, || format!("phone never repaired (state {})", phone.state()))?;
            ensure(phone.health() == MAX_HEALTH, || "repair did not restore health".to_string())?;
            ensure(
                wait_for(Duration::from_millis(200), || !sim.repair_shop().is_busy()).await,
                || "shop not released after repair".to_string(),
            )
        }
        .await;
        outcome.and(Self::finish(&sim, metrics).await)
    }

    /// While one phone holds the shop, another below threshold stays Infected.
    async fn run_repair_contention(&self, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let sim = self.start(self.far_shop_config())?;
        let outcome: Result<(), String> = async {
            let holder = Self::launch(
                &sim,
                metrics,
                Point::new(100, 100),
                InfectionState::Infected,
                REPAIR_THRESHOLD + 1,
            )?;
            let waiter = Self::launch(
                &sim,
                metrics,
                Point::new(500, 300),
                InfectionState::Infected,
                REPAIR_THRESHOLD + 100,
            )?;

            let held = wait_for(Duration::from_secs(1), || {
                holder.state() == InfectionState::SeekingRepair
            })
            .await;
            ensure(held, || "first phone never claimed the shop".to_string())?;

            let below = wait_for(Duration::from_secs(2), || {
                waiter.health() <= REPAIR_THRESHOLD - 10
            })
            .await;
            ensure(below, || "second phone never dropped below the threshold".to_string())?;
            ensure(holder.state() == InfectionState::SeekingRepair, || {
                format!("holder left the shop early (state {})", holder.state())
            })?;
            ensure(waiter.state() == InfectionState::Infected, || {
                format!("waiter is {} while the shop is held", waiter.state())
            })?;

            let handed_over = wait_for(Duration::from_secs(3), || {
                waiter.state() == InfectionState::SeekingRepair
            })
            .await;
            ensure(handed_over, || "waiter never got the shop after the holder died".to_string())?;
            ensure(!holder.is_alive(), || "shop changed hands while the holder lived".to_string())
        }
        .await;
        outcome.and(Self::finish(&sim, metrics).await)
    }

    /// A phone dies while seeking repair: reaped, shop released.
    async fn run_death_in_repair(&self, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let sim = self.start(self.far_shop_config())?;
        let outcome: Result<(), String> = async {
            let phone = Self::launch(
                &sim,
                metrics,
                Point::new(100, 100),
                InfectionState::Infected,
                REPAIR_THRESHOLD + 1,
            )?;
            let id = phone.id();

            let seeking = wait_for(Duration::from_secs(1), || {
                phone.state() == InfectionState::SeekingRepair
            })
            .await;
            ensure(seeking, || "phone never started seeking repair".to_string())?;

            let reaped = wait_for(Duration::from_secs(5), || {
                sim.refresh_statistics();
                sim.phone(id).is_none()
            })
            .await;
            ensure(reaped, || format!("dead phone still registered (health {})", phone.health()))?;
            ensure(phone.health() == 0, || "reaped a living phone".to_string())?;
            ensure(
                wait_for(Duration::from_secs(1), || !sim.repair_shop().is_busy()).await,
                || "dead phone kept the shop".to_string(),
            )
        }
        .await;
        outcome.and(Self::finish(&sim, metrics).await)
    }

    /// Nothing moves while paused; movement resumes afterwards.
    async fn run_pause_freeze(&self, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let sim = self.start(SimulationConfig {
            initial_phones: self.phones,
            ..self.base_config()
        })?;
        metrics.phones = self.phones;
        let outcome: Result<(), String> = async {
            sim.infect_random_healthy();
            sleep(Duration::from_millis(50)).await;

            sim.pause();
            sleep(Duration::from_millis(60)).await;
            let frozen = sim.frame().phones;
            sleep(Duration::from_millis(150)).await;
            let later = sim.frame().phones;
            ensure(later == frozen, || "phones changed while paused".to_string())?;

            sim.resume();
            let moved = wait_for(Duration::from_secs(2), || sim.frame().phones != frozen).await;
            ensure(moved, || "phones did not move after resume".to_string())
        }
        .await;
        outcome.and(Self::finish(&sim, metrics).await)
    }

    /// Shutdown interrupts a repair; the phone goes back to Infected.
    async fn run_stop_mid_repair(&self, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let sim = self.start(SimulationConfig {
            repair_base_ms: 60_000,
            repair_jitter_ms: 0,
            ..self.base_config()
        })?;
        let prepared: Result<Arc<Phone>, String> = async {
            let target = sim.repair_shop().target();
            let phone = Self::launch(
                &sim,
                metrics,
                target,
                InfectionState::Infected,
                REPAIR_THRESHOLD + 1,
            )?;

            let repairing = wait_for(Duration::from_secs(1), || {
                phone.state() == InfectionState::SeekingRepair && sim.repair_shop().is_busy()
            })
            .await;
            ensure(repairing, || "phone never entered the repair shop".to_string())?;
            sleep(Duration::from_millis(30)).await;
            Ok(phone)
        }
        .await;

        let started = Instant::now();
        let closing = Self::finish(&sim, metrics).await;
        let phone = prepared?;
        closing?;

        ensure(started.elapsed() < Duration::from_secs(1), || {
            "shutdown waited out the repair".to_string()
        })?;
        ensure(phone.state() == InfectionState::Infected, || {
            format!("interrupted repair left the phone {}", phone.state())
        })?;
        ensure(phone.is_alive(), || "interrupted phone lost its health".to_string())
    }

    /// Free-running outbreak; invariants are sampled every 50ms.
    async fn run_outbreak(&self, metrics: &mut ScenarioMetrics) -> Result<(), String> {
        let sim = self.start(SimulationConfig {
            initial_phones: self.phones,
            step_delay_ms: 8,
            ..Default::default()
        })?;
        metrics.phones = self.phones;
        let outcome: Result<(), String> = async {
            ensure(sim.infect_random_healthy().is_some(), || "nobody to infect".to_string())?;
            let bounds: Bounds = sim.bounds();
            let started = Instant::now();

            while started.elapsed() < self.duration {
                let frame = sim.frame();
                let seeking = frame
                    .phones
                    .iter()
                    .filter(|p| p.state == InfectionState::SeekingRepair)
                    .count();
                // Two phones can be seen seeking only across a hand-over
                ensure(seeking <= 2, || format!("{seeking} phones seeking repair at once"))?;
                for phone in &frame.phones {
                    ensure(phone.health <= MAX_HEALTH, || {
                        format!("{} has health {}", phone.id, phone.health)
                    })?;
                    ensure(bounds.contains(phone.position), || {
                        format!("{} escaped to {:?}", phone.id, phone.position)
                    })?;
                }
                metrics.peak_sick = metrics.peak_sick.max(frame.statistics.sick());
                sleep(Duration::from_millis(50)).await;
            }
            Ok(())
        }
        .await;
        outcome.and(Self::finish(&sim, metrics).await)
    }
}
