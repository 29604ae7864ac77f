//! Simulation - owner of the registry, repair shop, pause barrier and all
//! tasks, with an explicit start/shutdown lifecycle.
//!
//! # Tasks
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Simulation                         │
//! │                                                          │
//! │  phone tasks (one per phone)     periodic tasks          │
//! │  ┌─────────┐ ┌─────────┐         ┌────────────────────┐  │
//! │  │ Phone-1 │ │ Phone-2 │  ...    │ infection scan     │  │
//! │  └────┬────┘ └────┬────┘         │ statistics + reap  │  │
//! │       │ checkpoint│              │ history sampling   │  │
//! │  ┌────▼───────────▼────┐         └─────────┬──────────┘  │
//! │  │  PauseCoordinator   │                   │ snapshots   │
//! │  └─────────────────────┘         ┌─────────▼──────────┐  │
//! │       │ try_acquire              │      Registry      │  │
//! │  ┌────▼────────────────┐         └────────────────────┘  │
//! │  │     RepairShop      │                                 │
//! │  └─────────────────────┘                                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every control operation is safe to call concurrently with the running
//! phones and periodic tasks.

use crate::config::SimulationConfig;
use crate::driver::PhoneDriver;
use crate::error::SimError;
use crate::frame::{Frame, PhoneView, ShopView};
use crate::geometry::{Bounds, Point, Velocity};
use crate::pause::{PauseCoordinator, StopSignal};
use crate::phone::{Phone, CRUISE_SPEED};
use crate::registry::Registry;
use crate::repair_shop::RepairShop;
use crate::scanner::InfectionScanner;
use crate::stats::{InfectionHistory, Statistics};

use outbreak_env::{OutbreakContext, PhoneId};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// RNG stream reserved for control operations (spawn placement, random infect).
const CONTROL_STREAM: u64 = u64::MAX;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Logs a task that ended in a panic. Returns whether it did.
fn report_panic(task: &str, joined: Result<(), JoinError>) -> bool {
    match joined {
        Err(e) if e.is_panic() => {
            error!(task, "task panicked");
            true
        }
        _ => false,
    }
}

/// Outcome of [`Simulation::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Tasks (phones and periodic) that were running at shutdown
    pub tasks: usize,

    /// Tasks that missed the grace period and were aborted
    pub aborted: usize,

    /// Tasks that had ended in a panic
    #[serde(default)]
    pub panicked: usize,
}

/// State shared with the periodic tasks.
struct Shared<Ctx: OutbreakContext> {
    config: SimulationConfig,
    context: Arc<Ctx>,
    registry: Registry,
    shop: Arc<RepairShop>,
    pause: Arc<PauseCoordinator>,
    scanner: InfectionScanner,
    statistics: RwLock<Statistics>,
    history: InfectionHistory,
    bounds: RwLock<Bounds>,
    control_rng: Mutex<ChaCha8Rng>,
    started_at: Duration,

    /// Stops the periodic tasks.
    halt: StopSignal,
    closed: AtomicBool,
}

impl<Ctx: OutbreakContext> Shared<Ctx> {
    fn scan(&self) -> Vec<PhoneId> {
        self.scanner.scan(&self.registry.snapshot())
    }

    fn refresh_statistics(&self) -> Statistics {
        self.registry.reap();
        let stats = Statistics::tally(&self.registry.snapshot());
        *self.statistics.write().unwrap_or_else(PoisonError::into_inner) = stats;
        stats
    }

    fn statistics(&self) -> Statistics {
        *self.statistics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn bounds(&self) -> Bounds {
        *self.bounds.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The running phone outbreak.
pub struct Simulation<Ctx: OutbreakContext> {
    shared: Arc<Shared<Ctx>>,
    phone_tasks: Mutex<Vec<(PhoneId, JoinHandle<()>)>>,
    background: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl<Ctx: OutbreakContext> Simulation<Ctx> {
    /// Validates `config`, starts the periodic tasks and spawns the initial
    /// phones. Must be called from within a runtime.
    pub fn start(config: SimulationConfig, context: Arc<Ctx>) -> Result<Self, SimError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            registry: Registry::new(),
            shop: RepairShop::shared(config.repair_shop),
            pause: Arc::new(PauseCoordinator::new()),
            scanner: InfectionScanner::new(config.infection_radius),
            statistics: RwLock::new(Statistics::default()),
            history: InfectionHistory::new(config.history_len),
            bounds: RwLock::new(config.bounds()),
            control_rng: Mutex::new(context.rng(CONTROL_STREAM)),
            started_at: context.now(),
            halt: StopSignal::new(),
            closed: AtomicBool::new(false),
            context,
            config,
        });

        let sim = Self {
            shared,
            phone_tasks: Mutex::new(Vec::new()),
            background: Mutex::new(Vec::new()),
        };

        let config = &sim.shared.config;
        sim.spawn_periodic("infection-scan", config.scan_interval(), |shared| {
            if !shared.pause.is_paused() {
                shared.scan();
            }
        })?;
        sim.spawn_periodic("statistics", config.stats_interval(), |shared| {
            shared.refresh_statistics();
        })?;
        sim.spawn_periodic("history", config.history_interval(), |shared| {
            shared.history.record(shared.statistics().sick());
        })?;

        for _ in 0..config.initial_phones {
            sim.spawn_phone()?;
        }

        info!(
            seed = sim.shared.context.seed(),
            phones = config.initial_phones,
            arena_width = config.arena_width,
            arena_height = config.arena_height,
            "simulation started"
        );
        Ok(sim)
    }

    fn spawn_periodic(
        &self,
        name: &str,
        period: Duration,
        job: fn(&Shared<Ctx>),
    ) -> Result<(), SimError> {
        let shared = Arc::clone(&self.shared);
        let handle = self.shared.context.spawn(name, async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => job(&shared),
                    _ = shared.halt.stopped() => break,
                }
            }
        })?;
        lock(&self.background).push((name.to_string(), handle));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Control surface
    // -----------------------------------------------------------------------

    /// Spawns a healthy phone at a random position with a random diagonal
    /// heading.
    pub fn spawn_phone(&self) -> Result<PhoneId, SimError> {
        let bounds = self.shared.bounds();
        let (position, velocity) = {
            let mut rng = lock(&self.shared.control_rng);
            let position = Point::new(
                rng.gen_range(0..=bounds.max_x),
                rng.gen_range(0..=bounds.max_y),
            );
            let dx = if rng.gen_bool(0.5) { CRUISE_SPEED } else { -CRUISE_SPEED };
            let dy = if rng.gen_bool(0.5) { CRUISE_SPEED } else { -CRUISE_SPEED };
            (position, Velocity::new(dx, dy))
        };
        let phone = Phone::new(PhoneId::next(), position, velocity, bounds);
        Ok(self.launch(phone)?.id())
    }

    /// Registers a prepared phone and starts its driver task.
    pub fn launch(&self, phone: Phone) -> Result<Arc<Phone>, SimError> {
        let mut tasks = lock(&self.phone_tasks);
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(SimError::ShutDown);
        }

        let phone = Arc::new(phone);
        let id = phone.id();
        if !self.shared.registry.insert(Arc::clone(&phone)) {
            return Err(SimError::DuplicatePhone(id));
        }

        let shared = &self.shared;
        let driver = PhoneDriver::new(
            Arc::clone(&phone),
            Arc::clone(&shared.shop),
            Arc::clone(&shared.pause),
            Arc::clone(&shared.context),
            shared.context.rng(id.as_u64()),
        )
        .with_step_delay(shared.config.step_delay())
        .with_repair_time(shared.config.repair_time());

        let handle = match shared.context.spawn(&id.to_string(), driver.run()) {
            Ok(handle) => handle,
            Err(e) => {
                shared.registry.remove(id);
                return Err(e.into());
            }
        };

        tasks.push((id, handle));
        debug!(phone = %id, position = ?phone.position(), "phone spawned");
        Ok(phone)
    }

    /// Infects one phone. Returns whether this call performed the infection.
    pub fn infect(&self, id: PhoneId) -> bool {
        self.shared.registry.get(id).is_some_and(|phone| phone.infect())
    }

    /// Infects a randomly chosen healthy phone, if there is one.
    pub fn infect_random_healthy(&self) -> Option<PhoneId> {
        let healthy = self.shared.registry.healthy();
        if healthy.is_empty() {
            return None;
        }
        let pick = lock(&self.shared.control_rng).gen_range(0..healthy.len());
        let phone = &healthy[pick];
        phone.infect().then(|| phone.id())
    }

    pub fn pause(&self) {
        self.shared.pause.pause();
    }

    pub fn resume(&self) {
        self.shared.pause.resume();
    }

    /// Flips pause state; returns `true` if the simulation is now paused.
    pub fn toggle_pause(&self) -> bool {
        let paused = self.shared.pause.toggle();
        info!(paused, "pause toggled");
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.shared.pause.is_paused()
    }

    /// Resizes the arena; every phone is re-ranged to the new bounds.
    pub fn resize(&self, width: i32, height: i32) -> Result<Bounds, SimError> {
        let phone_size = self.shared.config.phone_size;
        if width <= phone_size || height <= phone_size {
            return Err(SimError::invalid(format!(
                "arena {width}x{height} is too small for {phone_size}px phones"
            )));
        }
        let bounds = Bounds::for_arena(width, height, phone_size);
        self.shared.config.check_repair_shop(bounds)?;
        *self.shared.bounds.write().unwrap_or_else(PoisonError::into_inner) = bounds;
        self.shared.registry.set_bounds(bounds);
        debug!(width, height, "arena resized");
        Ok(bounds)
    }

    // -----------------------------------------------------------------------
    // Periodic work, callable on demand
    // -----------------------------------------------------------------------

    /// Runs one infection scan now, regardless of pause state.
    pub fn scan_now(&self) -> Vec<PhoneId> {
        self.shared.scan()
    }

    /// Reaps dead phones and recomputes the statistics.
    pub fn refresh_statistics(&self) -> Statistics {
        self.shared.refresh_statistics()
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &SimulationConfig {
        &self.shared.config
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.shared.context
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn repair_shop(&self) -> &Arc<RepairShop> {
        &self.shared.shop
    }

    pub fn phone(&self, id: PhoneId) -> Option<Arc<Phone>> {
        self.shared.registry.get(id)
    }

    pub fn bounds(&self) -> Bounds {
        self.shared.bounds()
    }

    /// Last statistics computed by the periodic aggregator.
    pub fn statistics(&self) -> Statistics {
        self.shared.statistics()
    }

    pub fn history(&self) -> Vec<usize> {
        self.shared.history.samples()
    }

    /// Phone tasks that have not finished yet.
    pub fn live_tasks(&self) -> usize {
        lock(&self.phone_tasks)
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .count()
    }

    pub fn elapsed(&self) -> Duration {
        self.shared.context.now().saturating_sub(self.shared.started_at)
    }

    /// Everything a renderer needs for one frame.
    pub fn frame(&self) -> Frame {
        let shop = &self.shared.shop;
        Frame {
            elapsed_ms: self.elapsed().as_millis() as u64,
            paused: self.is_paused(),
            phones: self
                .shared
                .registry
                .snapshot()
                .iter()
                .map(|phone| PhoneView::of(phone))
                .collect(),
            repair_shop: ShopView {
                position: shop.position(),
                busy: shop.is_busy(),
            },
            statistics: self.statistics(),
            history: self.history(),
            live_tasks: self.live_tasks(),
        }
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Shuts down with the configured grace period.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.shutdown_with_grace(self.shared.config.shutdown_grace()).await
    }

    /// Stops every phone and periodic task, waits up to `grace` for them to
    /// exit and aborts the rest. Idempotent.
    pub async fn shutdown_with_grace(&self, grace: Duration) -> ShutdownReport {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return ShutdownReport::default();
        }

        // Taking the lock waits out any in-flight launch; later ones see `closed`.
        let mut pending: Vec<(String, JoinHandle<()>)> = lock(&self.phone_tasks)
            .drain(..)
            .map(|(id, task)| (id.to_string(), task))
            .collect();
        pending.extend(lock(&self.background).drain(..));
        let tasks = pending.len();

        self.shared.halt.stop();
        self.shared.registry.stop_all();

        let mut panicked = 0;
        let drained = tokio::time::timeout(grace, async {
            while let Some((_, task)) = pending.last_mut() {
                let joined = task.await;
                if let Some((name, _)) = pending.pop() {
                    panicked += usize::from(report_panic(&name, joined));
                }
            }
        })
        .await
        .is_ok();

        let aborted = if drained { 0 } else { pending.len() };
        if aborted > 0 {
            warn!(
                aborted,
                grace_ms = grace.as_millis() as u64,
                "tasks missed the shutdown grace period"
            );
            for (_, task) in &pending {
                task.abort();
            }
            for (name, task) in pending {
                panicked += usize::from(report_panic(&name, task.await));
            }
        }

        self.shared.registry.clear();
        info!(tasks, aborted, panicked, "simulation shut down");
        ShutdownReport {
            tasks,
            aborted,
            panicked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phone::{InfectionState, MAX_HEALTH};
    use outbreak_env::TokioContext;
    use tokio::time::{sleep, timeout};

    fn quiet_config() -> SimulationConfig {
        SimulationConfig {
            initial_phones: 0,
            step_delay_ms: 1,
            repair_base_ms: 20,
            repair_jitter_ms: 10,
            ..Default::default()
        }
    }

    fn start(config: SimulationConfig) -> Simulation<TokioContext> {
        Simulation::start(config, TokioContext::shared()).expect("simulation starts")
    }

    fn prepared(x: i32, y: i32, state: InfectionState, health: u32) -> Phone {
        Phone::new(PhoneId::next(), Point::new(x, y), Velocity::new(1, 1), Bounds::new(725, 685))
            .with_condition(state, health)
    }

    async fn eventually(what: &str, limit: Duration, mut check: impl FnMut() -> bool) {
        let waited = timeout(limit, async {
            while !check() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {what}");
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let result = Simulation::start(SimulationConfig::default(), TokioContext::shared());
        assert!(matches!(result, Err(SimError::Env(_))));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let config = SimulationConfig {
            history_len: 0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::start(config, TokioContext::shared()),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_start_spawns_initial_phones_and_shuts_down_cleanly() {
        let sim = start(SimulationConfig {
            initial_phones: 4,
            ..quiet_config()
        });
        assert_eq!(sim.registry().len(), 4);
        assert_eq!(sim.live_tasks(), 4);
        assert_eq!(sim.frame().live_tasks, 4);

        let report = sim.shutdown().await;
        assert_eq!(report.tasks, 4 + 3);
        assert_eq!(report.aborted, 0);
        assert_eq!(report.panicked, 0);
        assert!(sim.registry().is_empty());
        assert_eq!(sim.live_tasks(), 0);
        assert!(matches!(sim.spawn_phone(), Err(SimError::ShutDown)));

        // Second shutdown is a no-op
        assert_eq!(sim.shutdown().await, ShutdownReport::default());
    }

    #[tokio::test]
    async fn test_spawned_phones_stay_in_bounds() {
        let sim = start(SimulationConfig {
            initial_phones: 10,
            ..quiet_config()
        });
        sleep(Duration::from_millis(50)).await;
        let bounds = sim.bounds();
        for view in sim.frame().phones {
            assert!(bounds.contains(view.position), "{:?} escaped {:?}", view.position, bounds);
            assert!(view.health <= MAX_HEALTH);
        }
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_launch_is_rejected() {
        let sim = start(quiet_config());
        let phone = prepared(10, 10, InfectionState::Healthy, MAX_HEALTH);
        let id = phone.id();
        sim.launch(phone).unwrap();
        let twin = Phone::new(id, Point::new(0, 0), Velocity::new(1, 1), Bounds::new(10, 10));
        assert!(matches!(sim.launch(twin), Err(SimError::DuplicatePhone(dup)) if dup == id));
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_infect_random_healthy() {
        let sim = start(quiet_config());
        assert_eq!(sim.infect_random_healthy(), None);

        let id = sim.spawn_phone().unwrap();
        assert_eq!(sim.infect_random_healthy(), Some(id));
        assert_eq!(sim.phone(id).unwrap().state(), InfectionState::Infected);
        // Nobody healthy is left
        assert_eq!(sim.infect_random_healthy(), None);
        assert!(!sim.infect(id));
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_scan_infects_phone_within_radius() {
        let sim = start(quiet_config());
        sim.pause();
        let carrier = sim.launch(prepared(100, 100, InfectionState::Infected, 350)).unwrap();
        let target = sim.launch(prepared(110, 100, InfectionState::Healthy, MAX_HEALTH)).unwrap();

        assert_eq!(sim.scan_now(), vec![target.id()]);
        assert_eq!(target.state(), InfectionState::Infected);
        assert_eq!(target.health(), MAX_HEALTH);
        assert_eq!(carrier.health(), 350);
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_pause_freezes_and_resume_restores_progress() {
        let sim = start(SimulationConfig {
            initial_phones: 8,
            ..quiet_config()
        });
        sim.infect_random_healthy();
        sleep(Duration::from_millis(30)).await;

        assert!(sim.toggle_pause());
        // In-flight steps and repairs finish before the checkpoint holds them
        sleep(Duration::from_millis(60)).await;
        let frozen = sim.frame().phones;
        sleep(Duration::from_millis(100)).await;
        assert_eq!(sim.frame().phones, frozen);

        assert!(!sim.toggle_pause());
        eventually("phones to move again", Duration::from_secs(2), || {
            sim.frame().phones != frozen
        })
        .await;

        let report = sim.shutdown().await;
        assert_eq!(report.aborted, 0);
    }

    #[tokio::test]
    async fn test_shutdown_while_paused_does_not_hang() {
        let sim = start(SimulationConfig {
            initial_phones: 6,
            ..quiet_config()
        });
        sim.pause();
        sleep(Duration::from_millis(20)).await;

        let closing = sim.shutdown_with_grace(Duration::from_secs(1));
        let report = timeout(Duration::from_secs(2), closing)
            .await
            .expect("shutdown completes");
        assert_eq!(report.aborted, 0);
    }

    #[tokio::test]
    async fn test_death_while_seeking_repair_reaps_phone_and_frees_shop() {
        // About 700 seek steps to the shop with 300 health to spend
        let sim = start(SimulationConfig {
            arena_width: 5_000,
            arena_height: 5_000,
            repair_shop: Point::new(4_900, 4_900),
            ..quiet_config()
        });
        let phone = sim.launch(prepared(10, 10, InfectionState::Infected, 301)).unwrap();
        let shop = Arc::clone(sim.repair_shop());

        eventually("phone to seek repair", Duration::from_secs(1), || {
            phone.state() == InfectionState::SeekingRepair
        })
        .await;
        assert!(shop.is_busy());

        eventually("phone to be reaped", Duration::from_secs(5), || {
            sim.refresh_statistics();
            sim.registry().is_empty()
        })
        .await;
        eventually("shop to be released", Duration::from_secs(1), || !shop.is_busy()).await;
        assert_eq!(shop.acquisitions(), 1);
        assert_eq!(shop.releases(), 1);
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_contending_phones_are_repaired_one_at_a_time() {
        let sim = start(quiet_config());
        let target = sim.repair_shop().target();
        let phones: Vec<_> = (0..5)
            .map(|_| {
                sim.launch(prepared(target.x, target.y, InfectionState::Infected, 301))
                    .unwrap()
            })
            .collect();

        eventually("every phone to be repaired", Duration::from_secs(3), || {
            phones.iter().all(|p| p.state() == InfectionState::Repaired)
        })
        .await;

        let shop = sim.repair_shop();
        assert_eq!(shop.acquisitions(), 5);
        assert_eq!(shop.releases(), 5);
        assert!(!shop.is_busy());
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_resize_reranges_phones() {
        let sim = start(SimulationConfig {
            initial_phones: 5,
            ..quiet_config()
        });
        let bounds = sim.resize(600, 560).unwrap();
        assert_eq!(bounds, Bounds::new(565, 525));
        for phone in sim.registry().snapshot() {
            assert_eq!(phone.bounds(), bounds);
        }
        sleep(Duration::from_millis(20)).await;
        for view in sim.frame().phones {
            assert!(bounds.contains(view.position));
        }
        assert!(matches!(sim.resize(10, 10), Err(SimError::InvalidConfig(_))));
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn test_resize_keeps_repair_shop_reachable() {
        let sim = start(SimulationConfig {
            initial_phones: 2,
            ..quiet_config()
        });
        let before = sim.bounds();

        // The shop target (390, 510) would fall outside a 400x400 arena
        assert!(matches!(sim.resize(400, 400), Err(SimError::InvalidConfig(_))));
        assert_eq!(sim.bounds(), before);
        for phone in sim.registry().snapshot() {
            assert_eq!(phone.bounds(), before);
        }
        sim.shutdown().await;
    }

    /// Context whose clock fails on the first sleep.
    struct FaultyContext(TokioContext);

    #[async_trait::async_trait]
    impl OutbreakContext for FaultyContext {
        fn now(&self) -> Duration {
            self.0.now()
        }

        async fn sleep(&self, _duration: Duration) {
            panic!("clock failure");
        }

        fn spawn<F>(&self, name: &str, future: F) -> Result<JoinHandle<()>, outbreak_env::EnvError>
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            self.0.spawn(name, future)
        }

        fn rng(&self, stream: u64) -> ChaCha8Rng {
            self.0.rng(stream)
        }

        fn seed(&self) -> u64 {
            0
        }
    }

    #[tokio::test]
    async fn test_shutdown_counts_panicked_tasks() {
        let config = SimulationConfig {
            initial_phones: 3,
            ..quiet_config()
        };
        let sim = Simulation::start(config, Arc::new(FaultyContext(TokioContext::new()))).unwrap();
        eventually("phone tasks to fail", Duration::from_secs(2), || sim.live_tasks() == 0).await;

        let report = sim.shutdown().await;
        assert_eq!(report.tasks, 3 + 3);
        assert_eq!(report.panicked, 3);
        assert_eq!(report.aborted, 0);
    }

    #[tokio::test]
    async fn test_periodic_tasks_fill_statistics_and_history() {
        let sim = start(SimulationConfig {
            initial_phones: 3,
            stats_interval_ms: 10,
            history_interval_ms: 10,
            history_len: 4,
            ..quiet_config()
        });
        sim.infect_random_healthy();

        eventually("statistics to count the population", Duration::from_secs(1), || {
            sim.statistics().total == 3
        })
        .await;
        eventually("history to fill up", Duration::from_secs(1), || sim.history().len() == 4).await;
        assert!(sim.statistics().sick() >= 1);
        sleep(Duration::from_millis(50)).await;
        assert_eq!(sim.history().len(), 4);
        sim.shutdown().await;
    }
}
