//! Phone driver - the task that owns one phone's step loop.
//!
//! Each iteration:
//! 1. park at the pause checkpoint
//! 2. exit if stopped or out of health
//! 3. drain health and, below the threshold, try to claim the repair shop
//! 4. bounce around, or head for the shop and repair on arrival
//! 5. sleep the step delay
//!
//! The repair ticket lives in the driver, i.e. inside the task's future.
//! Whether the loop returns normally, is stopped mid-repair, or the task is
//! aborted, dropping the driver drops the ticket and frees the shop.

use crate::phone::{InfectionState, Phone, REPAIR_THRESHOLD};
use crate::pause::PauseCoordinator;
use crate::repair_shop::{RepairShop, RepairTicket};
use outbreak_env::OutbreakContext;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// How long a repair takes: `base` plus a uniform random extra below `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairTime {
    pub base: Duration,
    pub jitter: Duration,
}

impl RepairTime {
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 { 0 } else { rng.gen_range(0..jitter_ms) };
        self.base + Duration::from_millis(extra)
    }
}

impl Default for RepairTime {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1000),
            jitter: Duration::from_millis(500),
        }
    }
}

/// Outcome of one bookkeeping + movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The phone moved (bouncing or toward the shop).
    Moved,
    /// The phone is at the shop and should be repaired now.
    Arrived,
    /// Health reached zero; the loop must end.
    Depleted,
}

/// Owns the step loop of a single phone.
pub struct PhoneDriver<Ctx: OutbreakContext> {
    phone: Arc<Phone>,
    shop: Arc<RepairShop>,
    pause: Arc<PauseCoordinator>,
    context: Arc<Ctx>,
    rng: ChaCha8Rng,
    ticket: Option<RepairTicket>,
    step_delay: Duration,
    repair_time: RepairTime,
}

impl<Ctx: OutbreakContext> PhoneDriver<Ctx> {
    pub fn new(
        phone: Arc<Phone>,
        shop: Arc<RepairShop>,
        pause: Arc<PauseCoordinator>,
        context: Arc<Ctx>,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            phone,
            shop,
            pause,
            context,
            rng,
            ticket: None,
            step_delay: Duration::from_millis(8),
            repair_time: RepairTime::default(),
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_repair_time(mut self, repair_time: RepairTime) -> Self {
        self.repair_time = repair_time;
        self
    }

    pub fn phone(&self) -> &Arc<Phone> {
        &self.phone
    }

    /// Whether this driver currently holds the repair shop.
    pub fn holds_ticket(&self) -> bool {
        self.ticket.is_some()
    }

    /// Infection bookkeeping followed by one movement step.
    pub fn step(&mut self) -> Step {
        if self.phone.state().is_sick() {
            let health = self.phone.drain_health();
            if health == 0 {
                return Step::Depleted;
            }
            if health <= REPAIR_THRESHOLD && self.ticket.is_none() {
                self.try_claim_shop();
            }
        }

        if self.phone.state() == InfectionState::SeekingRepair {
            if self.phone.seek_step(self.shop.target()) {
                return Step::Arrived;
            }
        } else {
            self.phone.bounce_step();
        }
        Step::Moved
    }

    fn try_claim_shop(&mut self) {
        if self.phone.state() != InfectionState::Infected {
            return;
        }
        let Some(ticket) = self.shop.try_acquire() else {
            trace!(phone = %self.phone.id(), "repair shop busy");
            return;
        };
        if self.phone.begin_repair_seek() {
            debug!(phone = %self.phone.id(), health = self.phone.health(), "heading for repair");
            self.ticket = Some(ticket);
        }
    }

    /// Waits out the repair, then marks the phone repaired.
    ///
    /// A stop request cuts the wait short; the phone goes back to Infected.
    /// The shop is released on both paths.
    pub async fn repair(&mut self) {
        let duration = self.repair_time.sample(&mut self.rng);
        let stop = self.phone.stop_signal();
        let completed = tokio::select! {
            _ = self.context.sleep(duration) => true,
            _ = stop.stopped() => false,
        };

        if completed {
            self.phone.complete_repair();
            debug!(
                phone = %self.phone.id(),
                repair_ms = duration.as_millis() as u64,
                "phone repaired"
            );
        } else {
            self.phone.abandon_repair();
            debug!(phone = %self.phone.id(), "repair interrupted");
        }
        self.ticket = None;
    }

    /// Runs until the phone is stopped or its health is exhausted.
    pub async fn run(mut self) {
        let id = self.phone.id();
        debug!(phone = %id, "phone started");

        loop {
            self.pause.checkpoint(self.phone.stop_signal()).await;
            if !self.phone.is_running() || !self.phone.is_alive() {
                break;
            }

            match self.step() {
                Step::Depleted => break,
                Step::Arrived => self.repair().await,
                Step::Moved => {}
            }

            let stop = self.phone.stop_signal();
            tokio::select! {
                _ = self.context.sleep(self.step_delay) => {}
                _ = stop.stopped() => {}
            }
        }

        if self.ticket.take().is_some() {
            debug!(phone = %id, "released repair shop on exit");
        }
        debug!(
            phone = %id,
            health = self.phone.health(),
            state = %self.phone.state(),
            "phone stopped"
        );
    }
}
