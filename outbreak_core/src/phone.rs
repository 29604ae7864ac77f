//! Phone - one simulated agent.
//!
//! Every field is an atomic so the registry, the scanner and renderers can
//! read a phone while its driver task mutates it:
//! - position, velocity and bounds are packed `(i32, i32)` pairs published
//!   with a single store, so readers never see a torn or out-of-bounds point
//! - health is single-writer (the driver) except for the reset that follows
//!   a won infection CAS
//! - the infection state is one tag changed only by compare-and-swap

use crate::geometry::{self, Bounds, Point, Velocity};
use crate::pause::StopSignal;
use outbreak_env::PhoneId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use tracing::debug;

/// Full health; also the value restored by infection and by repair.
pub const MAX_HEALTH: u32 = 500;

/// Health at or below which an infected phone heads for the repair shop.
pub const REPAIR_THRESHOLD: u32 = 300;

/// Per-axis speed while heading for the repair shop.
pub const SEEK_SPEED: i32 = 7;

/// Per-axis speed while bouncing around.
pub const CRUISE_SPEED: i32 = 1;

/// Distance on each axis at which a phone counts as arrived at the shop.
pub const ARRIVAL_TOLERANCE: i32 = 5;

/// Infection state of a phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InfectionState {
    Healthy = 0,
    Infected = 1,
    SeekingRepair = 2,
    /// Terminal and immune.
    Repaired = 3,
}

impl InfectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Infected,
            2 => Self::SeekingRepair,
            3 => Self::Repaired,
            _ => Self::Healthy,
        }
    }

    /// Infected phones lose health every step, whether or not they are
    /// already on their way to the shop.
    pub fn is_sick(&self) -> bool {
        matches!(self, Self::Infected | Self::SeekingRepair)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Infected => "infected",
            Self::SeekingRepair => "seeking_repair",
            Self::Repaired => "repaired",
        }
    }
}

impl std::fmt::Display for InfectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A simulated phone.
#[derive(Debug)]
pub struct Phone {
    id: PhoneId,
    position: AtomicU64,
    velocity: AtomicU64,
    bounds: AtomicU64,
    health: AtomicU32,
    state: AtomicU8,
    stop: StopSignal,
}

impl Phone {
    /// Creates a healthy phone. `position` is clamped into `bounds`.
    pub fn new(id: PhoneId, position: Point, velocity: Velocity, bounds: Bounds) -> Self {
        let position = Point::new(
            position.x.clamp(0, bounds.max_x),
            position.y.clamp(0, bounds.max_y),
        );
        Self {
            id,
            position: AtomicU64::new(position.pack()),
            velocity: AtomicU64::new(velocity.pack()),
            bounds: AtomicU64::new(bounds.pack()),
            health: AtomicU32::new(MAX_HEALTH),
            state: AtomicU8::new(InfectionState::Healthy as u8),
            stop: StopSignal::new(),
        }
    }

    /// Sets the initial condition before the phone is shared.
    ///
    /// Health is clamped to `[0, MAX_HEALTH]`.
    pub fn with_condition(self, state: InfectionState, health: u32) -> Self {
        self.state.store(state as u8, Ordering::Relaxed);
        self.health.store(health.min(MAX_HEALTH), Ordering::Relaxed);
        self
    }

    pub fn id(&self) -> PhoneId {
        self.id
    }

    pub fn position(&self) -> Point {
        Point::unpack(self.position.load(Ordering::Acquire))
    }

    pub fn velocity(&self) -> Velocity {
        Velocity::unpack(self.velocity.load(Ordering::Acquire))
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::unpack(self.bounds.load(Ordering::Acquire))
    }

    /// Re-ranges the phone, e.g. after the arena is resized. The next
    /// bounce step clamps the position into the new bounds.
    pub fn set_bounds(&self, bounds: Bounds) {
        self.bounds.store(bounds.pack(), Ordering::Release);
    }

    pub fn health(&self) -> u32 {
        self.health.load(Ordering::Acquire)
    }

    pub fn state(&self) -> InfectionState {
        InfectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_alive(&self) -> bool {
        self.health() > 0
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_running()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Asks the driver to exit, waking it if it is paused or repairing.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Healthy -> Infected. Only the winning call resets health; every other
    /// state (including Repaired) makes this a no-op.
    ///
    /// Returns whether this call performed the transition.
    pub fn infect(&self) -> bool {
        if self.transition(InfectionState::Healthy, InfectionState::Infected) {
            self.health.store(MAX_HEALTH, Ordering::Release);
            debug!(phone = %self.id, "phone infected");
            true
        } else {
            false
        }
    }

    fn transition(&self, from: InfectionState, to: InfectionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Infected -> SeekingRepair. Called by the driver once it holds the
    /// repair ticket.
    pub(crate) fn begin_repair_seek(&self) -> bool {
        self.transition(InfectionState::Infected, InfectionState::SeekingRepair)
    }

    /// SeekingRepair -> Repaired with full health.
    pub(crate) fn complete_repair(&self) -> bool {
        if self.transition(InfectionState::SeekingRepair, InfectionState::Repaired) {
            self.health.store(MAX_HEALTH, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// SeekingRepair -> Infected, used when a repair is interrupted.
    pub(crate) fn abandon_repair(&self) -> bool {
        self.transition(InfectionState::SeekingRepair, InfectionState::Infected)
    }

    /// Loses one point of health, saturating at zero. Returns the new value.
    pub(crate) fn drain_health(&self) -> u32 {
        let previous = self
            .health
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| Some(h.saturating_sub(1)))
            .unwrap_or_else(|h| h);
        previous.saturating_sub(1)
    }

    /// One free-movement step with wall bounce.
    pub(crate) fn bounce_step(&self) {
        let (position, velocity) =
            geometry::bounce(self.position(), self.velocity(), self.bounds());
        self.velocity.store(velocity.pack(), Ordering::Release);
        self.position.store(position.pack(), Ordering::Release);
    }

    /// One step toward `target`. Returns `true` once the phone has arrived.
    pub(crate) fn seek_step(&self, target: Point) -> bool {
        match geometry::approach(self.position(), target, SEEK_SPEED, ARRIVAL_TOLERANCE) {
            Some(next) => {
                self.position.store(next.pack(), Ordering::Release);
                false
            }
            None => true,
        }
    }
}
