//! Pause barrier and per-phone stop signal.
//!
//! Both are an atomic flag paired with a [`Notify`]. Waiters register
//! interest with `Notified::enable` *before* reading the flag, so a
//! `resume()` or `stop()` that lands between the check and the await is
//! never lost, and every wake-up re-reads the flag before returning.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::debug;

/// Process-wide suspend/resume barrier consulted by every phone each step.
#[derive(Debug, Default)]
pub struct PauseCoordinator {
    /// Whether the simulation is currently paused.
    paused: AtomicBool,

    /// Wakes every phone parked at a checkpoint.
    resumed: Notify,
}

impl PauseCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. Phones finish their current step and park at
    /// the next checkpoint.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        debug!("simulation paused");
    }

    /// Resume the simulation and wake every parked phone.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resumed.notify_waiters();
        debug!("simulation resumed");
    }

    /// Flips the pause state and returns the new value (`true` = paused).
    pub fn toggle(&self) -> bool {
        let was_paused = self.paused.fetch_xor(true, Ordering::AcqRel);
        if was_paused {
            self.resumed.notify_waiters();
            debug!("simulation resumed");
        } else {
            debug!("simulation paused");
        }
        !was_paused
    }

    /// Blocks while paused, returning early once `stop` is raised.
    pub async fn checkpoint(&self, stop: &StopSignal) {
        loop {
            let resumed = self.resumed.notified();
            let halted = stop.wake.notified();
            tokio::pin!(resumed);
            tokio::pin!(halted);
            resumed.as_mut().enable();
            halted.as_mut().enable();

            if !self.is_paused() || !stop.is_running() {
                return;
            }

            tokio::select! {
                _ = &mut resumed => {}
                _ = &mut halted => {}
            }
        }
    }
}

/// Running flag for one task plus the means to wake it from any wait.
#[derive(Debug)]
pub struct StopSignal {
    running: AtomicBool,
    wake: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            wake: Notify::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clears the running flag and wakes the owner wherever it is parked.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Completes once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        loop {
            let halted = self.wake.notified();
            tokio::pin!(halted);
            halted.as_mut().enable();
            if !self.is_running() {
                return;
            }
            halted.await;
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
