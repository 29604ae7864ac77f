//! Simulation configuration.
//!
//! Defaults reproduce the classic setup: a 760x720 arena, 35px phones, the
//! repair shop near the bottom centre, an 8 ms step, a 25px infection radius
//! and 1.0-1.5 s repairs. Any field may be overridden from a JSON file;
//! missing fields keep their defaults.

use crate::driver::RepairTime;
use crate::error::SimError;
use crate::geometry::{Bounds, Point};
use crate::repair_shop::RepairShop;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Arena width in pixels
    pub arena_width: i32,

    /// Arena height in pixels
    pub arena_height: i32,

    /// Phone sprite size; phones stay `phone_size` away from the far walls
    pub phone_size: i32,

    /// Top-left corner of the repair shop
    pub repair_shop: Point,

    /// Phones spawned at startup
    pub initial_phones: usize,

    /// Infection radius in pixels
    pub infection_radius: f64,

    /// Pause between two steps of a phone
    pub step_delay_ms: u64,

    /// Minimum repair duration
    pub repair_base_ms: u64,

    /// Random extra repair duration (exclusive upper bound)
    pub repair_jitter_ms: u64,

    /// Infection scan period
    pub scan_interval_ms: u64,

    /// Statistics / reaping period
    pub stats_interval_ms: u64,

    /// History sampling period
    pub history_interval_ms: u64,

    /// Number of history samples kept
    pub history_len: usize,

    /// How long shutdown waits for tasks before aborting them
    pub shutdown_grace_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            arena_width: 760,
            arena_height: 720,
            phone_size: 35,
            repair_shop: Point::new(380, 500),
            initial_phones: 1,
            infection_radius: 25.0,
            step_delay_ms: 8,
            repair_base_ms: 1000,
            repair_jitter_ms: 500,
            scan_interval_ms: 50,
            stats_interval_ms: 100,
            history_interval_ms: 500,
            history_len: 100,
            shutdown_grace_ms: 5000,
        }
    }
}

impl SimulationConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SimError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.phone_size < 0 {
            return Err(SimError::invalid("phone_size must not be negative"));
        }
        if self.arena_width <= self.phone_size || self.arena_height <= self.phone_size {
            return Err(SimError::invalid(format!(
                "arena {}x{} is too small for {}px phones",
                self.arena_width, self.arena_height, self.phone_size
            )));
        }
        self.check_repair_shop(self.bounds())?;
        if !self.infection_radius.is_finite() || self.infection_radius < 0.0 {
            return Err(SimError::invalid(
                "infection_radius must be a finite, non-negative number",
            ));
        }
        for (name, value) in [
            ("step_delay_ms", self.step_delay_ms),
            ("scan_interval_ms", self.scan_interval_ms),
            ("stats_interval_ms", self.stats_interval_ms),
            ("history_interval_ms", self.history_interval_ms),
        ] {
            if value == 0 {
                return Err(SimError::invalid(format!("{name} must be greater than zero")));
            }
        }
        if self.history_len == 0 {
            return Err(SimError::invalid("history_len must be greater than zero"));
        }
        Ok(())
    }

    /// Fails unless the repair shop's target lies inside `bounds`, so a
    /// phone heading for repair never leaves the arena.
    pub fn check_repair_shop(&self, bounds: Bounds) -> Result<(), SimError> {
        match RepairShop::target_for(self.repair_shop) {
            Some(target) if bounds.contains(target) => Ok(()),
            _ => Err(SimError::invalid(format!(
                "repair shop at ({}, {}) is outside the {}x{} phone area",
                self.repair_shop.x, self.repair_shop.y, bounds.max_x, bounds.max_y
            ))),
        }
    }

    /// Area phones move in.
    pub fn bounds(&self) -> Bounds {
        Bounds::for_arena(self.arena_width, self.arena_height, self.phone_size)
    }

    pub fn repair_time(&self) -> RepairTime {
        RepairTime {
            base: Duration::from_millis(self.repair_base_ms),
            jitter: Duration::from_millis(self.repair_jitter_ms),
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn history_interval(&self) -> Duration {
        Duration::from_millis(self.history_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
