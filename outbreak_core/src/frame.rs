//! Read-only views handed to renderers and exporters.

use crate::geometry::Point;
use crate::phone::{InfectionState, Phone};
use crate::stats::Statistics;
use outbreak_env::PhoneId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneView {
    pub id: PhoneId,
    pub position: Point,
    pub state: InfectionState,
    pub health: u32,
}

impl PhoneView {
    pub fn of(phone: &Phone) -> Self {
        Self {
            id: phone.id(),
            position: phone.position(),
            state: phone.state(),
            health: phone.health(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopView {
    pub position: Point,
    pub busy: bool,
}

/// Everything a renderer draws for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Time since the simulation started
    pub elapsed_ms: u64,
    pub paused: bool,
    pub phones: Vec<PhoneView>,
    pub repair_shop: ShopView,
    pub statistics: Statistics,
    /// Sick-count samples, oldest first
    pub history: Vec<usize>,
    /// Phone tasks still running
    #[serde(default)]
    pub live_tasks: usize,
}
