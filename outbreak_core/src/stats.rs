//! Read-only statistics derived from registry snapshots.

use crate::phone::{InfectionState, Phone};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Per-state counts of the live population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub healthy: usize,
    pub infected: usize,
    pub seeking_repair: usize,
    pub repaired: usize,
}

impl Statistics {
    /// Counts phones per state.
    pub fn tally(phones: &[Arc<Phone>]) -> Self {
        phones.iter().fold(Self::default(), |mut stats, phone| {
            stats.total += 1;
            match phone.state() {
                InfectionState::Healthy => stats.healthy += 1,
                InfectionState::Infected => stats.infected += 1,
                InfectionState::SeekingRepair => stats.seeking_repair += 1,
                InfectionState::Repaired => stats.repaired += 1,
            }
            stats
        })
    }

    /// Phones currently carrying the virus, repairing or not.
    pub fn sick(&self) -> usize {
        self.infected + self.seeking_repair
    }

    /// Share of sick phones in percent; 0 for an empty population.
    pub fn infection_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.sick() as f64 * 100.0 / self.total as f64
        }
    }
}

/// Bounded series of sick-count samples, oldest first.
#[derive(Debug)]
pub struct InfectionHistory {
    capacity: usize,
    samples: Mutex<VecDeque<usize>>,
}

impl InfectionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Appends a sample, evicting the oldest once full.
    pub fn record(&self, sample: usize) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.push_back(sample);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
    }

    pub fn samples(&self) -> Vec<usize> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Bounds, Point, Velocity};
    use outbreak_env::PhoneId;

    fn phone(state: InfectionState) -> Arc<Phone> {
        Arc::new(
            Phone::new(PhoneId::next(), Point::new(0, 0), Velocity::new(1, 1), Bounds::new(10, 10))
                .with_condition(state, 400),
        )
    }

    #[test]
    fn test_tally_counts_each_state() {
        let phones = vec![
            phone(InfectionState::Healthy),
            phone(InfectionState::Healthy),
            phone(InfectionState::Infected),
            phone(InfectionState::SeekingRepair),
            phone(InfectionState::Repaired),
        ];
        let stats = Statistics::tally(&phones);
        assert_eq!(
            stats,
            Statistics {
                total: 5,
                healthy: 2,
                infected: 1,
                seeking_repair: 1,
                repaired: 1,
            }
        );
        assert!((stats.infection_rate() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_population_rate_is_zero() {
        assert_eq!(Statistics::default().infection_rate(), 0.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let history = InfectionHistory::new(3);
        for sample in 1..=5 {
            history.record(sample);
        }
        assert_eq!(history.samples(), vec![3, 4, 5]);
    }

    #[test]
    fn test_empty_history_has_no_samples() {
        assert!(InfectionHistory::new(10).samples().is_empty());
    }
}
