//! Infection Scanner - proximity-based spread between phones.
//!
//! A scan captures `(position, state)` for every phone in a snapshot once,
//! decides the victims from that captured view alone, and only then applies
//! the infections. Infections made during a scan therefore never spread
//! further within the same scan, and the outcome depends only on the
//! captured view, not on the order pairs are visited.
//!
//! Only `Infected` phones transmit. Phones on their way to the shop and
//! repaired phones never infect anyone.

use crate::geometry::Point;
use crate::phone::{InfectionState, Phone};
use outbreak_env::PhoneId;
use std::sync::Arc;
use tracing::debug;

/// Default infection radius.
pub const DEFAULT_INFECTION_RADIUS: f64 = 25.0;

/// What a scan sees of one phone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub id: PhoneId,
    pub position: Point,
    pub state: InfectionState,
    pub alive: bool,
}

impl Sighting {
    pub fn of(phone: &Phone) -> Self {
        Self {
            id: phone.id(),
            position: phone.position(),
            state: phone.state(),
            alive: phone.is_alive(),
        }
    }

    fn transmits(&self) -> bool {
        self.alive && self.state == InfectionState::Infected
    }

    fn susceptible(&self) -> bool {
        self.state == InfectionState::Healthy
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfectionScanner {
    radius: f64,
}

impl InfectionScanner {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Indices of the sightings that should become infected.
    ///
    /// Every unordered pair with one transmitting and one susceptible member
    /// closer than the radius marks the susceptible one. Returned indices are
    /// ascending and unique.
    pub fn victims(&self, sightings: &[Sighting]) -> Vec<usize> {
        let mut marked = vec![false; sightings.len()];
        for (i, a) in sightings.iter().enumerate() {
            for (j, b) in sightings.iter().enumerate().skip(i + 1) {
                let victim = if a.transmits() && b.susceptible() {
                    j
                } else if b.transmits() && a.susceptible() {
                    i
                } else {
                    continue;
                };
                if !marked[victim] && a.position.distance(&b.position) < self.radius {
                    marked[victim] = true;
                }
            }
        }
        marked
            .iter()
            .enumerate()
            .filter_map(|(idx, hit)| hit.then_some(idx))
            .collect()
    }

    /// Runs one scan over `phones` and returns the ids this scan infected.
    ///
    /// A phone that was infected concurrently by someone else between the
    /// capture and the apply is not reported.
    pub fn scan(&self, phones: &[Arc<Phone>]) -> Vec<PhoneId> {
        let sightings: Vec<Sighting> = phones.iter().map(|p| Sighting::of(p)).collect();
        let infected: Vec<PhoneId> = self
            .victims(&sightings)
            .into_iter()
            .filter(|&idx| phones[idx].infect())
            .map(|idx| phones[idx].id())
            .collect();
        if !infected.is_empty() {
            debug!(count = infected.len(), population = phones.len(), "infection spread");
        }
        infected
    }
}

impl Default for InfectionScanner {
    fn default() -> Self {
        Self::new(DEFAULT_INFECTION_RADIUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Bounds, Velocity};
    use crate::phone::MAX_HEALTH;

    fn phone_at(x: i32, y: i32, state: InfectionState, health: u32) -> Arc<Phone> {
        Arc::new(
            Phone::new(
                PhoneId::next(),
                Point::new(x, y),
                Velocity::new(1, 1),
                Bounds::new(725, 685),
            )
                .with_condition(state, health),
        )
    }

    #[test]
    fn test_close_healthy_phone_gets_infected() {
        let carrier = phone_at(100, 100, InfectionState::Infected, 320);
        let target = phone_at(110, 100, InfectionState::Healthy, MAX_HEALTH);
        let scanner = InfectionScanner::new(25.0);

        let infected = scanner.scan(&[Arc::clone(&carrier), Arc::clone(&target)]);

        assert_eq!(infected, vec![target.id()]);
        assert_eq!(target.state(), InfectionState::Infected);
        assert_eq!(target.health(), MAX_HEALTH);
        // The carrier is untouched
        assert_eq!(carrier.health(), 320);
    }

    #[test]
    fn test_pair_order_does_not_matter() {
        let target = phone_at(110, 100, InfectionState::Healthy, MAX_HEALTH);
        let carrier = phone_at(100, 100, InfectionState::Infected, 400);
        let infected = InfectionScanner::default().scan(&[Arc::clone(&target), carrier]);
        assert_eq!(infected, vec![target.id()]);
    }

    #[test]
    fn test_out_of_range_is_safe() {
        let carrier = phone_at(100, 100, InfectionState::Infected, 400);
        let target = phone_at(125, 100, InfectionState::Healthy, MAX_HEALTH);
        assert!(InfectionScanner::default().scan(&[carrier, Arc::clone(&target)]).is_empty());
        assert_eq!(target.state(), InfectionState::Healthy);
    }

    #[test]
    fn test_repairing_and_repaired_phones_do_not_transmit() {
        let seeking = phone_at(100, 100, InfectionState::SeekingRepair, 250);
        let repaired = phone_at(100, 105, InfectionState::Repaired, MAX_HEALTH);
        let target = phone_at(105, 100, InfectionState::Healthy, MAX_HEALTH);
        assert!(InfectionScanner::default()
            .scan(&[seeking, repaired, Arc::clone(&target)])
            .is_empty());
        assert_eq!(target.state(), InfectionState::Healthy);
    }

    #[test]
    fn test_repaired_phone_is_not_a_victim() {
        let carrier = phone_at(100, 100, InfectionState::Infected, 400);
        let repaired = phone_at(101, 100, InfectionState::Repaired, MAX_HEALTH);
        assert!(InfectionScanner::default().scan(&[carrier, Arc::clone(&repaired)]).is_empty());
        assert_eq!(repaired.state(), InfectionState::Repaired);
    }

    #[test]
    fn test_no_chain_spread_within_one_scan() {
        // carrier -> a is in range, a -> b is in range, carrier -> b is not
        let carrier = phone_at(0, 0, InfectionState::Infected, 400);
        let a = phone_at(20, 0, InfectionState::Healthy, MAX_HEALTH);
        let b = phone_at(40, 0, InfectionState::Healthy, MAX_HEALTH);
        let scanner = InfectionScanner::default();
        let phones = vec![carrier, Arc::clone(&a), Arc::clone(&b)];

        assert_eq!(scanner.scan(&phones), vec![a.id()]);
        assert_eq!(b.state(), InfectionState::Healthy);
        // The next scan picks it up
        assert_eq!(scanner.scan(&phones), vec![b.id()]);
    }

    #[test]
    fn test_victims_are_deterministic_per_view() {
        let sightings: Vec<Sighting> = [
            (0, 0, InfectionState::Infected),
            (10, 0, InfectionState::Healthy),
            (0, 10, InfectionState::Healthy),
            (200, 200, InfectionState::Healthy),
            (210, 200, InfectionState::Infected),
        ]
        .iter()
        .map(|&(x, y, state)| Sighting {
            id: PhoneId::next(),
            position: Point::new(x, y),
            state,
            alive: true,
        })
        .collect();
        let scanner = InfectionScanner::default();

        let first = scanner.victims(&sightings);
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(scanner.victims(&sightings), first);
    }

    #[test]
    fn test_dead_carrier_does_not_transmit() {
        let carrier = phone_at(100, 100, InfectionState::Infected, 0);
        let target = phone_at(101, 100, InfectionState::Healthy, MAX_HEALTH);
        assert!(InfectionScanner::default().scan(&[carrier, target]).is_empty());
    }
}
