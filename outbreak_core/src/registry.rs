//! Registry of live phones.
//!
//! Backed by a sharded [`DashMap`] so spawns, reaping and scans can run
//! concurrently. Readers never iterate the live map directly: they take a
//! [`snapshot`](Registry::snapshot) of cloned `Arc`s, sorted by id so that a
//! given set of phones is always visited in the same order.

use crate::geometry::Bounds;
use crate::phone::{InfectionState, Phone};
use dashmap::DashMap;
use outbreak_env::PhoneId;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Registry {
    phones: DashMap<PhoneId, Arc<Phone>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a phone. Returns `false` (and leaves the registry unchanged) if a
    /// phone with the same id is already registered.
    pub fn insert(&self, phone: Arc<Phone>) -> bool {
        match self.phones.entry(phone.id()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(phone);
                true
            }
        }
    }

    pub fn get(&self, id: PhoneId) -> Option<Arc<Phone>> {
        self.phones.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, id: PhoneId) -> Option<Arc<Phone>> {
        self.phones.remove(&id).map(|(_, phone)| phone)
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }

    /// Point-in-time copy of the registered phones, ordered by id.
    pub fn snapshot(&self) -> Vec<Arc<Phone>> {
        let mut phones: Vec<Arc<Phone>> = self
            .phones
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        phones.sort_by_key(|phone| phone.id());
        phones
    }

    /// Phones currently in the Healthy state, ordered by id.
    pub fn healthy(&self) -> Vec<Arc<Phone>> {
        let mut phones = self.snapshot();
        phones.retain(|phone| phone.state() == InfectionState::Healthy);
        phones
    }

    /// Removes every phone whose health has reached zero.
    pub fn reap(&self) -> Vec<PhoneId> {
        let mut reaped = Vec::new();
        self.phones.retain(|id, phone| {
            if phone.is_alive() {
                true
            } else {
                reaped.push(*id);
                false
            }
        });
        if !reaped.is_empty() {
            debug!(count = reaped.len(), "reaped dead phones");
        }
        reaped
    }

    /// Re-ranges every registered phone.
    pub fn set_bounds(&self, bounds: Bounds) {
        for entry in self.phones.iter() {
            entry.value().set_bounds(bounds);
        }
    }

    /// Raises the stop signal of every registered phone.
    pub fn stop_all(&self) {
        for entry in self.phones.iter() {
            entry.value().stop();
        }
    }

    pub fn clear(&self) {
        self.phones.clear();
    }
}
