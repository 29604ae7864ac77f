//! Common types for the outbreak environment abstraction.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PHONE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identifier for a simulated phone.
///
/// Ids are handed out from a monotonically increasing sequence and are only
/// used for diagnostics (task names, log fields, frame ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhoneId(pub u64);

impl PhoneId {
    /// Allocates the next id in the process-wide sequence.
    pub fn next() -> Self {
        Self(NEXT_PHONE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw sequence number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PhoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Phone-{}", self.0)
    }
}
