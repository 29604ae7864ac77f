//! Repair Shop - the single-slot resource infected phones compete for.
//!
//! Acquisition is a non-blocking compare-and-swap on the busy flag. A phone
//! that loses the race stays infected and retries on a later step; there is
//! no queue and no fairness beyond "at most one holder".

use crate::geometry::Point;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Offset from the shop's corner to the point phones steer toward.
const TARGET_OFFSET: i32 = 10;

/// The shared repair facility.
#[derive(Debug)]
pub struct RepairShop {
    position: Point,
    busy: AtomicBool,
    acquisitions: AtomicU64,
    releases: AtomicU64,
}

impl RepairShop {
    /// Creates a free shop at `position`.
    pub fn new(position: Point) -> Self {
        Self {
            position,
            busy: AtomicBool::new(false),
            acquisitions: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    /// Creates an Arc-wrapped shop, the form [`try_acquire`](Self::try_acquire) needs.
    pub fn shared(position: Point) -> Arc<Self> {
        Arc::new(Self::new(position))
    }

    /// Top-left corner of the shop.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Point a repair-seeking phone moves toward.
    pub fn target(&self) -> Point {
        Point::new(
            self.position.x.saturating_add(TARGET_OFFSET),
            self.position.y.saturating_add(TARGET_OFFSET),
        )
    }

    /// Target of a shop with its corner at `corner`, or `None` if it
    /// does not fit in `i32`.
    pub fn target_for(corner: Point) -> Option<Point> {
        Some(Point::new(
            corner.x.checked_add(TARGET_OFFSET)?,
            corner.y.checked_add(TARGET_OFFSET)?,
        ))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claims the slot if it is free.
    ///
    /// Returns a ticket that frees the slot when dropped, or `None` if another
    /// phone holds it.
    pub fn try_acquire(self: &Arc<Self>) -> Option<RepairTicket> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        trace!("repair shop acquired");
        Some(RepairTicket {
            shop: Arc::clone(self),
        })
    }

    /// Marks the shop free. Unconditional and idempotent.
    ///
    /// Tickets call this on drop; calling it while a ticket is outstanding
    /// lets a second phone in.
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    /// Number of successful acquisitions so far.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Number of tickets dropped so far.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }
}

/// Proof of holding the repair shop. Dropping it frees the shop exactly once.
#[derive(Debug)]
pub struct RepairTicket {
    shop: Arc<RepairShop>,
}

impl Drop for RepairTicket {
    fn drop(&mut self) {
        self.shop.releases.fetch_add(1, Ordering::Relaxed);
        self.shop.release();
        trace!("repair shop released");
    }
}
