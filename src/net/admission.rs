//! Connection admission control.
//!
//! # Responsibilities
//! - Track active connections against the configured maximum
//! - Grant or deny a connection slot without blocking
//! - Signal interested parties whenever a slot is released
//!
//! # Design Decisions
//! - Reject-on-full: a saturated gate never queues, so shutdown drain time
//!   is bounded by the handlers already running
//! - Slots are handed out as [`SlotPermit`] guards; the counter itself is
//!   never exposed for mutation
//! - One mutex covers the whole check/increment and decrement sequence

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::observability::metrics;

/// Bounded-concurrency gate for accepted connections.
#[derive(Debug)]
pub struct AdmissionGate {
    /// Current number of granted slots. Always `<= max`.
    active: Mutex<usize>,
    /// Configured maximum number of slots.
    max: usize,
    /// Fired on every release.
    released: Notify,
}

impl AdmissionGate {
    /// Create a gate with `max` slots.
    pub fn new(max: usize) -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(0),
            max,
            released: Notify::new(),
        })
    }

    /// Try to take a slot. Never blocks.
    ///
    /// Returns `None` with no side effect when every slot is taken.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotPermit> {
        let mut active = self.lock();
        if *active >= self.max {
            return None;
        }
        *active += 1;
        metrics::set_active_connections(*active);
        drop(active);

        Some(SlotPermit {
            gate: Some(Arc::clone(self)),
        })
    }

    /// Number of slots currently held.
    pub fn active(&self) -> usize {
        *self.lock()
    }

    /// Configured maximum.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Number of slots free right now.
    pub fn available(&self) -> usize {
        self.max - *self.lock()
    }

    /// Wait until the next slot release.
    ///
    /// Only releases that happen after this future is first polled are
    /// observed.
    pub async fn released(&self) {
        self.released.notified().await;
    }

    fn release(&self) {
        let mut active = self.lock();
        assert!(
            *active > 0,
            "admission slot released without a matching acquire"
        );
        *active -= 1;
        metrics::set_active_connections(*active);
        drop(active);

        self.released.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // The guarded section never panics while holding the lock except on
        // the release invariant, which leaves the count untouched.
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A held admission slot.
///
/// The slot is returned to the gate exactly once, when the permit is
/// released or dropped. Dropping also covers a handler that panics.
#[derive(Debug)]
pub struct SlotPermit {
    gate: Option<Arc<AdmissionGate>>,
}

impl SlotPermit {
    /// Return the slot to the gate now.
    pub fn release(mut self) {
        if let Some(gate) = self.gate.take() {
            gate.release();
        }
    }
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.take() {
            gate.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn grants_up_to_max_then_denies() {
        let gate = AdmissionGate::new(2);

        let first = gate.try_acquire();
        let second = gate.try_acquire();
        assert!(first.is_some());
        assert!(second.is_some());
        assert_eq!(gate.active(), 2);

        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.active(), 2, "denied acquire must not change the count");
        assert_eq!(gate.available(), 0);
    }

    #[test]
    fn released_slot_is_reusable() {
        let gate = AdmissionGate::new(1);

        let permit = gate.try_acquire().unwrap();
        assert!(gate.try_acquire().is_none());

        permit.release();
        assert_eq!(gate.active(), 0);

        let again = gate.try_acquire();
        assert!(again.is_some());
        assert_eq!(gate.active(), 1);
    }

    #[test]
    fn drop_releases_exactly_once() {
        let gate = AdmissionGate::new(3);
        {
            let _a = gate.try_acquire().unwrap();
            let _b = gate.try_acquire().unwrap();
            assert_eq!(gate.active(), 2);
        }
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn zero_capacity_denies_everything() {
        let gate = AdmissionGate::new(0);
        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn count_stays_within_bounds_under_contention() {
        let gate = AdmissionGate::new(4);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        if let Some(permit) = gate.try_acquire() {
                            let active = gate.active();
                            assert!(active >= 1 && active <= gate.max());
                            drop(permit);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(gate.active(), 0);
    }

    #[tokio::test]
    async fn release_wakes_waiters() {
        let gate = AdmissionGate::new(1);
        let permit = gate.try_acquire().unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.released().await })
        };
        // Let the waiter register before releasing.
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(permit);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not notified")
            .unwrap();
    }
}
