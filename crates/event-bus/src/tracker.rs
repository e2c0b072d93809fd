//! In-flight accounting backing [`EventBus::drain`](crate::EventBus::drain).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counts pending hand-offs and running handler tasks.
#[derive(Debug, Default)]
pub(crate) struct Tracker {
    in_flight: AtomicUsize,
    spawned: AtomicU64,
    idle: Notify,
}

impl Tracker {
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    pub(crate) fn record_spawn(&self) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
    }

    /// Resolves once the in-flight count reaches zero.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before reading the counter so a concurrent release
            // cannot slip between the check and the wait.
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Holds one unit of the in-flight count until dropped.
///
/// Dropping on unwind keeps the count correct when a handler panics.
#[derive(Debug)]
pub(crate) struct InFlight {
    tracker: Arc<Tracker>,
}

impl InFlight {
    pub(crate) fn enter(tracker: &Arc<Tracker>) -> Self {
        tracker.in_flight.fetch_add(1, Ordering::AcqRel);
        Self {
            tracker: Arc::clone(tracker),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.tracker.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}
