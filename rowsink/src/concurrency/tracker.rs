use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Shared counter of batches dispatched but not yet fully processed.
///
/// Incremented when the accumulator submits a batch to the dispatch queue and
/// decremented when a writer worker finishes processing it, whether the write
/// succeeded or not. The shutdown coordinator waits on this counter to drain
/// before letting the process exit.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    count: Arc<watch::Sender<usize>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Records a batch handed to the dispatch queue.
    pub fn batch_dispatched(&self) {
        self.count.send_modify(|count| *count += 1);
    }

    /// Records a batch fully processed by a writer worker.
    pub fn batch_completed(&self) {
        self.count.send_modify(|count| {
            debug_assert!(*count > 0, "completed more batches than were dispatched");
            *count = count.saturating_sub(1);
        });
    }

    /// Returns the number of batches currently in flight.
    pub fn in_flight(&self) -> usize {
        *self.count.borrow()
    }

    /// Waits until no batches are in flight, bounded by `timeout`.
    ///
    /// Returns `true` if the tracker drained, `false` if the timeout elapsed
    /// first. Best-effort: batches still outstanding when the timeout fires
    /// are abandoned by the caller.
    pub async fn wait_drained(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.drained()).await.is_ok()
    }

    /// Waits until no batches are in flight, without a bound.
    pub async fn drained(&self) {
        let mut rx = self.count.subscribe();
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}
