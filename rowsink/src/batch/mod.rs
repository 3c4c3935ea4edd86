//! Event accumulation and flushing.
//!
//! The accumulator collects incoming events into an in-memory ordered
//! sequence and dispatches the sequence as a batch when it reaches the
//! configured size threshold or when the periodic flush timer fires. The
//! dispatch queue is a bounded channel whose capacity equals the writer
//! worker count, so a slow store stalls the producer instead of growing
//! memory unboundedly.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::concurrency::shutdown::ShutdownRx;
use crate::concurrency::tracker::InFlightTracker;
use crate::error::{ErrorKind, SinkError, SinkResult};
use crate::sink_error;
use crate::types::{Batch, Event};

/// Collects events and dispatches full batches to the writer workers.
///
/// `emit` may be called concurrently from multiple producer contexts; the
/// buffer's read-modify-write is serialized by an exclusive lock held across
/// the swap and the submit, so the swap-and-submit is a single atomic step
/// and batch dispatch order matches buffer fill order.
pub struct BatchAccumulator {
    buffer: Mutex<Vec<Event>>,
    queue: mpsc::Sender<Batch>,
    bulk_actions: usize,
    tracker: InFlightTracker,
}

impl BatchAccumulator {
    pub fn new(
        queue: mpsc::Sender<Batch>,
        bulk_actions: usize,
        tracker: InFlightTracker,
    ) -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(bulk_actions)),
            queue,
            bulk_actions,
            tracker,
        }
    }

    /// Appends an event to the pending sequence, dispatching the sequence as
    /// a batch once the size threshold is reached.
    ///
    /// Blocks while the dispatch queue is full; this is the system's
    /// backpressure mechanism.
    pub async fn emit(&self, event: Event) -> SinkResult<()> {
        let mut buffer = self.buffer.lock().await;

        buffer.push(event);

        if buffer.len() >= self.bulk_actions {
            self.submit(&mut buffer).await?;
        }

        Ok(())
    }

    /// Dispatches the pending sequence, if any.
    ///
    /// Invoked by the periodic flush timer and by shutdown. Flushing an empty
    /// accumulator is a no-op; empty batches are never enqueued.
    pub async fn flush(&self) -> SinkResult<()> {
        let mut buffer = self.buffer.lock().await;

        if buffer.is_empty() {
            return Ok(());
        }

        self.submit(&mut buffer).await
    }

    /// Swaps the full sequence for a fresh one and hands it to the dispatch
    /// queue. Must be called with the buffer lock held.
    async fn submit(&self, buffer: &mut Vec<Event>) -> SinkResult<()> {
        let batch = mem::replace(buffer, Vec::with_capacity(self.bulk_actions));

        debug!("dispatching batch of {} events", batch.len());
        self.tracker.batch_dispatched();

        if self.queue.send(batch).await.is_err() {
            self.tracker.batch_completed();
            return Err(sink_error!(
                ErrorKind::DispatchQueueClosed,
                "Dispatch queue closed, batch dropped"
            ));
        }

        Ok(())
    }
}

/// Spawns the periodic flush task.
///
/// Flushes the accumulator every `interval` until the shutdown signal fires.
/// The first flush happens one full interval after startup.
pub fn start_flush_timer(
    accumulator: Arc<BatchAccumulator>,
    interval: Duration,
    mut shutdown_rx: ShutdownRx,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = accumulator.flush().await {
                        warn!("periodic flush failed: {err}");
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!("flush timer stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::types::Cell;

    fn event(n: i64) -> Event {
        let mut event = Event::new();
        event.set("n", Cell::I64(n));
        event
    }

    #[tokio::test]
    async fn test_size_based_dispatch() {
        let (tx, mut rx) = mpsc::channel(16);
        let accumulator = BatchAccumulator::new(tx, 3, InFlightTracker::new());

        // 8 events with a threshold of 3 dispatch two full batches, the
        // remainder stays buffered until a flush.
        for n in 0..8 {
            accumulator.emit(event(n)).await.unwrap();
        }

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        assert!(rx.try_recv().is_err());

        accumulator.flush().await.unwrap();
        let last = rx.try_recv().unwrap();
        assert_eq!(last.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_preserves_arrival_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let accumulator = BatchAccumulator::new(tx, 4, InFlightTracker::new());

        for n in 0..4 {
            accumulator.emit(event(n)).await.unwrap();
        }

        let batch = rx.try_recv().unwrap();
        let values: Vec<_> = batch.iter().map(|e| e.get("n").cloned()).collect();
        assert_eq!(
            values,
            (0..4).map(|n| Some(Cell::I64(n))).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_empty_flush_dispatches_nothing() {
        let (tx, mut rx) = mpsc::channel(16);
        let accumulator = BatchAccumulator::new(tx, 3, InFlightTracker::new());

        accumulator.flush().await.unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tracker_counts_dispatches() {
        let (tx, _rx) = mpsc::channel(16);
        let tracker = InFlightTracker::new();
        let accumulator = BatchAccumulator::new(tx, 2, tracker.clone());

        for n in 0..4 {
            accumulator.emit(event(n)).await.unwrap();
        }

        assert_eq!(tracker.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_closed_queue_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let tracker = InFlightTracker::new();
        let accumulator = BatchAccumulator::new(tx, 1, tracker.clone());

        let err = accumulator.emit(event(0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DispatchQueueClosed);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_partial_batch() {
        let (tx, mut rx) = mpsc::channel(16);
        let accumulator = Arc::new(BatchAccumulator::new(tx, 10, InFlightTracker::new()));
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

        let timer = start_flush_timer(
            accumulator.clone(),
            Duration::from_secs(1),
            shutdown_rx,
        );

        for n in 0..5 {
            accumulator.emit(event(n)).await.unwrap();
        }
        assert!(rx.try_recv().is_err());

        // Paused time auto-advances past the flush interval.
        let batch = rx.recv().await.unwrap();
        assert_eq!(batch.len(), 5);

        shutdown_tx.shutdown().unwrap();
        timer.await.unwrap();
    }
}
