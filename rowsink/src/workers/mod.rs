//! Writer worker pool.
//!
//! A fixed number of workers pull batches from the bounded dispatch queue and
//! deliver each one to the store through [`crate::writer::write_batch`]. Once
//! a worker takes a batch, it is attempted to completion and never
//! re-enqueued: a failed batch is logged and dropped.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::concurrency::tracker::InFlightTracker;
use crate::error::SinkResult;
use crate::schema::DefaultValueTable;
use crate::store::{StoreClient, StoreConnection};
use crate::types::Batch;
use crate::writer::{InsertPlan, write_batch};

/// Immutable state shared by every writer worker.
///
/// Built once at pipeline startup; workers read it without synchronization.
#[derive(Debug)]
pub struct InsertContext {
    pub plan: InsertPlan,
    pub defaults: DefaultValueTable,
}

/// A fixed-size pool of writer workers.
pub struct WriterWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WriterWorkerPool {
    /// Starts `concurrent` workers, each with its own store connection,
    /// sharing the dispatch queue receiver.
    pub async fn start(
        store: &dyn StoreClient,
        concurrent: u16,
        context: Arc<InsertContext>,
        queue: mpsc::Receiver<Batch>,
        tracker: InFlightTracker,
    ) -> SinkResult<Self> {
        let queue = Arc::new(Mutex::new(queue));

        let mut handles = Vec::with_capacity(concurrent as usize);
        for worker_id in 0..concurrent {
            let connection = store.connect().await?;
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                connection,
                context.clone(),
                queue.clone(),
                tracker.clone(),
            )));
        }

        Ok(Self { handles })
    }

    /// Waits for every worker to exit.
    ///
    /// Workers exit once the dispatch queue is closed and drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!("writer worker terminated abnormally: {err}");
            }
        }
    }
}

/// A single worker: take a batch, execute it, repeat.
async fn worker_loop(
    worker_id: u16,
    mut connection: Box<dyn StoreConnection>,
    context: Arc<InsertContext>,
    queue: Arc<Mutex<mpsc::Receiver<Batch>>>,
    tracker: InFlightTracker,
) {
    debug!("writer worker {worker_id} started");

    loop {
        // The lock is held only while waiting for a batch so other workers
        // can take the next one while this batch is being written.
        let batch = { queue.lock().await.recv().await };

        let Some(batch) = batch else {
            break;
        };

        if let Err(err) = write_batch(&mut *connection, &context.plan, &context.defaults, &batch)
            .await
        {
            warn!("dropping batch of {} events: {err}", batch.len());
        }

        tracker.batch_completed();
    }

    debug!("writer worker {worker_id} exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDescriptor, ColumnType};
    use crate::store::memory::MemoryStore;
    use crate::types::{Cell, Event};
    use std::time::Duration;

    fn context() -> Arc<InsertContext> {
        Arc::new(InsertContext {
            plan: InsertPlan::new("logs", &["n".to_string()]),
            defaults: DefaultValueTable::default(),
        })
    }

    fn batch(values: std::ops::Range<i64>) -> Batch {
        values
            .map(|n| {
                let mut event = Event::new();
                event.set("n", Cell::I64(n));
                event
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pool_drains_queue_and_exits() {
        let store = MemoryStore::new(vec![ColumnDescriptor::new("n", ColumnType::Integer)]);
        let tracker = InFlightTracker::new();
        let (tx, rx) = mpsc::channel(4);

        let pool = WriterWorkerPool::start(&store, 2, context(), rx, tracker.clone())
            .await
            .unwrap();

        for start in [0, 10, 20] {
            tracker.batch_dispatched();
            tx.send(batch(start..start + 2)).await.unwrap();
        }
        drop(tx);

        pool.join().await;

        assert_eq!(store.committed_batches().await.len(), 3);
        assert_eq!(store.committed_rows().await.len(), 6);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_is_dropped_not_requeued() {
        let store = MemoryStore::new(vec![ColumnDescriptor::new("n", ColumnType::Integer)]);
        store.fail_commit(true).await;
        let tracker = InFlightTracker::new();
        let (tx, rx) = mpsc::channel(4);

        let pool = WriterWorkerPool::start(&store, 1, context(), rx, tracker.clone())
            .await
            .unwrap();

        tracker.batch_dispatched();
        tx.send(batch(0..3)).await.unwrap();
        drop(tx);

        pool.join().await;

        // The batch was attempted once, failed, and was not re-enqueued; the
        // tracker still drains.
        assert!(store.committed_rows().await.is_empty());
        assert!(tracker.wait_drained(Duration::from_millis(10)).await);
    }
}
