//! Pipeline assembly and lifecycle.
//!
//! Wires the schema resolver, the accumulator, the bounded dispatch queue,
//! the writer worker pool, and the shutdown coordinator together behind a
//! single handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::batch::{BatchAccumulator, start_flush_timer};
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::concurrency::tracker::InFlightTracker;
use crate::error::SinkResult;
use crate::schema;
use crate::store::StoreClient;
use crate::types::Event;
use crate::workers::{InsertContext, WriterWorkerPool};
use crate::writer::InsertPlan;
use rowsink_config::shared::SinkConfig;

/// A running sink pipeline.
///
/// Events flow in through [`SinkPipeline::emit`] and are committed to the
/// store by the writer workers. [`SinkPipeline::shutdown`] consumes the
/// pipeline, so no events can be emitted after termination begins.
pub struct SinkPipeline {
    accumulator: Arc<BatchAccumulator>,
    tracker: InFlightTracker,
    shutdown_tx: ShutdownTx,
    timer: JoinHandle<()>,
    workers: WriterWorkerPool,
}

impl SinkPipeline {
    /// Starts the pipeline against the given store.
    ///
    /// Validates the configuration, resolves the destination schema, and
    /// spawns the flush timer and the writer workers. Any failure here is
    /// fatal for startup; there is no degraded mode before the schema is
    /// known.
    pub async fn start(config: SinkConfig, store: &dyn StoreClient) -> SinkResult<SinkPipeline> {
        config.validate()?;

        let mut connection = store.connect().await?;
        let resolved = schema::resolve(&mut *connection, &config.table).await?;
        drop(connection);

        info!(
            table = %config.table,
            columns = resolved.columns.len(),
            defaults = resolved.defaults.len(),
            "resolved destination schema"
        );

        let context = Arc::new(InsertContext {
            plan: InsertPlan::new(&config.table, &config.fields),
            defaults: resolved.defaults,
        });

        let tracker = InFlightTracker::new();

        // The dispatch queue capacity equals the worker count: once every
        // worker is busy and the queue is full, `emit` stalls the producer.
        let (queue_tx, queue_rx) = mpsc::channel(config.concurrent as usize);

        let workers = WriterWorkerPool::start(
            store,
            config.concurrent,
            context,
            queue_rx,
            tracker.clone(),
        )
        .await?;

        let accumulator = Arc::new(BatchAccumulator::new(
            queue_tx,
            config.batch.bulk_actions,
            tracker.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let timer = start_flush_timer(
            accumulator.clone(),
            Duration::from_secs(config.batch.flush_interval_secs),
            shutdown_rx,
        );

        Ok(SinkPipeline {
            accumulator,
            tracker,
            shutdown_tx,
            timer,
            workers,
        })
    }

    /// Hands one event to the accumulator.
    ///
    /// Blocks while the dispatch queue is full (backpressure).
    pub async fn emit(&self, event: Event) -> SinkResult<()> {
        self.accumulator.emit(event).await
    }

    /// Gracefully terminates the pipeline.
    ///
    /// Stops the flush timer, forces a final flush of any partial batch, and
    /// waits for in-flight writer work to complete. The whole drain,
    /// including the final flush, is bounded by `timeout`: the call returns
    /// no later than `timeout` after invocation, and batches still
    /// outstanding at that point are abandoned and their events lost. This
    /// is a documented trade-off, not a hidden bug.
    pub async fn shutdown(self, timeout: Duration) -> SinkResult<()> {
        info!("shutting down sink pipeline");

        let SinkPipeline {
            accumulator,
            tracker,
            shutdown_tx,
            timer,
            workers,
        } = self;

        let _ = shutdown_tx.shutdown();

        let observer = tracker.clone();
        let drain = async move {
            if let Err(err) = timer.await {
                warn!("flush timer terminated abnormally: {err}");
            }

            // The final flush can itself block on a full dispatch queue, so
            // it has to run inside the timeout bound.
            let flush_result = accumulator.flush().await;

            // Dropping the accumulator closes the dispatch queue; workers
            // drain what is queued and then exit.
            drop(accumulator);

            tracker.drained().await;
            workers.join().await;

            flush_result
        };

        match tokio::time::timeout(timeout, drain).await {
            Ok(flush_result) => {
                info!("sink pipeline drained");
                flush_result
            }
            Err(_) => {
                warn!(
                    in_flight = observer.in_flight(),
                    "shutdown timeout elapsed before writer work drained"
                );
                Ok(())
            }
        }
    }
}
