//! Batching output stage for a log/event-processing pipeline.
//!
//! Accepts a continuous stream of decoded events, buffers them into bounded
//! batches, and delivers each batch to a columnar store inside a transaction.
//! The crate covers the accumulator, the bounded dispatch queue, the writer
//! worker pool, schema adaptation, and the shutdown coordinator.

pub mod batch;
pub mod concurrency;
pub mod decode;
pub mod error;
mod macros;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod types;
pub mod workers;
pub mod writer;
