//! Concurrency primitives shared across the sink.

pub mod shutdown;
pub mod signal;
pub mod tracker;
