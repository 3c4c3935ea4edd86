//! Common types used throughout the sink.
//!
//! Re-exports the cell value type, the decoded event mapping, and the batch
//! alias used between the accumulator and the writer workers.

mod cell;
mod event;

pub use cell::Cell;
pub use event::{Batch, Event};
