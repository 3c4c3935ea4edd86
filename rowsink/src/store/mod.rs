//! Store access for the sink.
//!
//! The sink talks to the destination store through the narrow contract in
//! [`base`]: schema introspection plus transactions with prepared
//! parameterized inserts. [`postgres`] is the production implementation;
//! [`memory`] is a scriptable in-memory implementation used by the test
//! suite.

mod base;
pub mod hosts;
pub mod memory;
pub mod postgres;

pub use base::{StoreClient, StoreConnection, StoreTransaction};
