//! Configuration management for the rowsink services.
//!
//! Provides environment detection, configuration loading from YAML files with
//! environment variable overrides, and the shared configuration types used by
//! the sink pipeline and the daemon.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
