use serde::{Deserialize, Serialize};

/// Default number of buffered events that triggers a size-based flush.
const DEFAULT_BULK_ACTIONS: usize = 1000;

/// Default number of seconds between time-based flushes.
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;

/// Batch processing configuration for the sink.
///
/// A batch is dispatched as soon as `bulk_actions` events have accumulated, or
/// after `flush_interval_secs` seconds have passed since the last flush,
/// whichever comes first. The size bound keeps memory and latency low under
/// high load; the time bound keeps latency low under a trickle of events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of events in a single batch.
    #[serde(default = "default_bulk_actions")]
    pub bulk_actions: usize,
    /// Maximum number of seconds a partially filled batch may wait before
    /// being dispatched.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            bulk_actions: DEFAULT_BULK_ACTIONS,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
        }
    }
}

fn default_bulk_actions() -> usize {
    DEFAULT_BULK_ACTIONS
}

fn default_flush_interval_secs() -> u64 {
    DEFAULT_FLUSH_INTERVAL_SECS
}
