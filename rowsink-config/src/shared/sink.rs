use serde::{Deserialize, Serialize};

use crate::shared::{BatchConfig, ValidationError};

/// Default number of writer workers.
const DEFAULT_CONCURRENT: u16 = 1;

/// Strategy used to pick one store endpoint out of the configured list.
///
/// One host is chosen once per process start, for simple load distribution
/// across a fleet of sink processes. The strategy is part of the
/// configuration so tests can pin it down deterministically.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum HostSelection {
    /// Always pick the first configured host.
    First,
    /// Pick a host at random, optionally from a fixed seed.
    Random {
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Default for HostSelection {
    fn default() -> Self {
        Self::Random { seed: None }
    }
}

/// Configuration for a sink pipeline.
///
/// Contains all settings required to run the output stage: the destination
/// table, the store endpoints, the ordered insert field list, batching
/// parameters, and the writer worker count.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Name of the destination table.
    pub table: String,
    /// Store endpoints; one is selected per process start.
    pub hosts: Vec<String>,
    /// Ordered list of fields defining both the insert column order and the
    /// lookup keys into each event.
    pub fields: Vec<String>,
    /// Batch processing configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Number of writer workers running in parallel. Also the capacity of
    /// the dispatch queue sitting between the accumulator and the workers.
    #[serde(default = "default_concurrent")]
    pub concurrent: u16,
    /// Host selection strategy.
    #[serde(default)]
    pub host_selection: HostSelection,
}

impl SinkConfig {
    /// Validates sink configuration settings.
    ///
    /// Checks that the required fields are non-empty and that the batching
    /// and worker parameters are non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table.is_empty() {
            return Err(ValidationError::TableEmpty);
        }

        if self.hosts.is_empty() {
            return Err(ValidationError::HostsEmpty);
        }

        if self.fields.is_empty() {
            return Err(ValidationError::FieldsEmpty);
        }

        if self.batch.bulk_actions == 0 {
            return Err(ValidationError::BulkActionsZero);
        }

        if self.batch.flush_interval_secs == 0 {
            return Err(ValidationError::FlushIntervalZero);
        }

        if self.concurrent == 0 {
            return Err(ValidationError::ConcurrentZero);
        }

        Ok(())
    }
}

fn default_concurrent() -> u16 {
    DEFAULT_CONCURRENT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> SinkConfig {
        serde_json::from_value(value).expect("config should deserialize")
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(serde_json::json!({
            "table": "logs",
            "hosts": ["tcp://127.0.0.1:9000"],
            "fields": ["a", "b"],
        }));

        assert_eq!(config.batch.bulk_actions, 1000);
        assert_eq!(config.batch.flush_interval_secs, 30);
        assert_eq!(config.concurrent, 1);
        assert!(matches!(
            config.host_selection,
            HostSelection::Random { seed: None }
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_required_fields_rejected() {
        let config = parse(serde_json::json!({
            "table": "",
            "hosts": ["tcp://127.0.0.1:9000"],
            "fields": ["a"],
        }));
        assert!(matches!(config.validate(), Err(ValidationError::TableEmpty)));

        let config = parse(serde_json::json!({
            "table": "logs",
            "hosts": [],
            "fields": ["a"],
        }));
        assert!(matches!(config.validate(), Err(ValidationError::HostsEmpty)));

        let config = parse(serde_json::json!({
            "table": "logs",
            "hosts": ["tcp://127.0.0.1:9000"],
            "fields": [],
        }));
        assert!(matches!(
            config.validate(),
            Err(ValidationError::FieldsEmpty)
        ));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = parse(serde_json::json!({
            "table": "logs",
            "hosts": ["tcp://127.0.0.1:9000"],
            "fields": ["a"],
            "batch": { "bulk_actions": 0 },
        }));
        assert!(matches!(
            config.validate(),
            Err(ValidationError::BulkActionsZero)
        ));

        let config = parse(serde_json::json!({
            "table": "logs",
            "hosts": ["tcp://127.0.0.1:9000"],
            "fields": ["a"],
            "concurrent": 0,
        }));
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ConcurrentZero)
        ));
    }

    #[test]
    fn test_host_selection_parsing() {
        let config = parse(serde_json::json!({
            "table": "logs",
            "hosts": ["a", "b"],
            "fields": ["a"],
            "host_selection": { "strategy": "random", "seed": 42 },
        }));
        assert!(matches!(
            config.host_selection,
            HostSelection::Random { seed: Some(42) }
        ));

        let config = parse(serde_json::json!({
            "table": "logs",
            "hosts": ["a", "b"],
            "fields": ["a"],
            "host_selection": { "strategy": "first" },
        }));
        assert!(matches!(config.host_selection, HostSelection::First));
    }
}
