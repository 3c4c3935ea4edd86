use serde::{Deserialize, Serialize};

use rowsink_config::shared::SinkConfig;
use rowsink_config::{Config, load_config};

/// Top-level configuration for the sink daemon.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// The sink pipeline configuration.
    pub sink: SinkConfig,
}

impl Config for DaemonConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["sink.hosts", "sink.fields"];
}

/// Loads the daemon configuration from YAML files and environment overrides.
pub fn load_daemon_config() -> Result<DaemonConfig, config::ConfigError> {
    load_config::<DaemonConfig>()
}
