use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Destination table name cannot be empty.
    #[error("`table` cannot be empty")]
    TableEmpty,
    /// At least one store endpoint must be configured.
    #[error("`hosts` cannot be empty")]
    HostsEmpty,
    /// The ordered field list cannot be empty.
    #[error("`fields` cannot be empty")]
    FieldsEmpty,
    /// Size-based flush threshold cannot be zero.
    #[error("`bulk_actions` cannot be zero")]
    BulkActionsZero,
    /// Time-based flush period cannot be zero.
    #[error("`flush_interval_secs` cannot be zero")]
    FlushIntervalZero,
    /// Writer worker count cannot be zero.
    #[error("`concurrent` cannot be zero")]
    ConcurrentZero,
}
