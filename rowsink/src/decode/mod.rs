//! Upstream decoder contract.
//!
//! Decoders turn raw bytes produced by an ingestion source into events. A
//! decoder is infallible from the pipeline's point of view: on a malformed
//! payload it produces a degraded fallback record carrying a timestamp and
//! the raw payload as the message field, so nothing is silently lost.

use chrono::Utc;
use tracing::debug;

use crate::types::{Cell, Event};

/// Field carrying the event timestamp.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Field carrying the raw payload of an undecodable record.
pub const MESSAGE_FIELD: &str = "message";

/// Converts raw bytes into an [`Event`].
pub trait Decoder: Send + Sync {
    /// Decodes a raw record, or produces the fallback record on failure.
    fn decode(&self, raw: &[u8]) -> Event;
}

/// Decodes one JSON object per record.
///
/// Each top-level field is converted through an explicit, statically written
/// value mapping rather than any runtime type inspection: strings, booleans,
/// numbers, and arrays of strings map to their cell shapes; anything nested
/// is carried as its JSON text. A `@timestamp` field is added when the
/// payload does not provide one.
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    pub fn new() -> Self {
        Self
    }

    fn convert(value: serde_json::Value) -> Cell {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::I64(i)
                } else {
                    Cell::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Cell::String(s),
            serde_json::Value::Array(items)
                if items.iter().all(serde_json::Value::is_string) =>
            {
                Cell::Array(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            serde_json::Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => Cell::String(other.to_string()),
        }
    }

    fn fallback(raw: &[u8]) -> Event {
        let mut event = Event::new();
        event.set(TIMESTAMP_FIELD, Cell::TimestampTz(Utc::now()));
        event.set(
            MESSAGE_FIELD,
            Cell::String(String::from_utf8_lossy(raw).into_owned()),
        );
        event
    }
}

impl Decoder for JsonDecoder {
    fn decode(&self, raw: &[u8]) -> Event {
        let parsed: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(raw)
        {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!("decode failed, producing fallback record: {err}");
                return Self::fallback(raw);
            }
        };

        let mut event = Event::new();
        for (name, value) in parsed {
            event.set(name, Self::convert(value));
        }

        if event.get(TIMESTAMP_FIELD).is_none() {
            event.set(TIMESTAMP_FIELD, Cell::TimestampTz(Utc::now()));
        }

        event
    }
}
