use std::collections::HashMap;

use crate::types::cell::Cell;

/// A single decoded record represented as a field-name-to-value mapping.
///
/// Events are produced by a decoder and are immutable once handed to the
/// accumulator. Field order is irrelevant; the insert column order is fixed
/// by the configured field list, not by the event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    fields: HashMap<String, Cell>,
}

/// A bounded, ordered group of events submitted together for a single
/// transactional write. Row insertion order within a batch follows arrival
/// order into the accumulator.
pub type Batch = Vec<Event>;

impl Event {
    /// Creates an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field on the event, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Cell) {
        self.fields.insert(name.into(), value);
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.fields.get(name)
    }
}
