//! Per-tick telemetry batches and the sinks they are published to.
//!
//! Components, systems and the dispatcher add readings to one
//! [`TelemetryBatch`] during a tick; the orchestrator publishes it to its
//! [`TelemetrySink`] at the end of the tick and starts a fresh one.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use torque_types::TelemetryValue;
use tracing::debug;

/// Readings collected during one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryBatch {
    pub tick: u64,
    pub captured_at: DateTime<Utc>,
    pub entries: BTreeMap<String, TelemetryValue>,
}

impl TelemetryBatch {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            captured_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// Add or overwrite one reading.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<TelemetryValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Add every reading under `prefix.`.
    pub fn add_prefixed<I>(&mut self, prefix: &str, readings: I)
    where
        I: IntoIterator<Item = (String, TelemetryValue)>,
    {
        for (key, value) in readings {
            self.entries.insert(format!("{prefix}.{key}"), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Destination for published batches (driver-station display, log, file …).
pub trait TelemetrySink {
    fn publish(&mut self, batch: &TelemetryBatch);
}

/// Forwards each batch to `tracing` at debug level as a JSON payload.
#[derive(Debug, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn publish(&mut self, batch: &TelemetryBatch) {
        let payload = serde_json::to_string(&batch.entries).unwrap_or_default();
        debug!(
            tick = batch.tick,
            captured_at = %batch.captured_at.to_rfc3339(),
            entries = batch.len(),
            %payload,
            "telemetry"
        );
    }
}

/// Keeps every published batch.  Clones share the same buffer so a test can
/// hand one to the orchestrator and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Rc<RefCell<Vec<TelemetryBatch>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<TelemetryBatch> {
        self.batches.borrow().clone()
    }

    pub fn last(&self) -> Option<TelemetryBatch> {
        self.batches.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.batches.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.borrow().is_empty()
    }
}

impl TelemetrySink for MemorySink {
    fn publish(&mut self, batch: &TelemetryBatch) {
        self.batches.borrow_mut().push(batch.clone());
    }
}
