//! The published trailing-dose value.
//!
//! One `PublishedValue` is declared at startup and shared by handle between
//! the integration worker (sole writer) and any number of readers and
//! subscribers. The value itself lives in an atomic so reads never block the
//! worker.

use crate::publish::metadata::{AlarmState, PvMetadata};
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A single update delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueUpdate {
    pub name: String,
    pub value: f64,
    /// Monotonic per-value update counter, starting at 1
    pub sequence: u64,
    pub published_at: DateTime<Utc>,
    pub alarm: AlarmState,
}

/// A named, declared, subscribable float value.
#[derive(Debug)]
pub struct PublishedValue {
    name: String,
    metadata: PvMetadata,
    bits: AtomicU64,
    dirty: AtomicBool,
    sequence: AtomicU64,
    subscribers: Mutex<Vec<Sender<ValueUpdate>>>,
}

/// Thread-safe shared handle to a published value.
pub type SharedValue = Arc<PublishedValue>;

impl PublishedValue {
    /// Declare a value with its transport metadata.
    pub fn declare(name: impl Into<String>, metadata: PvMetadata, initial: f64) -> SharedValue {
        let name = name.into();
        tracing::info!(pv = %name, unit = %metadata.unit, prec = metadata.prec, "declared PV");
        Arc::new(Self {
            name,
            metadata,
            bits: AtomicU64::new(initial.to_bits()),
            dirty: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// PV name as declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display and alarm metadata as declared.
    pub fn metadata(&self) -> &PvMetadata {
        &self.metadata
    }

    /// The last value written.
    pub fn get_current(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Replace the value without notifying subscribers yet.
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
        self.dirty.store(true, Ordering::Release);
    }

    /// Push the current value to subscribers if it changed since the last
    /// flush. Returns the number of subscribers notified.
    pub fn flush(&self) -> usize {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return 0;
        }

        let value = self.get_current();
        let update = ValueUpdate {
            name: self.name.clone(),
            value,
            sequence: self.sequence.fetch_add(1, Ordering::AcqRel) + 1,
            published_at: Utc::now(),
            alarm: self.metadata.alarm(value),
        };

        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| tx.send(update.clone()).is_ok());
        subscribers.len()
    }

    /// Replace the value and notify subscribers.
    pub fn publish(&self, value: f64) -> usize {
        self.set(value);
        self.flush()
    }

    /// Register a subscriber. Updates flushed after this call are delivered
    /// on the returned channel; dropping it unsubscribes.
    pub fn subscribe(&self) -> Receiver<ValueUpdate> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    /// Number of updates flushed so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Current value annotated against the alarm thresholds.
    pub fn alarm(&self) -> AlarmState {
        self.metadata.alarm(self.get_current())
    }

    /// Current value rendered with the declared precision.
    pub fn formatted(&self) -> String {
        self.metadata.format_value(self.get_current())
    }
}
