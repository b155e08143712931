//! Dose snapshot builder.
//!
//! A snapshot is a self-describing JSON report of the published trailing
//! dose together with the window it was computed from. It is written at the
//! end of a run and by the `integrate` command; it is never read back.

use crate::core::window::WindowBuffer;
use crate::publish::metadata::AlarmState;
use crate::publish::value::PublishedValue;
use crate::stats::EngineStatsSnapshot;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of this producer.
pub const PRODUCER_NAME: &str = "trailing-dose";

/// Who computed the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Shape of the window at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_timestamp: Option<f64>,
    /// Left anchor read as Unix time, when it is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_utc: Option<String>,
    /// Time covered by the retained samples, left anchor included
    pub covered_secs: f64,
    pub span_limit_secs: f64,
}

impl From<&WindowBuffer> for WindowSummary {
    fn from(window: &WindowBuffer) -> Self {
        Self {
            samples: window.len(),
            oldest_timestamp: window.first().map(|s| s.timestamp),
            newest_timestamp: window.last().map(|s| s.timestamp),
            oldest_utc: window
                .first()
                .and_then(|s| s.timestamp_utc())
                .map(|t| t.to_rfc3339()),
            newest_utc: window
                .last()
                .and_then(|s| s.timestamp_utc())
                .map(|t| t.to_rfc3339()),
            covered_secs: window.covered_secs(),
            span_limit_secs: window.span_limit_secs(),
        }
    }
}

/// Report of the trailing dose at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseSnapshot {
    pub producer: SnapshotProducer,
    pub pv: String,
    pub value: f64,
    pub formatted: String,
    pub unit: String,
    pub alarm: AlarmState,
    pub updates_published: u64,
    pub window: WindowSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<EngineStatsSnapshot>,
    pub computed_at_utc: String,
}

/// Builds snapshots stamped with a per-process instance id.
pub struct SnapshotBuilder {
    instance_id: String,
    host: Option<String>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok());
        Self {
            instance_id: Uuid::new_v4().to_string(),
            host,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn build(
        &self,
        value: &PublishedValue,
        window: &WindowBuffer,
        stats: Option<EngineStatsSnapshot>,
    ) -> DoseSnapshot {
        let current = value.get_current();
        DoseSnapshot {
            producer: SnapshotProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.clone(),
                host: self.host.clone(),
            },
            pv: value.name().to_string(),
            value: current,
            formatted: value.metadata().format_value(current),
            unit: value.metadata().unit.clone(),
            alarm: value.metadata().alarm(current),
            updates_published: value.sequence(),
            window: WindowSummary::from(window),
            stats,
            computed_at_utc: Utc::now().to_rfc3339(),
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
