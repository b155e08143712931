//! Engine statistics.
//!
//! Lock-free counters the worker bumps as it processes samples. Readers on
//! other threads take a consistent-enough [`EngineStatsSnapshot`] for
//! display or export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for one engine run.
#[derive(Debug)]
pub struct EngineStats {
    /// Samples taken off the ingestion queue
    samples_dequeued: AtomicU64,
    /// Samples that seeded an empty window
    samples_seeded: AtomicU64,
    /// Samples dropped for a non-increasing timestamp
    samples_stale: AtomicU64,
    /// Samples dropped for a non-finite timestamp or rate
    samples_rejected: AtomicU64,
    /// Samples that produced a published update
    samples_integrated: AtomicU64,
    /// Trapezoids subtracted when the window slid
    trapezoids_evicted: AtomicU64,
    /// Current window length (gauge)
    window_len: AtomicU64,
    /// Engine start time
    started: DateTime<Utc>,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            samples_dequeued: AtomicU64::new(0),
            samples_seeded: AtomicU64::new(0),
            samples_stale: AtomicU64::new(0),
            samples_rejected: AtomicU64::new(0),
            samples_integrated: AtomicU64::new(0),
            trapezoids_evicted: AtomicU64::new(0),
            window_len: AtomicU64::new(0),
            started: Utc::now(),
        }
    }

    /// Count a sample taken off the queue.
    pub fn record_dequeued(&self) {
        self.samples_dequeued.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a sample that seeded an empty window.
    pub fn record_seeded(&self) {
        self.samples_seeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a sample dropped as out of order or duplicate.
    pub fn record_stale(&self) {
        self.samples_stale.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a sample dropped for a non-finite field.
    pub fn record_rejected(&self) {
        self.samples_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a published update and the trapezoids it evicted.
    pub fn record_integrated(&self, evicted: usize) {
        self.samples_integrated.fetch_add(1, Ordering::Relaxed);
        self.trapezoids_evicted
            .fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Record the window length after the latest sample.
    pub fn set_window_len(&self, len: usize) {
        self.window_len.store(len as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            samples_dequeued: self.samples_dequeued.load(Ordering::Relaxed),
            samples_seeded: self.samples_seeded.load(Ordering::Relaxed),
            samples_stale: self.samples_stale.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            samples_integrated: self.samples_integrated.load(Ordering::Relaxed),
            trapezoids_evicted: self.trapezoids_evicted.load(Ordering::Relaxed),
            window_len: self.window_len.load(Ordering::Relaxed),
            started: self.started,
            uptime_secs: (Utc::now() - self.started).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary for the end of a run.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Engine Statistics:\n\
             - Samples received: {}\n\
             - Window seeds: {}\n\
             - Stale samples dropped: {}\n\
             - Non-finite samples dropped: {}\n\
             - Updates published: {}\n\
             - Trapezoids evicted: {}\n\
             - Window length: {}\n\
             - Uptime: {} seconds",
            stats.samples_dequeued,
            stats.samples_seeded,
            stats.samples_stale,
            stats.samples_rejected,
            stats.samples_integrated,
            stats.trapezoids_evicted,
            stats.window_len,
            stats.uptime_secs
        )
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatsSnapshot {
    pub samples_dequeued: u64,
    pub samples_seeded: u64,
    pub samples_stale: u64,
    pub samples_rejected: u64,
    pub samples_integrated: u64,
    pub trapezoids_evicted: u64,
    pub window_len: u64,
    pub started: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedStats = Arc<EngineStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(EngineStats::new())
}
