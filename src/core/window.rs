//! Trailing window of dose-rate samples.
//!
//! The buffer holds exactly the samples whose consecutive pairs still
//! contribute to the published integral, in strictly increasing timestamp
//! order. It is owned by the integration worker and never shared.

use crate::source::DoseSample;
use std::collections::VecDeque;

/// Default trailing span: 4 hours.
pub const DEFAULT_WINDOW_SECS: f64 = 14_400.0;

/// Outcome of offering a sample to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// First sample into an empty window; nothing to integrate yet.
    Seeded,
    /// Timestamp not after the newest sample; dropped.
    Stale,
    /// Non-finite timestamp or rate; dropped.
    Rejected,
    /// Appended; a new trapezoid is available.
    Appended,
}

/// Ordered sample buffer with a trailing span.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    samples: VecDeque<DoseSample>,
    span_secs: f64,
}

impl WindowBuffer {
    /// Create an empty window spanning `span_secs` seconds.
    pub fn new(span_secs: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            span_secs,
        }
    }

    /// Offer a sample to the window.
    pub fn accept(&mut self, sample: DoseSample) -> Accept {
        if !sample.timestamp.is_finite() || !sample.value.is_finite() {
            return Accept::Rejected;
        }
        match self.samples.back() {
            None => {
                self.samples.push_back(sample);
                Accept::Seeded
            }
            Some(last) if sample.timestamp > last.timestamp => {
                self.samples.push_back(sample);
                Accept::Appended
            }
            Some(_) => Accept::Stale,
        }
    }

    /// Whether the newest sample lies more than the span past the
    /// second-oldest one.
    pub fn exceeds_span(&self) -> bool {
        match (self.samples.back(), self.samples.get(1)) {
            (Some(last), Some(second)) => last.timestamp - second.timestamp > self.span_secs,
            _ => false,
        }
    }

    pub(crate) fn newest_pair(&self) -> (&DoseSample, &DoseSample) {
        let n = self.samples.len();
        (&self.samples[n - 2], &self.samples[n - 1])
    }

    pub(crate) fn oldest_pair(&self) -> (&DoseSample, &DoseSample) {
        (&self.samples[0], &self.samples[1])
    }

    pub(crate) fn pop_oldest(&mut self) -> Option<DoseSample> {
        self.samples.pop_front()
    }

    /// Number of retained samples, left anchor included.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest retained sample (the left anchor).
    pub fn first(&self) -> Option<&DoseSample> {
        self.samples.front()
    }

    /// Newest accepted sample.
    pub fn last(&self) -> Option<&DoseSample> {
        self.samples.back()
    }

    /// Configured trailing span in seconds.
    pub fn span_limit_secs(&self) -> f64 {
        self.span_secs
    }

    /// Time covered by the retained samples, anchor included.
    pub fn covered_secs(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS)
    }
}
