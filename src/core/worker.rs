//! Integration worker.
//!
//! A single dedicated thread drains the ingestion queue, maintains the
//! window, and publishes the updated trailing dose after every accepted
//! sample:
//!
//! ```text
//! WAITING ──▶ EVALUATING ──▶ ACCUMULATING ──▶ EVICTING ──▶ PUBLISHING
//!    ▲            │ seed / stale                               │
//!    └────────────┴────────────────────────────────────────────┘
//! ```

use crate::core::integrator::{accumulate, evict, RunningIntegral};
use crate::core::queue::{QueueConsumer, QueueItem};
use crate::core::window::{Accept, WindowBuffer};
use crate::publish::SharedValue;
use crate::source::DoseSample;
use crate::stats::SharedStats;
use std::any::Any;
use std::fmt;
use std::thread::{self, JoinHandle};

/// Result of feeding one sample to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Window was empty; the sample became the first anchor.
    Seeded,
    /// Timestamp not after the newest sample; dropped.
    Stale,
    /// Non-finite timestamp or rate; dropped.
    Rejected,
    /// New total to publish.
    Updated { total: f64, evicted: usize },
}

/// Window plus running total, without any threading.
///
/// The total is seeded from the currently published value on every update,
/// so whatever the transport holds stays authoritative.
#[derive(Debug, Clone)]
pub struct DoseAccumulator {
    window: WindowBuffer,
    integral: RunningIntegral,
    last_written: Option<f64>,
}

impl DoseAccumulator {
    /// Empty accumulator over a trailing span of `span_secs` seconds.
    pub fn new(span_secs: f64) -> Self {
        Self {
            window: WindowBuffer::new(span_secs),
            integral: RunningIntegral::default(),
            last_written: None,
        }
    }

    /// Process one sample given the currently published total.
    pub fn step(&mut self, sample: DoseSample, current: f64) -> Step {
        match self.window.accept(sample) {
            Accept::Seeded => Step::Seeded,
            Accept::Stale => Step::Stale,
            Accept::Rejected => Step::Rejected,
            Accept::Appended => {
                // Keep the compensation term only while nobody else wrote
                // the published value.
                if self.last_written != Some(current) {
                    self.integral = RunningIntegral::new(current);
                }
                accumulate(&self.window, &mut self.integral);
                let evicted = evict(&mut self.window, &mut self.integral);
                let total = self.integral.value();
                self.last_written = Some(total);
                Step::Updated { total, evicted }
            }
        }
    }

    /// Samples currently retained.
    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }
}

/// Why the worker did not hand back its final state.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerError {
    /// The worker thread panicked; carries the panic message when it had one.
    Panicked(String),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Panicked(msg) => write!(f, "integration worker panicked: {msg}"),
        }
    }
}

impl std::error::Error for WorkerError {}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Handle to a running integration worker.
pub struct IntegrationWorker {
    handle: JoinHandle<DoseAccumulator>,
}

impl IntegrationWorker {
    /// Spawn the worker thread.
    pub fn spawn(
        consumer: QueueConsumer,
        value: SharedValue,
        stats: SharedStats,
        span_secs: f64,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("integrate-{}", value.name()))
            .spawn(move || run(consumer, value, stats, span_secs))?;
        Ok(Self { handle })
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to exit and take back its final state.
    pub fn join(self) -> Result<DoseAccumulator, WorkerError> {
        self.handle
            .join()
            .map_err(|payload| WorkerError::Panicked(panic_message(payload.as_ref())))
    }
}

fn run(
    consumer: QueueConsumer,
    value: SharedValue,
    stats: SharedStats,
    span_secs: f64,
) -> DoseAccumulator {
    let mut accumulator = DoseAccumulator::new(span_secs);
    tracing::info!(pv = %value.name(), span_secs, "integration worker started");

    // Blocks here, and only here, while the queue is empty
    while let Some(item) = consumer.dequeue() {
        let sample = match item {
            QueueItem::Sample(sample) => sample,
            QueueItem::Shutdown => {
                tracing::info!(pending = consumer.len(), "shutdown requested");
                break;
            }
        };
        stats.record_dequeued();

        match accumulator.step(sample, value.get_current()) {
            Step::Seeded => {
                stats.record_seeded();
                tracing::debug!(timestamp = sample.timestamp, "window seeded");
            }
            Step::Stale => {
                stats.record_stale();
                tracing::trace!(timestamp = sample.timestamp, "dropping stale sample");
            }
            Step::Rejected => {
                stats.record_rejected();
                tracing::warn!(
                    timestamp = sample.timestamp,
                    value = sample.value,
                    "dropping non-finite sample"
                );
            }
            Step::Updated { total, evicted } => {
                stats.record_integrated(evicted);
                value.publish(total);
                tracing::debug!(
                    timestamp = sample.timestamp,
                    total,
                    evicted,
                    window = accumulator.window().len(),
                    "published"
                );
            }
        }
        stats.set_window_len(accumulator.window().len());
    }

    tracing::info!(window = accumulator.window().len(), "integration worker stopped");
    accumulator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue::ingestion_queue;
    use crate::publish::{PublishedValue, PvMetadata};
    use crate::stats::create_shared_stats;

    fn feed(acc: &mut DoseAccumulator, total: &mut f64, t: f64, v: f64) -> Step {
        let step = acc.step(DoseSample::new(t, v), *total);
        if let Step::Updated { total: new, .. } = step {
            *total = new;
        }
        step
    }

    #[test]
    fn test_seed_does_not_change_total() {
        let mut acc = DoseAccumulator::new(14_400.0);
        assert_eq!(acc.step(DoseSample::new(0.0, 5.0), 0.7), Step::Seeded);
        assert_eq!(acc.window().len(), 1);
    }

    #[test]
    fn test_stale_sample_between_updates() {
        let mut acc = DoseAccumulator::new(14_400.0);
        let mut total = 0.0;
        assert_eq!(feed(&mut acc, &mut total, 10.0, 1.0), Step::Seeded);
        assert_eq!(feed(&mut acc, &mut total, 5.0, 100.0), Step::Stale);
        assert!(matches!(feed(&mut acc, &mut total, 20.0, 1.0), Step::Updated { .. }));
        assert!((total - 10.0 / 3600.0).abs() < 1e-15);
    }

    #[test]
    fn test_external_write_reseeds_total() {
        let mut acc = DoseAccumulator::new(14_400.0);
        let mut total = 0.0;
        feed(&mut acc, &mut total, 0.0, 1.0);
        feed(&mut acc, &mut total, 3600.0, 1.0);
        assert_eq!(total, 1.0);

        // Someone else overwrote the published value
        let step = acc.step(DoseSample::new(7200.0, 1.0), 10.0);
        assert_eq!(step, Step::Updated { total: 11.0, evicted: 0 });
    }

    #[test]
    fn test_non_finite_samples_never_reach_total() {
        let mut acc = DoseAccumulator::new(14_400.0);
        let mut total = 0.0;
        assert_eq!(feed(&mut acc, &mut total, f64::NAN, 1.0), Step::Rejected);
        assert_eq!(feed(&mut acc, &mut total, 10.0, 1.0), Step::Seeded);
        assert_eq!(feed(&mut acc, &mut total, 20.0, f64::NAN), Step::Rejected);
        assert_eq!(feed(&mut acc, &mut total, f64::INFINITY, 1.0), Step::Rejected);
        assert!(matches!(feed(&mut acc, &mut total, 3610.0, 1.0), Step::Updated { .. }));
        assert_eq!(acc.window().len(), 2);
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_join_reports_worker_panic() {
        let worker = IntegrationWorker {
            handle: thread::spawn(|| -> DoseAccumulator {
                panic!("integrator invoked with 1 sample(s) in window")
            }),
        };
        let err = worker.join().unwrap_err();
        assert_eq!(
            err,
            WorkerError::Panicked("integrator invoked with 1 sample(s) in window".to_string())
        );
        assert!(err.to_string().starts_with("integration worker panicked"));
    }

    #[test]
    fn test_worker_publishes_and_stops() {
        let (producer, consumer) = ingestion_queue();
        let value = PublishedValue::declare("TEST:DOSE", PvMetadata::default(), 0.0);
        let stats = create_shared_stats();
        let updates = value.subscribe();

        let worker =
            IntegrationWorker::spawn(consumer, value.clone(), stats.clone(), 14_400.0).unwrap();
        producer.enqueue(DoseSample::new(0.0, 2.0));
        producer.enqueue(DoseSample::new(3600.0, 4.0));
        producer.shutdown();
        // Queued after the sentinel; never processed
        producer.enqueue(DoseSample::new(7200.0, 4.0));

        let acc = worker.join().unwrap();
        assert_eq!(acc.window().len(), 2);
        assert_eq!(value.get_current(), 3.0);

        let update = updates.try_recv().unwrap();
        assert_eq!(update.value, 3.0);
        assert!(updates.try_recv().is_err());

        let snap = stats.stats();
        assert_eq!(snap.samples_dequeued, 2);
        assert_eq!(snap.samples_seeded, 1);
        assert_eq!(snap.samples_integrated, 1);
    }
}
