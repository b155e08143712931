//! Core dose-accumulation engine.
//!
//! This module contains:
//! - The ingestion queue between subscription callbacks and the worker
//! - The trailing sample window
//! - Trapezoidal integration and eviction
//! - The integration worker thread

pub mod integrator;
pub mod queue;
pub mod window;
pub mod worker;

// Re-export commonly used types
pub use integrator::{trapezoid, RunningIntegral, SECONDS_PER_HOUR};
pub use queue::{ingestion_queue, QueueConsumer, QueueItem, QueueProducer};
pub use window::{Accept, WindowBuffer, DEFAULT_WINDOW_SECS};
pub use worker::{DoseAccumulator, IntegrationWorker, Step, WorkerError};
