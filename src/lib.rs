//! Trailing Dose - sliding-window radiation dose accumulator.
//!
//! This library turns a stream of timestamped dose-rate readings into a live
//! 4-hour trailing dose, integrated with the trapezoidal rule and published
//! as a named, subscribable value.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Trailing Dose                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────────┐    │
//! │  │   Source    │──▶│  Ingestion  │──▶│  Integration worker  │    │
//! │  │ (callback)  │   │    queue    │   │ window + trapezoids  │    │
//! │  └─────────────┘   └─────────────┘   └──────────────────────┘    │
//! │                                                 │                │
//! │                                                 ▼                │
//! │                    ┌─────────────┐      ┌──────────────┐         │
//! │                    │ Subscribers │◀─────│  Published   │         │
//! │                    │             │      │    value     │         │
//! │                    └─────────────┘      └──────────────┘         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use trailing_dose::{Config, Engine, LineSource};
//!
//! let config = Config::default();
//! let engine = Engine::start("RAD:DOSE4H", &config).expect("Failed to start engine");
//!
//! let mut source = LineSource::stdin();
//! engine.attach(&mut source, "RAD:DOSERATE").expect("Failed to subscribe");
//!
//! let updates = engine.value().subscribe();
//! for update in updates.iter().take(10) {
//!     println!("{} = {}", update.name, update.value);
//! }
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod publish;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    trapezoid, DoseAccumulator, IntegrationWorker, Step, WindowBuffer, WorkerError,
};
pub use engine::Engine;
pub use publish::{DoseSnapshot, PublishedValue, PvMetadata, SnapshotBuilder, ValueUpdate};
pub use source::{DoseSample, LineSource, SampleSource, SourceError};
pub use stats::{EngineStats, EngineStatsSnapshot, SharedStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
