//! Publication side of the dose engine.
//!
//! This module contains:
//! - The shared published value and its subscriber fan-out
//! - PV metadata and alarm annotation
//! - Snapshot reports of the current dose

pub mod metadata;
pub mod snapshot;
pub mod value;

pub use metadata::{AlarmSeverity, AlarmState, AlarmStatus, PvMetadata, PvType};
pub use snapshot::{DoseSnapshot, SnapshotBuilder, WindowSummary, PRODUCER_NAME};
pub use value::{PublishedValue, SharedValue, ValueUpdate};
