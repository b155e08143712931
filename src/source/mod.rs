//! Sample sources for the dose engine.
//!
//! A source stands in for the monitoring transport's subscription side: it
//! delivers dose-rate readings of a named input to a callback, on whatever
//! thread it likes. The engine's callback only pushes onto the ingestion
//! queue.

pub mod line;
pub mod types;

pub use line::LineSource;
pub use types::{DoseSample, ParseError};

/// Callback invoked for every sample a source delivers.
pub type SampleCallback = Box<dyn FnMut(DoseSample) + Send + 'static>;

/// Subscription side of the monitoring transport.
pub trait SampleSource {
    /// Start delivering samples of `source_name` to `callback`.
    fn subscribe(&mut self, source_name: &str, callback: SampleCallback)
        -> Result<(), SourceError>;

    /// Stop delivering samples.
    fn stop(&mut self);

    /// Whether the source is still delivering.
    fn is_running(&self) -> bool;
}

/// Errors that can occur while subscribing to a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    AlreadySubscribed,
    Exhausted,
    Io(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::AlreadySubscribed => write!(f, "Source already has a subscriber"),
            SourceError::Exhausted => write!(f, "Source input was already consumed"),
            SourceError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}
