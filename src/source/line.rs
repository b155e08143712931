//! Line-oriented sample source.
//!
//! Reads one sample per line from any buffered reader (a recorded file,
//! stdin, a pipe from a monitoring bridge) on a dedicated producer thread and
//! hands each decoded sample to the subscription callback.

use crate::source::types::DoseSample;
use crate::source::{SampleCallback, SampleSource, SourceError};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A source that replays samples from a line-based reader.
pub struct LineSource {
    reader: Option<Box<dyn BufRead + Send>>,
    running: Arc<AtomicBool>,
    rejected: Arc<AtomicU64>,
    handle: Option<JoinHandle<u64>>,
}

impl LineSource {
    /// Create a source over the given reader. Nothing is read until
    /// [`SampleSource::subscribe`] is called.
    pub fn new<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Some(Box::new(reader)),
            running: Arc::new(AtomicBool::new(false)),
            rejected: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Open a recorded sample file.
    pub fn from_path(path: &std::path::Path) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path)
            .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))?;
        Ok(Self::new(std::io::BufReader::new(file)))
    }

    /// Read from the process's standard input.
    pub fn stdin() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()))
    }

    /// Number of lines that could not be decoded into a sample.
    pub fn rejected_lines(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Block until the reader is exhausted (or stopped) and return the number
    /// of samples delivered to the callback.
    pub fn wait(&mut self) -> u64 {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                tracing::error!("line source thread panicked");
                0
            }),
            None => 0,
        }
    }
}

impl SampleSource for LineSource {
    fn subscribe(
        &mut self,
        source_name: &str,
        mut callback: SampleCallback,
    ) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadySubscribed);
        }
        let reader = self.reader.take().ok_or(SourceError::Exhausted)?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let rejected = self.rejected.clone();
        let name = source_name.to_string();

        let handle = thread::Builder::new()
            .name(format!("source-{name}"))
            .spawn(move || {
                let mut delivered = 0u64;
                for (lineno, line) in reader.lines().enumerate() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::warn!(source = %name, "read failed: {e}");
                            break;
                        }
                    };
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    match DoseSample::parse_line(trimmed) {
                        Ok(sample) => {
                            callback(sample);
                            delivered += 1;
                        }
                        Err(e) => {
                            rejected.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(source = %name, line = lineno + 1, "skipping sample: {e}");
                        }
                    }
                }
                running.store(false, Ordering::SeqCst);
                tracing::info!(source = %name, delivered, "input exhausted");
                delivered
            })
            .map_err(|e| SourceError::Io(e.to_string()))?;

        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
