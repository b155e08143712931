//! Wiring of queue, worker, and published value into one running engine.

use crate::config::Config;
use crate::core::{ingestion_queue, DoseAccumulator, IntegrationWorker, QueueProducer, WorkerError};
use crate::publish::{PublishedValue, SharedValue};
use crate::source::{SampleSource, SourceError};
use crate::stats::{create_shared_stats, SharedStats};

/// A running dose engine for one input/output PV pair.
pub struct Engine {
    producer: QueueProducer,
    worker: IntegrationWorker,
    value: SharedValue,
    stats: SharedStats,
}

impl Engine {
    /// Declare the output PV and start the integration worker.
    pub fn start(output_name: &str, config: &Config) -> std::io::Result<Self> {
        let value = PublishedValue::declare(
            output_name,
            config.metadata.clone(),
            config.initial_value,
        );
        let stats = create_shared_stats();
        let (producer, consumer) = ingestion_queue();
        let worker = IntegrationWorker::spawn(
            consumer,
            value.clone(),
            stats.clone(),
            config.window_duration.as_secs_f64(),
        )?;

        Ok(Self {
            producer,
            worker,
            value,
            stats,
        })
    }

    /// Subscribe the engine to a named input on `source`.
    pub fn attach<S: SampleSource + ?Sized>(
        &self,
        source: &mut S,
        input_name: &str,
    ) -> Result<(), SourceError> {
        tracing::info!(input = input_name, output = %self.value.name(), "subscribing");
        source.subscribe(input_name, self.producer.callback())
    }

    /// Enqueue handle for feeding samples directly.
    pub fn producer(&self) -> &QueueProducer {
        &self.producer
    }

    pub fn value(&self) -> &SharedValue {
        &self.value
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Drain everything already queued, stop the worker, and return its
    /// final window.
    pub fn shutdown(self) -> Result<DoseAccumulator, WorkerError> {
        self.producer.shutdown();
        self.worker.join()
    }
}
