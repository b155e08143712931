//! Ingestion queue between subscription callbacks and the worker.
//!
//! Unbounded multi-producer, single-consumer FIFO. Producers never block;
//! the consumer blocks only while the queue is empty. There is no
//! backpressure: a producer that persistently outpaces the worker grows the
//! queue without limit.

use crate::source::{DoseSample, SampleCallback};
use crossbeam_channel::{unbounded, Receiver, RecvError, Sender};

/// An entry in the ingestion queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueueItem {
    Sample(DoseSample),
    /// Sentinel asking the worker to exit once everything ahead of it is
    /// processed.
    Shutdown,
}

/// Create a connected producer/consumer pair.
pub fn ingestion_queue() -> (QueueProducer, QueueConsumer) {
    let (sender, receiver) = unbounded();
    (QueueProducer { sender }, QueueConsumer { receiver })
}

/// Producer half. Cheap to clone; hand one to each subscription.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    sender: Sender<QueueItem>,
}

impl QueueProducer {
    /// Push a sample. Never blocks.
    pub fn enqueue(&self, sample: DoseSample) {
        if self.sender.send(QueueItem::Sample(sample)).is_err() {
            tracing::debug!(timestamp = sample.timestamp, "worker gone, sample dropped");
        }
    }

    /// Queue the shutdown sentinel behind all pending samples.
    pub fn shutdown(&self) {
        let _ = self.sender.send(QueueItem::Shutdown);
    }

    /// Number of items waiting to be processed.
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    /// Whether the worker has caught up.
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// Subscription callback whose only job is to enqueue.
    pub fn callback(&self) -> SampleCallback {
        let producer = self.clone();
        Box::new(move |sample| producer.enqueue(sample))
    }
}

/// Consumer half, owned by the integration worker.
#[derive(Debug)]
pub struct QueueConsumer {
    receiver: Receiver<QueueItem>,
}

impl QueueConsumer {
    /// Block until an item is available.
    ///
    /// Returns `None` once every producer has been dropped and the queue is
    /// drained.
    pub fn dequeue(&self) -> Option<QueueItem> {
        match self.receiver.recv() {
            Ok(item) => Some(item),
            Err(RecvError) => None,
        }
    }

    /// Number of items still waiting behind the current one.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
