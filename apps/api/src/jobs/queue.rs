use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::{JobMessage, QueueName};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Message encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A message claimed by a worker. The raw wire form is kept so that the
/// exact entry can be removed from the processing list on ack.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub queue: QueueName,
    pub message: JobMessage,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NackOutcome {
    /// Put back on the ready list with an incremented attempt count.
    Requeued { attempts: u32 },
    /// Attempts exhausted; moved to the queue's dead-letter list.
    DeadLettered,
}

/// A durable FIFO queue per job type with lease-based claiming.
///
/// Delivery is at-least-once: a claimed message is hidden from other workers
/// until it is acked, nacked, or its lease expires. Consumers must make their
/// writes idempotent.
///
/// Carried as `Arc<dyn JobQueue>` by both the API and the worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError>;

    /// Waits up to `wait` for a message. Returns `Ok(None)` on timeout.
    async fn claim(&self, queue: QueueName, wait: Duration)
        -> Result<Option<Delivery>, QueueError>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;

    async fn nack(&self, delivery: &Delivery) -> Result<NackOutcome, QueueError>;

    /// Moves messages whose lease has expired back to the ready list.
    /// Returns how many were moved.
    async fn requeue_expired(&self, queue: QueueName) -> Result<usize, QueueError>;
}
