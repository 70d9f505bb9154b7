//! Background job runner.
//!
//! `concurrency` slots per queue, each looping over
//! sweep → claim → process → ack/nack. Nothing a job does can end a slot:
//! processing failures become a terminal status or a retry, and queue
//! errors back off and try again.

pub mod processors;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::jobs::{JobQueue, NackOutcome, QueueError, QueueName};
pub use processors::{Disposition, Processors};

const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);
/// How long one claim blocks waiting for a message.
const CLAIM_WAIT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    processors: Processors,
    concurrency: usize,
}

impl Worker {
    pub fn new(queue: Arc<dyn JobQueue>, processors: Processors, concurrency: usize) -> Self {
        Self {
            queue,
            processors,
            concurrency: concurrency.max(1),
        }
    }

    /// Runs until `shutdown` resolves. In-flight jobs are abandoned on
    /// shutdown; their leases expire and another worker picks them up.
    pub async fn run<F>(self, queues: &[QueueName], shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let mut slots = JoinSet::new();
        for &queue in queues {
            for slot in 0..self.concurrency {
                let worker = self.clone();
                slots.spawn(async move { worker.slot_loop(queue, slot).await });
            }
            info!(%queue, slots = self.concurrency, "Listening");
        }

        shutdown.await;
        info!("Shutting down worker");
        slots.shutdown().await;
    }

    async fn slot_loop(&self, queue: QueueName, slot: usize) {
        loop {
            if let Err(e) = self.run_once(queue).await {
                error!(%queue, slot, "Queue error: {e}");
                tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
            }
        }
    }

    /// Handles at most one message. Returns whether one was claimed.
    pub async fn run_once(&self, queue: QueueName) -> Result<bool, QueueError> {
        let recovered = self.queue.requeue_expired(queue).await?;
        if recovered > 0 {
            warn!(%queue, recovered, "Requeued jobs whose lease expired");
        }

        let Some(delivery) = self.queue.claim(queue, CLAIM_WAIT).await? else {
            return Ok(false);
        };
        let message = &delivery.message;
        info!(
            %queue,
            job_id = %message.id,
            record_id = %message.payload.record_id(),
            attempt = message.attempts + 1,
            "Processing job"
        );

        match self.processors.process(message).await {
            Disposition::Ack => self.queue.ack(&delivery).await?,
            Disposition::Retry(reason) => match self.queue.nack(&delivery).await? {
                NackOutcome::Requeued { attempts } => {
                    warn!(%queue, job_id = %message.id, attempts, "Job requeued: {reason}")
                }
                NackOutcome::DeadLettered => {
                    error!(%queue, job_id = %message.id, "Job dead-lettered: {reason}")
                }
            },
        }
        Ok(true)
    }
}
