//! In-process queue used by tests. Same lease/ack/nack semantics as
//! `RedisQueue`, with leases that expire only when told to.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::queue::{Delivery, JobQueue, NackOutcome, QueueError};
use super::{JobMessage, QueueName};

#[derive(Default)]
struct Lanes {
    ready: VecDeque<JobMessage>,
    processing: Vec<Delivery>,
    dead: Vec<JobMessage>,
}

#[derive(Default)]
pub struct MemoryQueue {
    lanes: Mutex<HashMap<QueueName, Lanes>>,
    fail_enqueue: Mutex<bool>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_enqueues(&self) {
        *self.fail_enqueue.lock().unwrap() = true;
    }

    pub fn ready(&self, queue: QueueName) -> Vec<JobMessage> {
        let lanes = self.lanes.lock().unwrap();
        lanes
            .get(&queue)
            .map(|l| l.ready.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn in_flight(&self, queue: QueueName) -> usize {
        let lanes = self.lanes.lock().unwrap();
        lanes.get(&queue).map(|l| l.processing.len()).unwrap_or(0)
    }

    pub fn dead(&self, queue: QueueName) -> Vec<JobMessage> {
        let lanes = self.lanes.lock().unwrap();
        lanes
            .get(&queue)
            .map(|l| l.dead.clone())
            .unwrap_or_default()
    }

    /// Simulates every outstanding lease on `queue` running out.
    pub fn expire_leases(&self, queue: QueueName) {
        let mut lanes = self.lanes.lock().unwrap();
        if let Some(l) = lanes.get_mut(&queue) {
            for delivery in l.processing.drain(..) {
                l.ready.push_front(delivery.message);
            }
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError> {
        if *self.fail_enqueue.lock().unwrap() {
            let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "queue down");
            return Err(QueueError::Redis(io.into()));
        }
        let mut lanes = self.lanes.lock().unwrap();
        lanes
            .entry(message.queue())
            .or_default()
            .ready
            .push_back(message.clone());
        Ok(())
    }

    async fn claim(
        &self,
        queue: QueueName,
        _wait: Duration,
    ) -> Result<Option<Delivery>, QueueError> {
        let mut lanes = self.lanes.lock().unwrap();
        let l = lanes.entry(queue).or_default();
        let Some(message) = l.ready.pop_front() else {
            return Ok(None);
        };
        let delivery = Delivery {
            queue,
            raw: serde_json::to_string(&message)?,
            message,
        };
        l.processing.push(delivery.clone());
        Ok(Some(delivery))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut lanes = self.lanes.lock().unwrap();
        if let Some(l) = lanes.get_mut(&delivery.queue) {
            l.processing.retain(|d| d.raw != delivery.raw);
        }
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<NackOutcome, QueueError> {
        let mut lanes = self.lanes.lock().unwrap();
        let l = lanes.entry(delivery.queue).or_default();
        l.processing.retain(|d| d.raw != delivery.raw);
        match delivery.message.retried() {
            Some(retry) => {
                let attempts = retry.attempts;
                l.ready.push_back(retry);
                Ok(NackOutcome::Requeued { attempts })
            }
            None => {
                l.dead.push(delivery.message.clone());
                Ok(NackOutcome::DeadLettered)
            }
        }
    }

    async fn requeue_expired(&self, _queue: QueueName) -> Result<usize, QueueError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::jobs::{InterviewJob, JobPayload};

    fn feedback_message() -> JobMessage {
        JobMessage::new(JobPayload::InterviewFeedback(InterviewJob {
            interview_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }))
    }

    #[tokio::test]
    async fn test_claimed_message_is_invisible_until_lease_expires() {
        let queue = MemoryQueue::new();
        queue.enqueue(&feedback_message()).await.unwrap();

        let first = queue
            .claim(QueueName::InterviewFeedback, Duration::ZERO)
            .await
            .unwrap();
        assert!(first.is_some());
        let second = queue
            .claim(QueueName::InterviewFeedback, Duration::ZERO)
            .await
            .unwrap();
        assert!(second.is_none());

        queue.expire_leases(QueueName::InterviewFeedback);
        let redelivered = queue
            .claim(QueueName::InterviewFeedback, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(redelivered.unwrap().message.id, first.unwrap().message.id);
    }

    #[tokio::test]
    async fn test_nack_without_retries_dead_letters() {
        let queue = MemoryQueue::new();
        queue.enqueue(&feedback_message()).await.unwrap();
        let delivery = queue
            .claim(QueueName::InterviewFeedback, Duration::ZERO)
            .await
            .unwrap()
            .unwrap();

        let outcome = queue.nack(&delivery).await.unwrap();
        assert_eq!(outcome, NackOutcome::DeadLettered);
        assert_eq!(queue.dead(QueueName::InterviewFeedback).len(), 1);
        assert_eq!(queue.in_flight(QueueName::InterviewFeedback), 0);
    }
}
