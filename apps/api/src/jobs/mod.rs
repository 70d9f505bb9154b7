//! Job messages and the named queues they travel on.
//!
//! Each job type has exactly one queue. A message is an ephemeral envelope:
//! it has no identity outside the queue's own bookkeeping and is discarded
//! once acked or dead-lettered.

pub mod queue;
pub mod redis_queue;
pub mod status;

#[cfg(test)]
pub mod memory;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use queue::{Delivery, JobQueue, NackOutcome, QueueError};
pub use redis_queue::RedisQueue;
pub use status::{IndexingStatus, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    ProcessResume,
    ResumeAnalyse,
    InterviewFeedback,
}

impl QueueName {
    pub const ALL: [QueueName; 3] = [
        QueueName::ProcessResume,
        QueueName::ResumeAnalyse,
        QueueName::InterviewFeedback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::ProcessResume => "process-resume",
            QueueName::ResumeAnalyse => "resume-analyse",
            QueueName::InterviewFeedback => "interview-feedback",
        }
    }

    /// Total deliveries allowed before a failing message is dead-lettered.
    /// Only indexing is retried; the other queues record failures as a
    /// terminal status on the first attempt.
    pub fn max_attempts(&self) -> u32 {
        match self {
            QueueName::ProcessResume => 3,
            QueueName::ResumeAnalyse | QueueName::InterviewFeedback => 1,
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown queue '{0}'")]
pub struct UnknownQueue(pub String);

impl FromStr for QueueName {
    type Err = UnknownQueue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueName::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| UnknownQueue(s.to_string()))
    }
}

/// Payload shared by both resume jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeJob {
    pub resume_id: Uuid,
    pub file_url: String,
    pub user_id: Uuid,
    /// Object-storage key of the uploaded file.
    pub public_id: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewJob {
    pub interview_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobPayload {
    ProcessResume(ResumeJob),
    ResumeAnalyse(ResumeJob),
    InterviewFeedback(InterviewJob),
}

impl JobPayload {
    pub fn queue(&self) -> QueueName {
        match self {
            JobPayload::ProcessResume(_) => QueueName::ProcessResume,
            JobPayload::ResumeAnalyse(_) => QueueName::ResumeAnalyse,
            JobPayload::InterviewFeedback(_) => QueueName::InterviewFeedback,
        }
    }

    /// Id of the job record this message drives.
    pub fn record_id(&self) -> Uuid {
        match self {
            JobPayload::ProcessResume(job) | JobPayload::ResumeAnalyse(job) => job.resume_id,
            JobPayload::InterviewFeedback(job) => job.interview_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub id: Uuid,
    pub enqueued_at: DateTime<Utc>,
    /// Number of failed deliveries so far.
    #[serde(default)]
    pub attempts: u32,
    pub payload: JobPayload,
}

impl JobMessage {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            enqueued_at: Utc::now(),
            attempts: 0,
            payload,
        }
    }

    pub fn queue(&self) -> QueueName {
        self.payload.queue()
    }

    /// True when this delivery is the last one the queue's policy allows.
    pub fn is_final_attempt(&self) -> bool {
        self.attempts + 1 >= self.queue().max_attempts()
    }

    /// The message to re-enqueue after a failed delivery, if any remain.
    pub fn retried(&self) -> Option<JobMessage> {
        if self.is_final_attempt() {
            return None;
        }
        Some(JobMessage {
            attempts: self.attempts + 1,
            ..self.clone()
        })
    }
}
