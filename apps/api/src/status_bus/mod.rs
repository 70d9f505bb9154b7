//! Status-change pub/sub channel between workers and the live relay.
//!
//! Fire-and-forget fan-out: events published while nobody is subscribed are
//! gone. There is no replay.

pub mod redis_bus;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::jobs::{IndexingStatus, JobStatus};

pub use redis_bus::RedisBus;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Event encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// On the wire the variant is implied by its id field (`resumeId` or
/// `interviewId`); there is no tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusEvent {
    #[serde(rename_all = "camelCase")]
    Resume {
        resume_id: Uuid,
        user_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analysis_status: Option<JobStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        indexing_status: Option<IndexingStatus>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Interview {
        interview_id: Uuid,
        user_id: Uuid,
        feedback_status: JobStatus,
        timestamp: DateTime<Utc>,
    },
}

impl StatusEvent {
    pub fn analysis(resume_id: Uuid, user_id: Uuid, status: JobStatus) -> Self {
        StatusEvent::Resume {
            resume_id,
            user_id,
            analysis_status: Some(status),
            indexing_status: None,
            timestamp: Utc::now(),
        }
    }

    pub fn indexing(resume_id: Uuid, user_id: Uuid, status: IndexingStatus) -> Self {
        StatusEvent::Resume {
            resume_id,
            user_id,
            analysis_status: None,
            indexing_status: Some(status),
            timestamp: Utc::now(),
        }
    }

    pub fn feedback(interview_id: Uuid, user_id: Uuid, status: JobStatus) -> Self {
        StatusEvent::Interview {
            interview_id,
            user_id,
            feedback_status: status,
            timestamp: Utc::now(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            StatusEvent::Resume { user_id, .. } | StatusEvent::Interview { user_id, .. } => {
                *user_id
            }
        }
    }
}

/// Carried as `Arc<dyn StatusBus>`.
#[async_trait]
pub trait StatusBus: Send + Sync {
    async fn publish(&self, event: &StatusEvent) -> Result<(), BusError>;

    /// Opens a new subscription. Dropping the stream closes it.
    async fn subscribe(&self) -> Result<BoxStream<'static, StatusEvent>, BusError>;
}
