//! One processor per job type.
//!
//! Every processor follows the same shape: move the record to `processing`,
//! do the external work, then write the terminal status with a guarded
//! update. The status event is published only when that write applied, so a
//! duplicate delivery never produces a second event.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::{DocumentError, TextExtractor};
use crate::indexing::{chunk_resume, IndexError, VectorIndex};
use crate::jobs::{IndexingStatus, InterviewJob, JobMessage, JobPayload, JobStatus, ResumeJob};
use crate::llm_client::{Generator, LlmError};
use crate::status_bus::{StatusBus, StatusEvent};
use crate::storage::{FileStore, StorageError};
use crate::store::{BeginOutcome, JobStore, StatusField, StoreError};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("result encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("interview {0} disappeared while processing")]
    InterviewMissing(Uuid),
}

/// What the runner should do with the delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Ack,
    /// Put the message back for another attempt.
    Retry(String),
}

enum Start {
    Proceed,
    Skip,
    Retry(String),
}

#[derive(Clone)]
pub struct Processors {
    pub jobs: Arc<dyn JobStore>,
    pub bus: Arc<dyn StatusBus>,
    pub files: Arc<dyn FileStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub generator: Arc<dyn Generator>,
    pub index: Arc<dyn VectorIndex>,
}

impl Processors {
    pub async fn process(&self, message: &JobMessage) -> Disposition {
        match &message.payload {
            JobPayload::ProcessResume(job) => {
                self.index_resume(job, message.is_final_attempt()).await
            }
            JobPayload::ResumeAnalyse(job) => self.analyse_resume(job).await,
            JobPayload::InterviewFeedback(job) => self.interview_feedback(job).await,
        }
    }

    async fn start(&self, field: StatusField, id: Uuid) -> Start {
        match self.jobs.begin_processing(field, id).await {
            Ok(BeginOutcome::Started) => Start::Proceed,
            Ok(BeginOutcome::AlreadyTerminal(status)) => {
                info!(%id, ?field, %status, "Already finished, skipping duplicate delivery");
                Start::Skip
            }
            Ok(BeginOutcome::Missing) => {
                warn!(%id, ?field, "Record not found, dropping job");
                Start::Skip
            }
            Err(e) => {
                error!(%id, ?field, "Could not mark record as processing: {e}");
                Start::Retry(e.to_string())
            }
        }
    }

    /// Writes the terminal status and, if this delivery won, publishes it.
    async fn finish(
        &self,
        field: StatusField,
        id: Uuid,
        status: &str,
        result: Option<Value>,
        event: StatusEvent,
    ) -> Disposition {
        match self.jobs.finish(field, id, status, result).await {
            Ok(true) => {
                if let Err(e) = self.bus.publish(&event).await {
                    warn!(%id, ?field, "Status event not published: {e}");
                }
                Disposition::Ack
            }
            Ok(false) => {
                info!(%id, ?field, "Another delivery already finished this record");
                Disposition::Ack
            }
            Err(e) => {
                error!(%id, ?field, %status, "Terminal status write failed: {e}");
                Disposition::Retry(e.to_string())
            }
        }
    }

    async fn resume_text(&self, job: &ResumeJob) -> Result<String, ProcessError> {
        let bytes = self.files.get(&job.public_id).await?;
        Ok(self.extractor.extract(bytes).await?)
    }

    async fn index_resume(&self, job: &ResumeJob, final_attempt: bool) -> Disposition {
        let field = StatusField::ResumeIndexing;
        match self.start(field, job.resume_id).await {
            Start::Proceed => {}
            Start::Skip => return Disposition::Ack,
            Start::Retry(reason) => return Disposition::Retry(reason),
        }

        let outcome = async {
            let text = self.resume_text(job).await?;
            let chunks = chunk_resume(job.resume_id, job.user_id, &job.file_name, &text);
            self.index
                .upsert(&job.user_id.to_string(), &chunks)
                .await?;
            Ok::<usize, ProcessError>(chunks.len())
        }
        .await;

        let status = match outcome {
            Ok(chunks) => {
                info!(resume_id = %job.resume_id, chunks, "Resume indexed");
                IndexingStatus::Indexed
            }
            Err(e) if !final_attempt => {
                warn!(resume_id = %job.resume_id, "Indexing failed, will retry: {e}");
                return Disposition::Retry(e.to_string());
            }
            Err(e) => {
                error!(resume_id = %job.resume_id, "Indexing failed on last attempt: {e}");
                IndexingStatus::Failed
            }
        };
        self.finish(
            field,
            job.resume_id,
            status.as_str(),
            None,
            StatusEvent::indexing(job.resume_id, job.user_id, status),
        )
        .await
    }

    async fn analyse_resume(&self, job: &ResumeJob) -> Disposition {
        let field = StatusField::ResumeAnalysis;
        match self.start(field, job.resume_id).await {
            Start::Proceed => {}
            Start::Skip => return Disposition::Ack,
            Start::Retry(reason) => return Disposition::Retry(reason),
        }

        let outcome = async {
            let text = self.resume_text(job).await?;
            let analysis = self.generator.analyse_resume(&text).await?;
            Ok::<Value, ProcessError>(serde_json::to_value(analysis)?)
        }
        .await;

        let (status, result) = match outcome {
            Ok(analysis) => {
                info!(resume_id = %job.resume_id, "Resume analysed");
                (JobStatus::Completed, Some(analysis))
            }
            Err(e) => {
                error!(resume_id = %job.resume_id, "Resume analysis failed: {e}");
                (JobStatus::Error, None)
            }
        };
        self.finish(
            field,
            job.resume_id,
            status.as_str(),
            result,
            StatusEvent::analysis(job.resume_id, job.user_id, status),
        )
        .await
    }

    async fn interview_feedback(&self, job: &InterviewJob) -> Disposition {
        let field = StatusField::InterviewFeedback;
        match self.start(field, job.interview_id).await {
            Start::Proceed => {}
            Start::Skip => return Disposition::Ack,
            Start::Retry(reason) => return Disposition::Retry(reason),
        }

        let outcome = async {
            let interview = self
                .jobs
                .load_interview(job.interview_id)
                .await?
                .ok_or(ProcessError::InterviewMissing(job.interview_id))?;
            let feedback = self.generator.interview_feedback(&interview).await?;
            Ok::<Value, ProcessError>(serde_json::to_value(feedback)?)
        }
        .await;

        let (status, result) = match outcome {
            Ok(feedback) => {
                info!(interview_id = %job.interview_id, "Interview feedback generated");
                (JobStatus::Completed, Some(feedback))
            }
            Err(e) => {
                error!(interview_id = %job.interview_id, "Interview feedback failed: {e}");
                (JobStatus::Error, None)
            }
        };
        self.finish(
            field,
            job.interview_id,
            status.as_str(),
            result,
            StatusEvent::feedback(job.interview_id, job.user_id, status),
        )
        .await
    }
}
