//! The front door: persist a job record, then enqueue its work.
//!
//! The row is always written before any message is enqueued. If enqueueing
//! fails afterwards the row stays `pending`; nothing reconciles it.

pub mod handlers;
pub mod validation;

use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::billing::resume_quota;
use crate::errors::AppError;
use crate::jobs::{InterviewJob, JobMessage, JobPayload, ResumeJob};
use crate::models::activity::ActivityAction;
use crate::state::AppState;
use crate::storage::resume_key;
use crate::store::{NewActivity, NewInterview, NewResume};
use validation::InterviewRequest;

#[derive(Debug, Serialize)]
pub struct ResumeAccepted {
    pub resume_id: Uuid,
    pub analysis_status: String,
    pub indexing_status: String,
}

#[derive(Debug, Serialize)]
pub struct InterviewAccepted {
    pub interview_id: Uuid,
    pub feedback_status: String,
}

fn quota_exceeded(limit: i64) -> AppError {
    AppError::QuotaExceeded(format!(
        "free plan allows {limit} resumes; delete one or upgrade"
    ))
}

/// Early check so a user over quota is turned away before the upload.
/// Returns the limit the insert must enforce again.
async fn enforce_resume_quota(state: &AppState, user_id: Uuid) -> Result<Option<i64>, AppError> {
    let subscription = state.billing.subscription_for_user(user_id).await?;
    let Some(limit) = resume_quota(subscription.as_ref(), state.config.free_resume_quota) else {
        return Ok(None);
    };
    let used = state.submissions.count_active_resumes(user_id).await?;
    if used >= limit {
        return Err(quota_exceeded(limit));
    }
    Ok(Some(limit))
}

async fn enqueue_all(state: &AppState, record_id: Uuid, messages: &[JobMessage]) -> Result<(), AppError> {
    for message in messages {
        if let Err(e) = state.queue.enqueue(message).await {
            error!(%record_id, queue = %message.queue(), "Enqueue failed, record left pending: {e}");
            return Err(e.into());
        }
    }
    Ok(())
}

/// Stores the file, records the resume and schedules indexing and analysis.
pub async fn submit_resume(
    state: &AppState,
    user_id: Uuid,
    file_name: String,
    bytes: Bytes,
) -> Result<ResumeAccepted, AppError> {
    let limit = enforce_resume_quota(state, user_id).await?;

    let resume_id = Uuid::new_v4();
    let key = resume_key(user_id, resume_id);
    let size = bytes.len();
    state.files.put(&key, bytes, "application/pdf").await?;

    let new = NewResume {
        id: resume_id,
        user_id,
        file_name: file_name.clone(),
        file_url: state.files.url_for(&key),
        public_id: key,
    };
    let Some(row) = state.submissions.create_resume(&new, limit).await? else {
        // Another upload took the last slot while this file was in flight.
        if let Err(e) = state.files.delete(&new.public_id).await {
            warn!(%resume_id, "Orphaned upload left in storage: {e}");
        }
        return Err(quota_exceeded(limit.unwrap_or_default()));
    };

    state
        .submissions
        .append_activity(&NewActivity {
            user_id,
            action: ActivityAction::ResumeUploaded,
            entity_id: Some(row.id),
            metadata: json!({ "file_name": file_name, "size": size }),
        })
        .await?;

    let job = ResumeJob {
        resume_id: row.id,
        file_url: row.file_url.clone(),
        user_id,
        public_id: row.public_id.clone(),
        file_name: row.file_name.clone(),
    };
    enqueue_all(
        state,
        row.id,
        &[
            JobMessage::new(JobPayload::ProcessResume(job.clone())),
            JobMessage::new(JobPayload::ResumeAnalyse(job)),
        ],
    )
    .await?;

    info!(%resume_id, %user_id, "Resume accepted");
    Ok(ResumeAccepted {
        resume_id: row.id,
        analysis_status: row.analysis_status,
        indexing_status: row.indexing_status,
    })
}

/// Records a finished interview and schedules feedback generation.
pub async fn submit_interview(
    state: &AppState,
    user_id: Uuid,
    req: InterviewRequest,
) -> Result<InterviewAccepted, AppError> {
    let row = state
        .submissions
        .create_interview(&NewInterview {
            id: Uuid::new_v4(),
            user_id,
            role: req.role,
            interview_type: req.interview_type,
            tech_stack: req.tech_stack,
            transcript: req.transcript,
        })
        .await?;

    state
        .submissions
        .append_activity(&NewActivity {
            user_id,
            action: ActivityAction::InterviewCompleted,
            entity_id: Some(row.id),
            metadata: json!({ "role": row.role, "interview_type": row.interview_type }),
        })
        .await?;

    enqueue_all(
        state,
        row.id,
        &[JobMessage::new(JobPayload::InterviewFeedback(InterviewJob {
            interview_id: row.id,
            user_id,
        }))],
    )
    .await?;

    info!(interview_id = %row.id, %user_id, "Interview accepted");
    Ok(InterviewAccepted {
        interview_id: row.id,
        feedback_status: row.feedback_status,
    })
}

/// Soft delete; frees a quota slot. Other users' resumes look missing.
pub async fn delete_resume(state: &AppState, user_id: Uuid, resume_id: Uuid) -> Result<(), AppError> {
    if !state
        .submissions
        .soft_delete_resume(resume_id, user_id)
        .await?
    {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    state
        .submissions
        .append_activity(&NewActivity {
            user_id,
            action: ActivityAction::ResumeDeleted,
            entity_id: Some(resume_id),
            metadata: json!({}),
        })
        .await?;
    info!(%resume_id, %user_id, "Resume deleted");
    Ok(())
}
