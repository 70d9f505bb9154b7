use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::validation::{validate_interview, validate_resume_upload, InterviewRequest};
use super::{delete_resume, submit_interview, submit_resume, InterviewAccepted, ResumeAccepted};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::interview::InterviewRow;
use crate::models::resume::ResumeRow;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// POST /api/resume
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeAccepted>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(FILE_FIELD, e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(FILE_FIELD, e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::validation(FILE_FIELD, "a PDF file is required"))?;
    let file_name =
        validate_resume_upload(file_name.as_deref(), &bytes, state.config.max_upload_bytes)?;

    let accepted = submit_resume(&state, auth.user_id, file_name, bytes).await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// GET /api/resume/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = state
        .submissions
        .get_resume(id)
        .await?
        .filter(|r| r.user_id == auth.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
    Ok(Json(resume))
}

/// DELETE /api/resume/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_resume(&state, auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/interview
pub async fn handle_submit_interview(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut req): Json<InterviewRequest>,
) -> Result<(StatusCode, Json<InterviewAccepted>), AppError> {
    validate_interview(&mut req)?;
    let accepted = submit_interview(&state, auth.user_id, req).await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// GET /api/interview/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewRow>, AppError> {
    let interview = state
        .submissions
        .get_interview(id)
        .await?
        .filter(|i| i.user_id == auth.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;
    Ok(Json(interview))
}
