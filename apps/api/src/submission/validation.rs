use serde::Deserialize;

use crate::documents::looks_like_pdf;
use crate::errors::AppError;
use crate::models::interview::{Speaker, TranscriptTurn};

const MAX_FILE_NAME_CHARS: usize = 255;
const MAX_TECH_STACK: usize = 30;

/// Checks a resume upload before anything is stored.
pub fn validate_resume_upload(
    file_name: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<String, AppError> {
    let name = file_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("file", "a file name is required"))?;
    if name.chars().count() > MAX_FILE_NAME_CHARS {
        return Err(AppError::validation("file", "file name is too long"));
    }
    if !name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AppError::validation("file", "only PDF resumes are accepted"));
    }
    if bytes.is_empty() {
        return Err(AppError::validation("file", "the file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::validation(
            "file",
            format!("the file exceeds the {max_bytes} byte limit"),
        ));
    }
    if !looks_like_pdf(bytes) {
        return Err(AppError::validation("file", "the file is not a valid PDF"));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterviewRequest {
    pub role: String,
    pub interview_type: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub transcript: Vec<TranscriptTurn>,
}

/// Trims the request in place and rejects ones feedback cannot be produced
/// for.
pub fn validate_interview(req: &mut InterviewRequest) -> Result<(), AppError> {
    req.role = req.role.trim().to_string();
    req.interview_type = req.interview_type.trim().to_string();
    req.tech_stack = req
        .tech_stack
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    req.transcript.retain(|turn| !turn.content.trim().is_empty());

    if req.role.is_empty() {
        return Err(AppError::validation("role", "role is required"));
    }
    if req.interview_type.is_empty() {
        return Err(AppError::validation(
            "interview_type",
            "interview type is required",
        ));
    }
    if req.tech_stack.len() > MAX_TECH_STACK {
        return Err(AppError::validation("tech_stack", "too many technologies"));
    }
    if !req
        .transcript
        .iter()
        .any(|turn| turn.role == Speaker::Candidate)
    {
        return Err(AppError::validation(
            "transcript",
            "transcript has no candidate answers",
        ));
    }
    Ok(())
}
