//! Claude Messages API client used by the worker's generation steps.
//!
//! Nothing else in the crate talks to Anthropic directly; processors reach
//! this through the `Generator` trait so tests can script the output.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::interview::{InterviewFeedback, InterviewRow};
use crate::models::resume::ResumeAnalysis;

pub mod prompts;

use prompts::{INTERVIEW_FEEDBACK_PROMPT, JSON_ONLY_SYSTEM, RESUME_ANALYSIS_PROMPT};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Pinned; not read from config.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Delay before each retry of a throttled or failed call.
const RETRY_DELAYS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(2)];
/// Resume text beyond this many characters is cut before prompting.
const MAX_RESUME_CHARS: usize = 20_000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserTurn<'a>; 1],
}

#[derive(Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl MessagesResponse {
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, api_key })
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<MessagesResponse, LlmError> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
            .map(|e| e.error.message)
            .unwrap_or(raw);
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// One user turn in, the first text block out. Throttling, 5xx and
    /// transport failures are retried; other API errors are returned as is.
    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [UserTurn {
                role: "user",
                content: prompt,
            }],
        };

        let mut delays = RETRY_DELAYS.iter();
        loop {
            let err = match self.send(&body).await {
                Ok(response) => {
                    debug!(
                        input_tokens = response.usage.input_tokens,
                        output_tokens = response.usage.output_tokens,
                        "LLM call succeeded"
                    );
                    return response.into_text().ok_or(LlmError::EmptyContent);
                }
                Err(err) => err,
            };
            let retryable = match &err {
                LlmError::Api { status, .. } => StatusCode::from_u16(*status)
                    .map(is_retryable)
                    .unwrap_or(false),
                LlmError::Http(_) => true,
                _ => false,
            };
            match delays.next() {
                Some(delay) if retryable => {
                    warn!(delay_ms = delay.as_millis() as u64, "LLM call failed, retrying: {err}");
                    tokio::time::sleep(*delay).await;
                }
                _ => return Err(err),
            }
        }
    }

    /// `complete`, then parse the reply as JSON.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        let text = self.complete(system, prompt).await?;
        Ok(serde_json::from_str(strip_json_fences(&text))?)
    }
}

/// The generation steps the worker needs. Implemented by `LlmClient`;
/// tests substitute a scripted implementation.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn analyse_resume(&self, resume_text: &str) -> Result<ResumeAnalysis, LlmError>;
    async fn interview_feedback(
        &self,
        interview: &InterviewRow,
    ) -> Result<InterviewFeedback, LlmError>;
}

#[async_trait]
impl Generator for LlmClient {
    async fn analyse_resume(&self, resume_text: &str) -> Result<ResumeAnalysis, LlmError> {
        if resume_text.trim().is_empty() {
            return Err(LlmError::InvalidInput(
                "resume contains no extractable text".to_string(),
            ));
        }
        let prompt = fill_template(
            RESUME_ANALYSIS_PROMPT,
            &[("resume_text", truncate_chars(resume_text, MAX_RESUME_CHARS))],
        );
        let mut analysis: ResumeAnalysis = self.complete_json(JSON_ONLY_SYSTEM, &prompt).await?;
        analysis.ats_score = analysis.ats_score.min(100);
        Ok(analysis)
    }

    async fn interview_feedback(
        &self,
        interview: &InterviewRow,
    ) -> Result<InterviewFeedback, LlmError> {
        let transcript_json = serde_json::to_string_pretty(&interview.transcript)?;
        let tech_stack = interview.tech_stack.join(", ");
        let prompt = fill_template(
            INTERVIEW_FEEDBACK_PROMPT,
            &[
                ("interview_type", &interview.interview_type),
                ("role", &interview.role),
                ("tech_stack", &tech_stack),
                ("transcript_json", &transcript_json),
            ],
        );
        let mut feedback: InterviewFeedback = self.complete_json(JSON_ONLY_SYSTEM, &prompt).await?;
        feedback.total_score = feedback.total_score.min(100);
        Ok(feedback)
    }
}

/// Substitutes `{name}` placeholders in a single left-to-right pass.
///
/// Inserted values are never scanned again, so braces inside user-supplied
/// text stay literal. Unknown placeholders are left as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Cuts `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Removes a surrounding ``` or ```json fence, if the model added one.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let inner = inner.trim_start();
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
