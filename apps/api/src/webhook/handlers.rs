use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::events::parse_event;
use super::reconcile::{apply_event, Outcome};
use super::signature::{SignedHeaders, HEADER_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(rename = "type")]
    pub event_type: String,
}

fn required_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(name, "missing webhook header"))
}

/// POST /api/webhook/dodopayment
///
/// Takes the raw body so the signature is checked over the exact bytes
/// the provider signed.
pub async fn handle_dodo_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signed = SignedHeaders {
        id: required_header(&headers, HEADER_ID)?,
        signature: required_header(&headers, HEADER_SIGNATURE)?,
        timestamp: required_header(&headers, HEADER_TIMESTAMP)?,
    };

    let signed_at = state
        .webhook_verifier
        .verify(signed, &body, Utc::now())
        .map_err(|e| {
            warn!(webhook_id = signed.id, "Webhook signature rejected: {e}");
            AppError::validation(HEADER_SIGNATURE, e.to_string())
        })?;

    let parsed = parse_event(&body, signed_at).map_err(|e| {
        warn!(webhook_id = signed.id, "Malformed webhook body: {e}");
        AppError::validation("body", format!("malformed event: {e}"))
    })?;

    let outcome = apply_event(state.billing.as_ref(), &parsed.event, parsed.occurred_at).await?;
    match &outcome {
        Outcome::Ignored(reason) => info!(
            webhook_id = signed.id,
            event_type = %parsed.event_type,
            reason = *reason,
            "Webhook ignored"
        ),
        _ => info!(
            webhook_id = signed.id,
            event_type = %parsed.event_type,
            ?outcome,
            "Webhook processed"
        ),
    }

    Ok(Json(WebhookAck {
        received: true,
        event_type: parsed.event_type,
    }))
}
