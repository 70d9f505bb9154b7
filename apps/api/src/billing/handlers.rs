use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use super::checkout::CheckoutRequest;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

/// POST /api/checkout
pub async fn handle_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CheckoutResponse>, AppError> {
    let user = state
        .billing
        .get_user(auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let session = state
        .payments
        .create_checkout(&CheckoutRequest {
            user_id: user.id,
            email: user.email,
            name: user.name,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
    }))
}

/// GET /api/subscription
pub async fn handle_get_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    let subscription = state.billing.subscription_for_user(auth.user_id).await?;
    Ok(Json(match subscription {
        Some(row) => serde_json::to_value(row).map_err(anyhow::Error::from)?,
        None => json!({ "status": "none" }),
    }))
}
