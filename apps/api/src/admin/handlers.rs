use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminToken;
use crate::errors::AppError;
use crate::models::activity::ActivityRow;
use crate::state::AppState;
use crate::store::DashboardStats;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 200;

#[derive(Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    _admin: AdminToken,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.admin.dashboard_stats().await?))
}

/// GET /api/admin/activity?limit=N
pub async fn handle_activity(
    State(state): State<AppState>,
    _admin: AdminToken,
    Query(params): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityRow>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    Ok(Json(state.admin.recent_activity(limit).await?))
}

/// POST /api/admin/resume/:id/reprocess
///
/// There is no reprocessing path yet; terminal statuses are final.
pub async fn handle_reprocess(
    _admin: AdminToken,
    Path(_id): Path<Uuid>,
) -> Result<(), AppError> {
    Err(AppError::NotImplemented)
}
