pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::billing::handlers as billing;
use crate::live;
use crate::state::AppState;
use crate::submission::handlers as submission;
use crate::webhook::handlers as webhook;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health::health_handler))
        // Submissions
        .route(
            "/api/resume",
            post(submission::handle_upload_resume).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/resume/status-updates",
            get(live::handle_status_updates),
        )
        .route(
            "/api/resume/:id",
            get(submission::handle_get_resume).delete(submission::handle_delete_resume),
        )
        .route("/api/interview", post(submission::handle_submit_interview))
        .route("/api/interview/:id", get(submission::handle_get_interview))
        // Billing
        .route("/api/checkout", post(billing::handle_checkout))
        .route("/api/subscription", get(billing::handle_get_subscription))
        .route("/api/webhook/dodopayment", post(webhook::handle_dodo_webhook))
        // Admin
        .route("/api/admin/stats", get(admin::handle_stats))
        .route("/api/admin/activity", get(admin::handle_activity))
        .route(
            "/api/admin/resume/:id/reprocess",
            post(admin::handle_reprocess),
        )
        .with_state(state)
}
