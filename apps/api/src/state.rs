use std::sync::Arc;

use crate::billing::PaymentProvider;
use crate::config::Config;
use crate::jobs::JobQueue;
use crate::status_bus::StatusBus;
use crate::storage::FileStore;
use crate::store::{AdminStore, BillingStore, SubmissionStore};
use crate::webhook::WebhookVerifier;

/// Shared application state injected into all route handlers via Axum extractors.
/// Long-lived clients are built once at startup and handed in here.
#[derive(Clone)]
pub struct AppState {
    pub submissions: Arc<dyn SubmissionStore>,
    pub billing: Arc<dyn BillingStore>,
    pub admin: Arc<dyn AdminStore>,
    pub queue: Arc<dyn JobQueue>,
    /// Pub/sub channel the worker publishes status changes on.
    pub bus: Arc<dyn StatusBus>,
    pub files: Arc<dyn FileStore>,
    pub payments: Arc<dyn PaymentProvider>,
    pub webhook_verifier: Arc<WebhookVerifier>,
    pub config: Config,
}
