//! Router-level test harness wired with in-memory doubles.

use std::sync::Arc;

use axum::{body::to_bytes, response::Response, Router};
use serde_json::Value;

use crate::billing::checkout::memory::RecordingProvider;
use crate::config::Config;
use crate::jobs::memory::MemoryQueue;
use crate::jobs::QueueName;
use crate::routes::build_router;
use crate::state::AppState;
use crate::status_bus::memory::MemoryBus;
use crate::storage::memory::MemoryFileStore;
use crate::store::memory::MemoryStore;
use crate::webhook::WebhookVerifier;

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/prepwise_test".to_string(),
        redis_url: "redis://localhost:6379".to_string(),
        s3_bucket: "prepwise".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "minio".to_string(),
        aws_secret_access_key: "minio123".to_string(),
        anthropic_api_key: "sk-test".to_string(),
        dodo_api_key: "dodo-test".to_string(),
        dodo_api_base: "https://test.dodopayments.com".to_string(),
        dodo_webhook_secret: WEBHOOK_SECRET.to_string(),
        dodo_product_id: "pdt_test".to_string(),
        checkout_return_url: "http://localhost:3000/billing".to_string(),
        vector_index_url: "http://localhost:6333".to_string(),
        vector_index_api_key: "index-test".to_string(),
        admin_api_token: ADMIN_TOKEN.to_string(),
        free_resume_quota: 2,
        max_upload_bytes: 64 * 1024,
        worker_concurrency: 1,
        worker_queues: QueueName::ALL.to_vec(),
        queue_visibility_secs: 300,
        status_channel: "resume-status-updates".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
    pub bus: Arc<MemoryBus>,
    pub files: Arc<MemoryFileStore>,
    pub payments: Arc<RecordingProvider>,
    pub verifier: WebhookVerifier,
    pub config: Config,
}

impl Harness {
    pub fn new() -> Self {
        let config = test_config();
        Self {
            store: Arc::new(MemoryStore::new()),
            queue: Arc::new(MemoryQueue::new()),
            bus: Arc::new(MemoryBus::new()),
            files: Arc::new(MemoryFileStore::new()),
            payments: Arc::new(RecordingProvider::new()),
            verifier: WebhookVerifier::new(&config.dodo_webhook_secret).unwrap(),
            config,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            submissions: self.store.clone(),
            billing: self.store.clone(),
            admin: self.store.clone(),
            queue: self.queue.clone(),
            bus: self.bus.clone(),
            files: self.files.clone(),
            payments: self.payments.clone(),
            webhook_verifier: Arc::new(self.verifier.clone()),
            config: self.config.clone(),
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state())
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
