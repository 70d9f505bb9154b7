use std::str::FromStr;

use anyhow::{Context, Result};

use crate::jobs::QueueName;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub dodo_api_key: String,
    pub dodo_api_base: String,
    pub dodo_webhook_secret: String,
    pub dodo_product_id: String,
    pub checkout_return_url: String,
    pub vector_index_url: String,
    pub vector_index_api_key: String,
    pub admin_api_token: String,
    pub free_resume_quota: i64,
    pub max_upload_bytes: usize,
    pub worker_concurrency: usize,
    pub worker_queues: Vec<QueueName>,
    pub queue_visibility_secs: u64,
    pub status_channel: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            dodo_api_key: require_env("DODO_PAYMENTS_API_KEY")?,
            dodo_api_base: optional_env("DODO_API_BASE", "https://test.dodopayments.com"),
            dodo_webhook_secret: require_env("DODO_WEBHOOK_SECRET")?,
            dodo_product_id: require_env("DODO_PRODUCT_ID")?,
            checkout_return_url: optional_env(
                "CHECKOUT_RETURN_URL",
                "http://localhost:3000/billing",
            ),
            vector_index_url: require_env("VECTOR_INDEX_URL")?,
            vector_index_api_key: require_env("VECTOR_INDEX_API_KEY")?,
            admin_api_token: require_env("ADMIN_API_TOKEN")?,
            free_resume_quota: parse_env("FREE_RESUME_QUOTA", 3)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            worker_concurrency: parse_env("WORKER_CONCURRENCY", 4)?,
            worker_queues: parse_queue_list(&optional_env("WORKER_QUEUES", ""))?,
            queue_visibility_secs: parse_env("QUEUE_VISIBILITY_SECS", 300)?,
            status_channel: optional_env("STATUS_CHANNEL", "resume-status-updates"),
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Parses a comma-separated queue list. An empty list means every queue.
pub fn parse_queue_list(raw: &str) -> Result<Vec<QueueName>> {
    let names: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(QueueName::ALL.to_vec());
    }
    names
        .into_iter()
        .map(|name| {
            name.parse::<QueueName>()
                .with_context(|| format!("WORKER_QUEUES contains unknown queue '{name}'"))
        })
        .collect()
}
