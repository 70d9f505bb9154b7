use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use prepwise_api::billing::DodoClient;
use prepwise_api::config::Config;
use prepwise_api::db::{create_pool, run_migrations};
use prepwise_api::jobs::RedisQueue;
use prepwise_api::routes::build_router;
use prepwise_api::state::AppState;
use prepwise_api::status_bus::RedisBus;
use prepwise_api::storage::{build_s3_client, S3FileStore};
use prepwise_api::store::PgStore;
use prepwise_api::telemetry::init_tracing;
use prepwise_api::webhook::WebhookVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("Starting PrepWise API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL
    let db = create_pool(&config.database_url, 10).await?;
    run_migrations(&db).await?;
    let store = Arc::new(PgStore::new(db));

    // Redis: job queue and status channel
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue = RedisQueue::connect(
        redis.clone(),
        Duration::from_secs(config.queue_visibility_secs),
    )
    .await?;
    let bus = RedisBus::connect(redis, config.status_channel.clone()).await?;
    info!("Redis queue and status bus connected");

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let files = S3FileStore::new(s3, config.s3_bucket.clone(), config.s3_endpoint.clone());
    info!("S3 client initialized");

    let payments = DodoClient::new(
        config.dodo_api_base.clone(),
        config.dodo_api_key.clone(),
        config.dodo_product_id.clone(),
        config.checkout_return_url.clone(),
    )?;
    let webhook_verifier = WebhookVerifier::new(&config.dodo_webhook_secret)
        .context("DODO_WEBHOOK_SECRET is not a valid signing secret")?;

    let state = AppState {
        submissions: store.clone(),
        billing: store.clone(),
        admin: store,
        queue: Arc::new(queue),
        bus: Arc::new(bus),
        files: Arc::new(files),
        payments: Arc::new(payments),
        webhook_verifier: Arc::new(webhook_verifier),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web app's domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
