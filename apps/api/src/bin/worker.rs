use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use prepwise_api::config::Config;
use prepwise_api::db::create_pool;
use prepwise_api::documents::PdfTextExtractor;
use prepwise_api::indexing::HttpVectorIndex;
use prepwise_api::jobs::RedisQueue;
use prepwise_api::llm_client::{self, LlmClient};
use prepwise_api::status_bus::RedisBus;
use prepwise_api::storage::{build_s3_client, S3FileStore};
use prepwise_api::store::PgStore;
use prepwise_api::telemetry::init_tracing;
use prepwise_api::worker::{Processors, Worker};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("Starting PrepWise worker v{}", env!("CARGO_PKG_VERSION"));

    // Migrations are owned by the API process.
    let pool_size = (config.worker_concurrency * config.worker_queues.len()).clamp(2, 32) as u32;
    let db = create_pool(&config.database_url, pool_size).await?;

    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue = RedisQueue::connect(
        redis.clone(),
        Duration::from_secs(config.queue_visibility_secs),
    )
    .await?;
    let bus = RedisBus::connect(redis, config.status_channel.clone()).await?;

    let s3 = build_s3_client(&config).await;
    let files = S3FileStore::new(s3, config.s3_bucket.clone(), config.s3_endpoint.clone());

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let index = HttpVectorIndex::new(
        config.vector_index_url.clone(),
        config.vector_index_api_key.clone(),
    )?;

    let processors = Processors {
        jobs: Arc::new(PgStore::new(db)),
        bus: Arc::new(bus),
        files: Arc::new(files),
        extractor: Arc::new(PdfTextExtractor),
        generator: Arc::new(llm),
        index: Arc::new(index),
    };

    let worker = Worker::new(Arc::new(queue), processors, config.worker_concurrency);
    worker
        .run(&config.worker_queues, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    info!("Worker stopped");
    Ok(())
}
