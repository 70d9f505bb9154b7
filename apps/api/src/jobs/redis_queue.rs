//! Redis-backed reliable queue.
//!
//! Layout per queue `<name>`:
//! - `queue:<name>`            ready list (LPUSH in, BLMOVE out from the right)
//! - `queue:<name>:processing` messages currently claimed by a worker
//! - `queue:<name>:leases`     sorted set of claimed messages by lease deadline
//! - `queue:<name>:dead`       messages that exhausted their attempts
//!
//! The `queue` prefix can be swapped with [`RedisQueue::with_prefix`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::queue::{Delivery, JobQueue, NackOutcome, QueueError};
use super::{JobMessage, QueueName};

const REQUEUE_EXPIRED_SCRIPT: &str = r#"
local expired = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
local moved = 0
for _, raw in ipairs(expired) do
  redis.call('ZREM', KEYS[1], raw)
  if redis.call('LREM', KEYS[2], 1, raw) > 0 then
    redis.call('RPUSH', KEYS[3], raw)
    moved = moved + 1
  end
end
return moved
"#;

struct QueueKeys {
    ready: String,
    processing: String,
    leases: String,
    dead: String,
}

impl QueueKeys {
    fn new(prefix: &str, queue: QueueName) -> Self {
        let base = format!("{prefix}:{}", queue.as_str());
        Self {
            processing: format!("{base}:processing"),
            leases: format!("{base}:leases"),
            dead: format!("{base}:dead"),
            ready: base,
        }
    }
}

pub struct RedisQueue {
    client: redis::Client,
    conn: MultiplexedConnection,
    /// Connections reserved for blocking claims so they never stall `conn`.
    blocking: Mutex<Vec<MultiplexedConnection>>,
    visibility: Duration,
    prefix: String,
}

impl RedisQueue {
    pub async fn connect(client: redis::Client, visibility: Duration) -> Result<Self, QueueError> {
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self {
            client,
            conn,
            blocking: Mutex::new(Vec::new()),
            visibility,
            prefix: "queue".to_string(),
        })
    }

    /// Namespaces every key under `prefix` instead of `queue`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn keys(&self, queue: QueueName) -> QueueKeys {
        QueueKeys::new(&self.prefix, queue)
    }

    async fn blocking_connection(&self) -> Result<MultiplexedConnection, QueueError> {
        if let Some(conn) = self.blocking.lock().await.pop() {
            return Ok(conn);
        }
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }

    fn lease_deadline_ms(&self) -> i64 {
        let visibility = chrono::Duration::from_std(self.visibility)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        (Utc::now() + visibility).timestamp_millis()
    }

    async fn dead_letter_raw(&self, keys: &QueueKeys, raw: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .lrem(&keys.processing, 1, raw)
            .ignore()
            .zrem(&keys.leases, raw)
            .ignore()
            .lpush(&keys.dead, raw)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, message: &JobMessage) -> Result<(), QueueError> {
        let keys = self.keys(message.queue());
        let raw = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&keys.ready, raw).await?;
        debug!(job_id = %message.id, queue = %message.queue(), "Enqueued job");
        Ok(())
    }

    async fn claim(
        &self,
        queue: QueueName,
        wait: Duration,
    ) -> Result<Option<Delivery>, QueueError> {
        let keys = self.keys(queue);
        let mut conn = self.blocking_connection().await?;
        let claimed: Option<String> = redis::cmd("BLMOVE")
            .arg(&keys.ready)
            .arg(&keys.processing)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(wait.as_secs_f64())
            .query_async(&mut conn)
            .await?;
        self.blocking.lock().await.push(conn);

        let Some(raw) = claimed else {
            return Ok(None);
        };

        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(&keys.leases, &raw, self.lease_deadline_ms())
            .await?;

        match serde_json::from_str::<JobMessage>(&raw) {
            Ok(message) => Ok(Some(Delivery {
                queue,
                message,
                raw,
            })),
            Err(e) => {
                warn!(queue = %queue, "Dead-lettering undecodable message: {e}");
                self.dead_letter_raw(&keys, &raw).await?;
                Ok(None)
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let keys = self.keys(delivery.queue);
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .lrem(&keys.processing, 1, &delivery.raw)
            .ignore()
            .zrem(&keys.leases, &delivery.raw)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn nack(&self, delivery: &Delivery) -> Result<NackOutcome, QueueError> {
        let keys = self.keys(delivery.queue);
        let Some(retry) = delivery.message.retried() else {
            self.dead_letter_raw(&keys, &delivery.raw).await?;
            return Ok(NackOutcome::DeadLettered);
        };

        let retry_raw = serde_json::to_string(&retry)?;
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .lrem(&keys.processing, 1, &delivery.raw)
            .ignore()
            .zrem(&keys.leases, &delivery.raw)
            .ignore()
            .lpush(&keys.ready, retry_raw)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(NackOutcome::Requeued {
            attempts: retry.attempts,
        })
    }

    async fn requeue_expired(&self, queue: QueueName) -> Result<usize, QueueError> {
        let keys = self.keys(queue);
        let mut conn = self.conn.clone();
        let moved: usize = redis::Script::new(REQUEUE_EXPIRED_SCRIPT)
            .key(&keys.leases)
            .key(&keys.processing)
            .key(&keys.ready)
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await?;
        Ok(moved)
    }
}
