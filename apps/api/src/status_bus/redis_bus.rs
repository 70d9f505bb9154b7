use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, warn};

use super::{BusError, StatusBus, StatusEvent};

/// Publishes on one named Redis channel. Each subscription holds its own
/// pub/sub connection, released when the returned stream is dropped.
pub struct RedisBus {
    client: redis::Client,
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisBus {
    pub async fn connect(client: redis::Client, channel: String) -> Result<Self, BusError> {
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self {
            client,
            conn,
            channel,
        })
    }
}

#[async_trait]
impl StatusBus for RedisBus {
    async fn publish(&self, event: &StatusEvent) -> Result<(), BusError> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(&self.channel, payload).await?;
        debug!(channel = %self.channel, receivers, "Published status event");
        Ok(())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, StatusEvent>, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;
        let channel = self.channel.clone();

        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let decoded = msg
                .get_payload::<String>()
                .map_err(BusError::from)
                .and_then(|raw| serde_json::from_str::<StatusEvent>(&raw).map_err(BusError::from));
            let event = match decoded {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(channel = %channel, "Skipping undecodable status event: {e}");
                    None
                }
            };
            futures::future::ready(event)
        });

        Ok(stream.boxed())
    }
}
