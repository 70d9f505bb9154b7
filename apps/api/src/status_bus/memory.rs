//! Broadcast-channel bus for tests. Records every published event.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::broadcast;

use super::{BusError, StatusBus, StatusEvent};

pub struct MemoryBus {
    sender: broadcast::Sender<StatusEvent>,
    published: Mutex<Vec<StatusEvent>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            sender,
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<StatusEvent> {
        self.published.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl StatusBus for MemoryBus {
    async fn publish(&self, event: &StatusEvent) -> Result<(), BusError> {
        self.published.lock().unwrap().push(event.clone());
        // No subscribers is not an error: events are fire-and-forget.
        let _ = self.sender.send(event.clone());
        Ok(())
    }

    async fn subscribe(&self) -> Result<BoxStream<'static, StatusEvent>, BusError> {
        Ok(receiver_stream(self.sender.subscribe()))
    }
}

fn receiver_stream(receiver: broadcast::Receiver<StatusEvent>) -> BoxStream<'static, StatusEvent> {
    futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((event, receiver)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}
