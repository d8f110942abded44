use super::event::LiveEvent;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize live event: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("fan-out rejected the event: {0}")]
    Delivery(String),
    #[error("fan-out did not accept the event within {0:?}")]
    Timeout(Duration),
    #[error("publish channel is full")]
    ChannelFull,
    #[error("publish channel is closed")]
    ChannelClosed,
}

/// Downstream fan-out (WebSocket gateway, broker) that live events are forwarded to.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &LiveEvent) -> Result<(), PublishError>;
}

/// In-process fan-out to any number of subscribers. Slow subscribers lag and lose
/// the oldest events rather than holding up the publisher.
pub struct BroadcastSink {
    tx: broadcast::Sender<LiveEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn deliver(&self, event: &LiveEvent) -> Result<(), PublishError> {
        // no subscribers is not a failure, nobody is watching
        if let Err(e) = self.tx.send(event.clone()) {
            trace!("No live subscribers for {} ({})", e.0.match_id, e.0.event_type);
        }
        Ok(())
    }
}

/// Serializes each event to a JSON line for a text-based gateway.
pub struct JsonLineSink {
    tx: tokio::sync::mpsc::Sender<String>,
}

impl JsonLineSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for JsonLineSink {
    async fn deliver(&self, event: &LiveEvent) -> Result<(), PublishError> {
        let line = serde_json::to_string(event)?;
        self.tx.send(line).await.map_err(|_| PublishError::ChannelClosed)
    }
}
