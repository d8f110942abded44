use super::event::LiveEvent;
use super::sink::{EventSink, PublishError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Events buffered between the scoring path and the forwarding task.
    pub channel_capacity: usize,
    /// Bound on a single hand-off to the sink.
    pub delivery_timeout: Duration,
    /// Hand-offs attempted per event before it is dropped.
    pub max_attempts: u32,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            delivery_timeout: Duration::from_millis(250),
            max_attempts: 2,
        }
    }
}

#[derive(Debug, Default)]
pub struct PublisherStats {
    pub published: AtomicU64,
    pub delivered: AtomicU64,
    pub dropped: AtomicU64,
    pub failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublisherStatsSnapshot {
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl PublisherStats {
    pub fn snapshot(&self) -> PublisherStatsSnapshot {
        PublisherStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Live State Publisher
///
/// `publish` never waits: events go into a bounded channel and a background task hands
/// them to the sink. A full channel or a failing sink costs the event, never the caller.
pub struct LiveStatePublisher {
    tx: mpsc::Sender<LiveEvent>,
    stats: Arc<PublisherStats>,
    forward_task: JoinHandle<()>,
}

impl LiveStatePublisher {
    /// Start the forwarding task. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn EventSink>, config: PublisherConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let stats = Arc::new(PublisherStats::default());
        let forward_task = tokio::spawn(forward(rx, sink, config, Arc::clone(&stats)));
        Self { tx, stats, forward_task }
    }

    /// Queue `event` for delivery without waiting. A refused event is counted and logged;
    /// the error is returned for callers that want it, scoring ignores it.
    pub fn publish(&self, event: LiveEvent) -> Result<(), PublishError> {
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        let Err(e) = self.tx.try_send(event) else {
            return Ok(());
        };
        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        let err = match e {
            mpsc::error::TrySendError::Full(event) => {
                warn!("Dropping {} for {}: {}", event.event_type, event.match_id, PublishError::ChannelFull);
                PublishError::ChannelFull
            }
            mpsc::error::TrySendError::Closed(event) => {
                error!("Dropping {} for {}: {}", event.event_type, event.match_id, PublishError::ChannelClosed);
                PublishError::ChannelClosed
            }
        };
        Err(err)
    }

    pub fn stats(&self) -> PublisherStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        !self.forward_task.is_finished()
    }

    /// Close the channel and wait until every queued event was handed to the sink.
    pub async fn shutdown(self) -> PublisherStatsSnapshot {
        let Self { tx, stats, forward_task } = self;
        drop(tx);
        if let Err(e) = forward_task.await {
            warn!("Live event forwarding task error during shutdown: {}", e);
        }
        stats.snapshot()
    }
}

async fn forward(mut rx: mpsc::Receiver<LiveEvent>, sink: Arc<dyn EventSink>, config: PublisherConfig, stats: Arc<PublisherStats>) {
    debug!("Live event forwarding task started");
    while let Some(event) = rx.recv().await {
        match deliver_with_attempts(sink.as_ref(), &event, &config).await {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping {} for {} after {} attempt(s): {}", event.event_type, event.match_id, config.max_attempts.max(1), e);
            }
        }
    }
    info!("Live event forwarding task ended");
}

async fn deliver_with_attempts(sink: &dyn EventSink, event: &LiveEvent, config: &PublisherConfig) -> Result<(), PublishError> {
    let attempts = config.max_attempts.max(1);
    let mut last_error = PublishError::Timeout(config.delivery_timeout);
    for attempt in 1..=attempts {
        match tokio::time::timeout(config.delivery_timeout, sink.deliver(event)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = e,
            Err(_) => last_error = PublishError::Timeout(config.delivery_timeout),
        }
        debug!("Delivery attempt {}/{} of {} failed: {}", attempt, attempts, event.event_type, last_error);
    }
    Err(last_error)
}
