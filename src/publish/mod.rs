/// Publish Layer - Live State Publisher
///
/// Best-effort notification of accepted scoring steps to live viewers:
/// - `LiveEvent` is the `{type, matchID, payload}` envelope (score update, inning status, match result)
/// - `LiveStatePublisher` queues events on a bounded channel and forwards them from a background task
/// - `EventSink` is the seam to the downstream fan-out, `BroadcastSink` the in-process one
///
/// Publish failures are counted and logged, never returned to the scoring path.

pub mod event;
pub mod publisher;
pub mod sink;

pub use event::{LiveEvent, LiveEventType};
pub use publisher::{LiveStatePublisher, PublisherConfig, PublisherStats, PublisherStatsSnapshot};
pub use sink::{BroadcastSink, EventSink, JsonLineSink, PublishError};
