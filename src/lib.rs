// Layered Architecture
pub mod data;       // Data Layer: Aggregate rows, snapshots, the aggregate store
pub mod logic;      // Logic Layer: Ball processing, inning lifecycle, result resolution
pub mod publish;    // Publish Layer: Live event fan-out to viewers
pub mod service;    // Service Layer: Serialized, retried, atomically committed units of work

// Common utilities and types
pub mod constants;
pub mod scoring_error;
pub mod store_error;
pub mod utils;

// Re-export key components from each layer
pub use data::{
    AggregateStore, BallEvent, BallRecord, DismissalKind, ExtrasKind, IdentityDirectory, Inning, Margin, Match, MatchFormat, MatchId,
    MatchResult, MatchSnapshot, MatchStatus, MemoryAggregateStore, PlayerId, ResultKind, StaticDirectory, TeamId, Toss, TossDecision,
    Wicket,
};
pub use logic::{
    AppliedBall, BallEventProcessor, BallOutcome, CreaseChange, CurrentBatsmen, CurrentBowler, InningCompletion, InningLifecycleDetector,
    MatchResultResolver, OpenInning, Outcome,
};
pub use publish::{BroadcastSink, EventSink, JsonLineSink, LiveEvent, LiveEventType, LiveStatePublisher, PublishError};
pub use scoring_error::{ScoringError, ScoringResult, StaleStateError, ValidationError};
pub use service::{ScoringConfig, ScoringService, ScoringServiceBuilder};
pub use store_error::StoreError;
