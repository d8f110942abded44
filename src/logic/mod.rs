/// Logic Layer - Scoring Engine
///
/// This layer is responsible for:
/// - Validating and applying ball events to the running aggregates
/// - Strike and bowler rotation
/// - Inning lifecycle transitions (all out, overs exhausted, declaration, target reached)
/// - Match result resolution keyed by team and inning sequence
/// - Read-only projections of the players currently in action
///
/// Everything here works on an in-memory `MatchSnapshot`; persistence and notification are
/// left to the service layer.

pub mod ball_processor;
pub mod lifecycle;
pub mod query;
pub mod resolver;
pub mod strike;
pub mod types;


// Re-export key components from the logic layer
pub use ball_processor::BallEventProcessor;
pub use lifecycle::InningLifecycleDetector;
pub use query::{CurrentBatsmen, CurrentBowler, LiveQuery, QueryCacheStats, project_batsmen, project_bowler};
pub use resolver::{MatchResultResolver, Outcome};
pub use strike::should_rotate_strike;
pub use types::{AppliedBall, BallOutcome, CreaseChange, InningCompletion, OpenInning};
