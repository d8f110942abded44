/// Data Layer - Aggregate Store
///
/// Row types for matches, innings, per-player figures and the ball-by-ball audit
/// trail, plus the store that persists them:
/// - `MatchSnapshot` is the per-match working set read by the scoring components
/// - `ScoringCommit` carries the changed rows of one unit of work, applied atomically
/// - `AggregateStore` is the persistence seam, `MemoryAggregateStore` the in-process backend
/// - `IdentityDirectory` is the read-only registry lookup consumed for display names

pub mod ids;
pub mod match_info;
pub mod match_result;
pub mod inning;
pub mod player_stats;
pub mod ball_event;
pub mod ball_event_hash;
pub mod snapshot;
pub mod store;
pub mod memory_store;
pub mod directory;

pub use ids::{MatchId, PlayerId, TeamId};
pub use match_info::{Match, MatchFormat, MatchStatus, Toss, TossDecision};
pub use match_result::{Margin, MatchResult, ResultKind};
pub use inning::{CompletionReason, Inning, InningKey, InningState};
pub use player_stats::{BatsmanInningStat, BowlerInningStat, Dismissal};
pub use ball_event::{BallEvent, BallRecord, DismissalKind, ExtrasKind, Wicket};
pub use ball_event_hash::{BallEventHash, generate_ball_event_hash};
pub use snapshot::{FastHashMap, MatchSnapshot, ScoringCommit, StatKey};
pub use store::AggregateStore;
pub use memory_store::{MemoryAggregateStore, MemoryStoreStats};
pub use directory::{IdentityDirectory, PlayerProfile, StaticDirectory, TeamProfile};
