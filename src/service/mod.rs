/// Service Layer
///
/// Ties the scoring components together behind `ScoringService`:
///
/// - per-match serialization of every mutating call
/// - a bounded timeout per call and bounded retry of transient storage failures
/// - ball → inning completion → match result inside one atomic commit
/// - cache invalidation and live notification after each accepted change

pub mod config;
pub mod retry;
pub mod scoring_service;


pub use config::{ScoringConfig, ScoringConfigFile};
pub use retry::RetryPolicy;
pub use scoring_service::{ScoringService, ScoringServiceBuilder, TeamNames};
