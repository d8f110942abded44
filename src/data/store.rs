use super::ball_event::BallRecord;
use super::ids::MatchId;
use super::match_info::Match;
use super::match_result::MatchResult;
use super::snapshot::{MatchSnapshot, ScoringCommit};
use crate::store_error::StoreError;
use async_trait::async_trait;

/// Durable home of the running aggregates. The only writers are the scoring
/// components, always through [`AggregateStore::commit`].
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Register a match written by match setup.
    async fn create_match(&self, match_info: Match) -> Result<(), StoreError>;

    async fn load_snapshot(&self, match_id: MatchId) -> Result<Option<MatchSnapshot>, StoreError>;

    /// Apply every row of the commit atomically and return the new version.
    ///
    /// Fails with [`StoreError::VersionConflict`] if the match moved past
    /// `commit.expected_version`, and with [`StoreError::ResultAlreadyRecorded`] if the commit
    /// carries a result for a match that already has one.
    async fn commit(&self, commit: ScoringCommit) -> Result<u64, StoreError>;

    /// Audit trail in application order.
    async fn ball_records(&self, match_id: MatchId) -> Result<Vec<BallRecord>, StoreError>;

    async fn match_result(&self, match_id: MatchId) -> Result<Option<MatchResult>, StoreError> {
        Ok(self.load_snapshot(match_id).await?.and_then(|snapshot| snapshot.match_info.result))
    }
}
