use crate::data::ids::MatchId;
use eyre::Report;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transient storage failure: {0}")]
    Transient(String),
    #[error("write conflict on {match_id}: expected version {expected}, found {found}")]
    VersionConflict { match_id: MatchId, expected: u64, found: u64 },
    #[error("{0} not found")]
    MatchNotFound(MatchId),
    #[error("{0} already exists")]
    MatchExists(MatchId),
    #[error("ball record {0} already appended")]
    DuplicateBall(String),
    #[error("result already recorded for {0}")]
    ResultAlreadyRecorded(MatchId),
    #[error("internal storage error: {0}")]
    Internal(Report),
}

impl StoreError {
    /// Whether repeating the same unit of work may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::VersionConflict { .. })
    }
}

impl From<Report> for StoreError {
    fn from(error: Report) -> Self {
        Self::Internal(error)
    }
}
