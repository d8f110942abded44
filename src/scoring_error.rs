use crate::data::{MatchFormat, MatchId, MatchStatus, PlayerId, TeamId};
use crate::store_error::StoreError;
use std::time::Duration;

/// Malformed or out-of-rules requests. Never retried, never mutate state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown {0}")]
    UnknownMatch(MatchId),
    #[error("{0} is already registered")]
    DuplicateMatch(MatchId),
    #[error("{team_id} does not play in {match_id}")]
    UnknownTeam { match_id: MatchId, team_id: TeamId },
    #[error("{player_id} is not in the squad of {team_id}")]
    UnknownPlayer { team_id: TeamId, player_id: PlayerId },
    #[error("{match_id} is {status}, expected {expected}")]
    MatchStatus { match_id: MatchId, status: MatchStatus, expected: MatchStatus },
    #[error("{0} has no toss recorded")]
    MissingToss(MatchId),
    #[error("no inning in progress for {team_id} in {match_id}")]
    NoInningInProgress { match_id: MatchId, team_id: TeamId },
    #[error("inning {sequence} of {match_id} is already completed")]
    InningCompleted { match_id: MatchId, sequence: u32 },
    #[error("inning {sequence} of {match_id} is still in progress")]
    InningInProgress { match_id: MatchId, sequence: u32 },
    #[error("{match_id} already has all {limit} innings")]
    InningLimitReached { match_id: MatchId, limit: u32 },
    #[error("{team_id} cannot bat in inning {sequence}")]
    BattingOrder { team_id: TeamId, sequence: u32 },
    #[error("follow-on not available: {0}")]
    FollowOn(String),
    #[error("{action} is not allowed in {format} matches")]
    NotAllowedForFormat { action: &'static str, format: MatchFormat },
    #[error("{0} cannot bowl consecutive overs")]
    ConsecutiveOvers(PlayerId),
    #[error("{player_id} has bowled the maximum of {quota} overs")]
    BowlerQuota { player_id: PlayerId, quota: u32 },
    #[error("{0} cannot open at both ends")]
    DuplicateOpener(PlayerId),
    #[error("{0} has already batted in this inning")]
    AlreadyBatted(PlayerId),
    #[error("malformed ball event: {0}")]
    MalformedEvent(String),
}

/// The request disagrees with the current active-player or position state.
/// The caller must resubmit against fresh state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StaleStateError {
    #[error("striker {got} is not on strike (on strike: {expected:?})")]
    StrikerNotActive { expected: Option<PlayerId>, got: PlayerId },
    #[error("non-striker {got} is not at the non-striker's end (expected {expected:?})")]
    NonStrikerNotActive { expected: Option<PlayerId>, got: PlayerId },
    #[error("bowler {got} is not the current bowler (current: {expected:?})")]
    BowlerNotActive { expected: Option<PlayerId>, got: PlayerId },
    #[error("delivery out of sequence: expected delivery {expected_delivery} ({expected_over}.{expected_ball}), got {got_delivery} ({got_over}.{got_ball})")]
    OutOfSequence {
        expected_delivery: u32,
        expected_over: u32,
        expected_ball: u32,
        got_delivery: u32,
        got_over: u32,
        got_ball: u32,
    },
    #[error("a new batsman must be nominated before the next ball")]
    AwaitingBatsman,
    #[error("a bowler must be assigned before the next over")]
    AwaitingBowler,
    #[error("no vacancy at the crease")]
    CreaseFull,
    #[error("{0} is still bowling the current over")]
    OverInProgress(PlayerId),
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("stale state: {0}")]
    StaleState(#[from] StaleStateError),
    #[error("storage failed after {attempts} attempt(s): {source}")]
    Storage {
        attempts: u32,
        #[source]
        source: StoreError,
    },
    #[error("scoring call on {match_id} timed out after {elapsed:?}")]
    Timeout { match_id: MatchId, elapsed: Duration },
}

impl ScoringError {
    /// Storage exhaustion and timeouts leave no partial state and may be resubmitted as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScoringError::Storage { .. } | ScoringError::Timeout { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ScoringError::Validation(_))
    }

    pub fn is_stale_state(&self) -> bool {
        matches!(self, ScoringError::StaleState(_))
    }
}

pub type ScoringResult<T> = Result<T, ScoringError>;
