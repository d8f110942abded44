use crate::data::{BallRecord, CompletionReason, Inning, MatchResult, PlayerId, TeamId, Wicket};
use serde::{Deserialize, Serialize};

/// Request to open the next inning of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInning {
    pub team_id: TeamId,
    pub striker: PlayerId,
    pub non_striker: PlayerId,
    pub bowler: PlayerId,
    /// Test only: the team that batted second is made to bat again immediately.
    #[serde(default)]
    pub follow_on: bool,
}

impl OpenInning {
    pub fn new(team_id: TeamId, striker: PlayerId, non_striker: PlayerId, bowler: PlayerId) -> Self {
        Self { team_id, striker, non_striker, bowler, follow_on: false }
    }

    pub fn with_follow_on(mut self) -> Self {
        self.follow_on = true;
        self
    }
}

/// Aggregates after one delivery was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedBall {
    pub inning_sequence: u32,
    pub batting_team_id: TeamId,
    pub record: BallRecord,
    pub score: u32,
    pub wickets: u32,
    pub legal_balls: u32,
    pub overs: String,
    pub run_rate: f64,
    pub target_run_rate: Option<f64>,
    pub striker: Option<PlayerId>,
    pub non_striker: Option<PlayerId>,
    pub current_bowler: Option<PlayerId>,
    pub strike_rotated: bool,
    pub over_completed: bool,
    pub wicket: Option<Wicket>,
}

impl AppliedBall {
    /// Next ball needs a new batsman nominated first.
    pub fn awaiting_batsman(&self) -> bool {
        self.striker.is_none() || self.non_striker.is_none()
    }

    /// Next ball needs a bowler assigned first.
    pub fn awaiting_bowler(&self) -> bool {
        self.current_bowler.is_none()
    }
}

/// An inning that just transitioned to completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InningCompletion {
    pub inning_sequence: u32,
    pub team_id: TeamId,
    pub reason: CompletionReason,
    pub score: u32,
    pub wickets: u32,
    pub overs: String,
    pub run_rate: f64,
    pub target: Option<u32>,
    pub target_run_rate: Option<f64>,
}

impl InningCompletion {
    pub fn from_inning(inning: &Inning, reason: CompletionReason) -> Self {
        Self {
            inning_sequence: inning.sequence,
            team_id: inning.team_id,
            reason,
            score: inning.score,
            wickets: inning.wickets,
            overs: inning.overs_display(),
            run_rate: inning.run_rate,
            target: inning.target,
            target_run_rate: inning.target_run_rate,
        }
    }
}

/// Which end a player now occupies after a crease change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreaseChange {
    pub inning_sequence: u32,
    pub striker: Option<PlayerId>,
    pub non_striker: Option<PlayerId>,
    pub current_bowler: Option<PlayerId>,
}

impl CreaseChange {
    pub fn from_inning(inning: &Inning) -> Self {
        Self {
            inning_sequence: inning.sequence,
            striker: inning.striker,
            non_striker: inning.non_striker,
            current_bowler: inning.current_bowler,
        }
    }
}

/// Everything a successful `apply_ball_event` call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallOutcome {
    pub applied: AppliedBall,
    pub completion: Option<InningCompletion>,
    pub result: Option<MatchResult>,
}
