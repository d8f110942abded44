use super::ids::{MatchId, PlayerId, TeamId};
use crate::constants::BALLS_PER_OVER;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Unique key of an inning within the store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InningKey {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub sequence: u32,
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InningState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CompletionReason {
    AllOut,
    OversExhausted,
    Declared,
    TargetReached,
    MatchConcluded,
}

/// One team's batting innings. The inning owns the active-player pointers; the
/// per-player stat rows mirror them through their active flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inning {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub bowling_team_id: TeamId,
    pub sequence: u32,
    pub score: u32,
    pub wickets: u32,
    pub legal_balls: u32,
    /// Every delivery including wides and no-balls.
    pub deliveries: u32,
    pub extras: u32,
    pub run_rate: f64,
    pub target: Option<u32>,
    pub target_run_rate: Option<f64>,
    pub follow_on: bool,
    pub declared: bool,
    pub completed: bool,
    pub completion_reason: Option<CompletionReason>,
    pub striker: Option<PlayerId>,
    pub non_striker: Option<PlayerId>,
    pub current_bowler: Option<PlayerId>,
    pub previous_over_bowler: Option<PlayerId>,
}

impl Inning {
    pub fn open(match_id: MatchId, team_id: TeamId, bowling_team_id: TeamId, sequence: u32) -> Self {
        Self {
            match_id,
            team_id,
            bowling_team_id,
            sequence,
            score: 0,
            wickets: 0,
            legal_balls: 0,
            deliveries: 0,
            extras: 0,
            run_rate: 0.0,
            target: None,
            target_run_rate: None,
            follow_on: false,
            declared: false,
            completed: false,
            completion_reason: None,
            striker: None,
            non_striker: None,
            current_bowler: None,
            previous_over_bowler: None,
        }
    }

    pub fn key(&self) -> InningKey {
        InningKey { match_id: self.match_id, team_id: self.team_id, sequence: self.sequence }
    }

    pub fn state(&self) -> InningState {
        if self.completed {
            InningState::Completed
        } else if self.deliveries == 0 {
            InningState::NotStarted
        } else {
            InningState::InProgress
        }
    }

    pub fn is_chasing(&self) -> bool {
        self.target.is_some()
    }

    /// Over currently being bowled, 0-based.
    pub fn current_over(&self) -> u32 {
        self.legal_balls / BALLS_PER_OVER
    }

    /// Position of the next legal ball inside the current over, 1-based.
    pub fn next_ball_in_over(&self) -> u32 {
        self.legal_balls % BALLS_PER_OVER + 1
    }

    /// Overs in the conventional `overs.balls` notation, e.g. `12.3`.
    pub fn overs_display(&self) -> String {
        format!("{}.{}", self.legal_balls / BALLS_PER_OVER, self.legal_balls % BALLS_PER_OVER)
    }

    pub fn runs_required(&self) -> Option<u32> {
        self.target.map(|target| target.saturating_sub(self.score))
    }

    pub fn remaining_balls(&self, ball_limit: Option<u32>) -> Option<u32> {
        ball_limit.map(|limit| limit.saturating_sub(self.legal_balls))
    }

    /// Both ends must be occupied and a bowler assigned before the next delivery.
    pub fn ready_for_delivery(&self) -> bool {
        self.striker.is_some() && self.non_striker.is_some() && self.current_bowler.is_some()
    }

    /// Recompute the current run rate and, for a chase, the rate required over the remaining overs.
    pub fn recompute_rates(&mut self, ball_limit: Option<u32>) {
        self.run_rate = runs_per_over(self.score, self.legal_balls);
        self.target_run_rate = match (self.runs_required(), self.remaining_balls(ball_limit)) {
            (Some(required), Some(remaining)) if remaining > 0 => Some(runs_per_over(required, remaining)),
            _ => None,
        };
    }
}

pub fn runs_per_over(runs: u32, balls: u32) -> f64 {
    if balls == 0 {
        return 0.0;
    }
    runs as f64 * BALLS_PER_OVER as f64 / balls as f64
}
