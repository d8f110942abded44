use super::ball_event::DismissalKind;
use super::ids::{MatchId, PlayerId, TeamId};
use super::inning::runs_per_over;
use crate::constants::BALLS_PER_OVER;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dismissal {
    pub kind: DismissalKind,
    pub bowler_id: Option<PlayerId>,
    pub fielder_id: Option<PlayerId>,
    /// Team score when the wicket fell.
    pub at_score: u32,
}

/// Batting figures of one player in one inning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatsmanInningStat {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub inning_sequence: u32,
    pub player_id: PlayerId,
    pub batting_position: u32,
    pub runs: u32,
    pub balls_faced: u32,
    pub fours: u32,
    pub sixes: u32,
    pub is_striker: bool,
    pub is_currently_batting: bool,
    pub dismissal: Option<Dismissal>,
}

impl BatsmanInningStat {
    pub fn new(match_id: MatchId, team_id: TeamId, inning_sequence: u32, player_id: PlayerId, batting_position: u32) -> Self {
        Self {
            match_id,
            team_id,
            inning_sequence,
            player_id,
            batting_position,
            runs: 0,
            balls_faced: 0,
            fours: 0,
            sixes: 0,
            is_striker: false,
            is_currently_batting: true,
            dismissal: None,
        }
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissal.is_some()
    }

    pub fn strike_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            return 0.0;
        }
        self.runs as f64 * 100.0 / self.balls_faced as f64
    }
}

/// Bowling figures of one player in one inning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BowlerInningStat {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub inning_sequence: u32,
    pub player_id: PlayerId,
    pub legal_balls: u32,
    pub runs_conceded: u32,
    pub wickets: u32,
    pub wides: u32,
    pub no_balls: u32,
    pub maidens: u32,
    /// Runs charged in the over currently being bowled, for maiden detection.
    pub current_over_runs: u32,
    pub is_current_bowler: bool,
}

impl BowlerInningStat {
    pub fn new(match_id: MatchId, team_id: TeamId, inning_sequence: u32, player_id: PlayerId) -> Self {
        Self {
            match_id,
            team_id,
            inning_sequence,
            player_id,
            legal_balls: 0,
            runs_conceded: 0,
            wickets: 0,
            wides: 0,
            no_balls: 0,
            maidens: 0,
            current_over_runs: 0,
            is_current_bowler: false,
        }
    }

    pub fn overs_completed(&self) -> u32 {
        self.legal_balls / BALLS_PER_OVER
    }

    pub fn overs_display(&self) -> String {
        format!("{}.{}", self.legal_balls / BALLS_PER_OVER, self.legal_balls % BALLS_PER_OVER)
    }

    pub fn economy(&self) -> f64 {
        runs_per_over(self.runs_conceded, self.legal_balls)
    }
}
