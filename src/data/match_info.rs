use super::ids::{MatchId, PlayerId, TeamId};
use super::match_result::MatchResult;
use crate::constants::{BallLimit, BowlerQuota, DEFAULT_TEAM_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, EnumIter, Serialize, Deserialize)]
pub enum MatchFormat {
    T20,
    #[strum(serialize = "ODI")]
    #[serde(rename = "ODI")]
    Odi,
    Test,
}

impl MatchFormat {
    /// Legal balls after which an inning is over, `None` when overs are unbounded.
    pub fn ball_limit(&self) -> Option<u32> {
        match self {
            MatchFormat::T20 => Some(BallLimit::T20),
            MatchFormat::Odi => Some(BallLimit::ODI),
            MatchFormat::Test => None,
        }
    }

    pub fn innings_per_side(&self) -> u32 {
        match self {
            MatchFormat::Test => 2,
            _ => 1,
        }
    }

    pub fn total_innings(&self) -> u32 {
        self.innings_per_side() * 2
    }

    pub fn is_limited_overs(&self) -> bool {
        self.ball_limit().is_some()
    }

    pub fn max_overs_per_bowler(&self) -> Option<u32> {
        match self {
            MatchFormat::T20 => Some(BowlerQuota::T20),
            MatchFormat::Odi => Some(BowlerQuota::ODI),
            MatchFormat::Test => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Completed,
    Abandoned,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Abandoned)
    }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TossDecision {
    Bat,
    Bowl,
}

/// Toss outcome recorded by match setup before the first inning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toss {
    pub winner: TeamId,
    pub decision: TossDecision,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub format: MatchFormat,
    pub teams: [TeamId; 2],
    pub status: MatchStatus,
    pub toss: Option<Toss>,
    /// Starting lineups written once by match setup. Empty when setup recorded none.
    #[serde(default)]
    pub squads: HashMap<TeamId, Vec<PlayerId>>,
    /// Set when play was ended externally (time expired) before a natural finish.
    #[serde(default)]
    pub play_concluded: bool,
    pub result: Option<MatchResult>,
}

impl Match {
    pub fn new(id: MatchId, format: MatchFormat, home: TeamId, away: TeamId) -> Self {
        Self {
            id,
            format,
            teams: [home, away],
            status: MatchStatus::Scheduled,
            toss: None,
            squads: HashMap::new(),
            play_concluded: false,
            result: None,
        }
    }

    pub fn with_toss(mut self, winner: TeamId, decision: TossDecision) -> Self {
        self.toss = Some(Toss { winner, decision });
        self
    }

    pub fn with_squad(mut self, team_id: TeamId, players: Vec<PlayerId>) -> Self {
        self.squads.insert(team_id, players);
        self
    }

    pub fn is_participant(&self, team_id: TeamId) -> bool {
        self.teams.contains(&team_id)
    }

    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        match self.teams {
            [home, away] if home == team_id => Some(away),
            [home, away] if away == team_id => Some(home),
            _ => None,
        }
    }

    /// Team that bats in the first inning according to the toss.
    pub fn first_batting_team(&self) -> Option<TeamId> {
        let toss = self.toss?;
        match toss.decision {
            TossDecision::Bat => Some(toss.winner),
            TossDecision::Bowl => self.opponent_of(toss.winner),
        }
    }

    pub fn team_size(&self, team_id: TeamId) -> u32 {
        match self.squads.get(&team_id) {
            Some(squad) if !squad.is_empty() => squad.len() as u32,
            _ => DEFAULT_TEAM_SIZE,
        }
    }

    /// Squad membership check. Teams without a recorded lineup accept any player.
    pub fn in_squad(&self, team_id: TeamId, player_id: PlayerId) -> bool {
        match self.squads.get(&team_id) {
            Some(squad) if !squad.is_empty() => squad.contains(&player_id),
            _ => true,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }
}
