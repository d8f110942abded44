use super::ball_event_hash::{BallEventHash, generate_ball_event_hash};
use super::ids::{MatchId, PlayerId, TeamId};
use crate::constants::EXTRA_PENALTY_RUNS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ExtrasKind {
    #[default]
    None,
    Wide,
    NoBall,
    Bye,
    LegBye,
}

impl ExtrasKind {
    /// Wides and no-balls have to be bowled again and do not advance the over.
    pub fn is_legal_delivery(&self) -> bool {
        !matches!(self, ExtrasKind::Wide | ExtrasKind::NoBall)
    }

    pub fn penalty_runs(&self) -> u32 {
        match self {
            ExtrasKind::Wide | ExtrasKind::NoBall => EXTRA_PENALTY_RUNS,
            _ => 0,
        }
    }

    pub fn counts_as_ball_faced(&self) -> bool {
        !matches!(self, ExtrasKind::Wide | ExtrasKind::Bye)
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            ExtrasKind::None => 0,
            ExtrasKind::Wide => 1,
            ExtrasKind::NoBall => 2,
            ExtrasKind::Bye => 3,
            ExtrasKind::LegBye => 4,
        }
    }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DismissalKind {
    Bowled,
    Caught,
    Lbw,
    Stumped,
    RunOut,
    HitWicket,
    ObstructingTheField,
}

impl DismissalKind {
    pub fn credited_to_bowler(&self) -> bool {
        !matches!(self, DismissalKind::RunOut | DismissalKind::ObstructingTheField)
    }

    /// Whether this mode of dismissal can happen on the given kind of delivery.
    pub fn possible_on(&self, extras: ExtrasKind) -> bool {
        match extras {
            ExtrasKind::Wide => matches!(
                self,
                DismissalKind::Stumped | DismissalKind::RunOut | DismissalKind::HitWicket | DismissalKind::ObstructingTheField
            ),
            ExtrasKind::NoBall => matches!(self, DismissalKind::RunOut | DismissalKind::ObstructingTheField),
            _ => true,
        }
    }

    /// Only run outs and obstruction can remove the non-striker.
    pub fn can_dismiss_non_striker(&self) -> bool {
        matches!(self, DismissalKind::RunOut | DismissalKind::ObstructingTheField)
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            DismissalKind::Bowled => 1,
            DismissalKind::Caught => 2,
            DismissalKind::Lbw => 3,
            DismissalKind::Stumped => 4,
            DismissalKind::RunOut => 5,
            DismissalKind::HitWicket => 6,
            DismissalKind::ObstructingTheField => 7,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wicket {
    pub dismissed_id: PlayerId,
    pub kind: DismissalKind,
    pub fielder_id: Option<PlayerId>,
}

/// One delivery as submitted by the scorer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallEvent {
    pub match_id: MatchId,
    /// Bowling team.
    pub team_id: TeamId,
    pub bowler_id: PlayerId,
    pub striker_id: PlayerId,
    pub non_striker_id: PlayerId,
    pub runs_off_bat: u32,
    pub extras: ExtrasKind,
    /// Runs credited as extras on top of any wide/no-ball penalty.
    #[serde(default)]
    pub extra_runs: u32,
    pub wicket: Option<Wicket>,
    pub over: u32,
    pub ball_in_over: u32,
    /// Index of this delivery in the inning, counting wides and no-balls.
    pub delivery: u32,
}

impl BallEvent {
    /// Extras added to the team total, penalty included.
    pub fn extras_total(&self) -> u32 {
        self.extras.penalty_runs() + self.extra_runs
    }

    pub fn total_runs(&self) -> u32 {
        self.runs_off_bat + self.extras_total()
    }

    /// Runs physically completed between the wickets, which decides strike rotation.
    pub fn runs_run(&self) -> u32 {
        self.runs_off_bat + self.extra_runs
    }

    /// Runs charged against the bowler's figures.
    pub fn runs_conceded_by_bowler(&self) -> u32 {
        match self.extras {
            ExtrasKind::Wide => self.extras_total(),
            ExtrasKind::NoBall => self.extras.penalty_runs() + self.runs_off_bat,
            ExtrasKind::Bye | ExtrasKind::LegBye => 0,
            ExtrasKind::None => self.runs_off_bat,
        }
    }

    pub fn is_legal_delivery(&self) -> bool {
        self.extras.is_legal_delivery()
    }
}

/// Append-only audit row for an applied delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallRecord {
    pub inning_sequence: u32,
    pub batting_team_id: TeamId,
    pub event: BallEvent,
    pub hash: BallEventHash,
    pub recorded_at: DateTime<Utc>,
}

impl BallRecord {
    pub fn new(inning_sequence: u32, batting_team_id: TeamId, event: BallEvent, recorded_at: DateTime<Utc>) -> Self {
        let hash = generate_ball_event_hash(inning_sequence, &event);
        Self { inning_sequence, batting_team_id, event, hash, recorded_at }
    }
}
