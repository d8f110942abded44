use super::ids::{MatchId, TeamId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ResultKind {
    Win,
    Tie,
    Draw,
    NoResult,
    Abandoned,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "kebab-case")]
pub enum Margin {
    Runs(u32),
    Wickets(u32),
    InningsAndRuns(u32),
}

impl Margin {
    pub fn describe(&self) -> String {
        match self {
            Margin::Runs(runs) => format!("{} {}", runs, plural(*runs, "run", "runs")),
            Margin::Wickets(wickets) => format!("{} {}", wickets, plural(*wickets, "wicket", "wickets")),
            Margin::InningsAndRuns(runs) => format!("an innings and {} {}", runs, plural(*runs, "run", "runs")),
        }
    }
}

fn plural<'a>(n: u32, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

/// Final outcome of a match. Written once by the result resolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub match_id: MatchId,
    pub winning_team_id: Option<TeamId>,
    pub kind: ResultKind,
    pub margin: Option<Margin>,
    pub summary: String,
    pub decided_at: DateTime<Utc>,
}

impl MatchResult {
    pub fn is_decisive(&self) -> bool {
        self.winning_team_id.is_some()
    }
}
