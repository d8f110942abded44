use crate::data::{CompletionReason, Inning, Margin, MatchFormat, MatchResult, MatchSnapshot, MatchStatus, ResultKind, TeamId};
use crate::scoring_error::{ScoringResult, ValidationError};
use chrono::{DateTime, Utc};
use tracing::info;

/// What the completed innings of a match say about its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// More play is required before anything can be decided.
    Pending,
    Win { winner: TeamId, margin: Margin },
    Tie,
    Draw,
    NoResult,
}

impl Outcome {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}

/// Decides the match outcome from innings totals keyed by team and sequence.
#[derive(Debug, Clone, Default)]
pub struct MatchResultResolver;

impl MatchResultResolver {
    pub fn new() -> Self {
        Self
    }

    /// Pure decision over the snapshot. Innings cut short by the end of play count
    /// towards a draw or no-result, never towards a decisive result.
    pub fn decide(&self, snapshot: &MatchSnapshot) -> Outcome {
        let format = snapshot.match_info.format;
        let finished: Vec<&Inning> = snapshot
            .innings
            .iter()
            .take_while(|inning| inning.completed && inning.completion_reason != Some(CompletionReason::MatchConcluded))
            .collect();

        let decided = match (format, finished.len()) {
            (MatchFormat::Test, 3) => innings_victory(snapshot, &finished),
            (MatchFormat::Test, 4) => compare_totals(snapshot, &finished),
            (_, 2) if format.is_limited_overs() => compare_totals(snapshot, &finished),
            _ => Outcome::Pending,
        };

        match decided {
            Outcome::Pending if snapshot.match_info.play_concluded => {
                if format.is_limited_overs() {
                    Outcome::NoResult
                } else {
                    Outcome::Draw
                }
            }
            outcome => outcome,
        }
    }

    /// Turn a decided outcome into the persisted result row.
    pub fn build_result<F>(&self, snapshot: &MatchSnapshot, outcome: Outcome, team_name: F, decided_at: DateTime<Utc>) -> Option<MatchResult>
    where
        F: Fn(TeamId) -> String,
    {
        let (kind, winning_team_id, margin, summary) = match outcome {
            Outcome::Pending => return None,
            Outcome::Win { winner, margin } => {
                (ResultKind::Win, Some(winner), Some(margin), format!("{} won by {}", team_name(winner), margin.describe()))
            }
            Outcome::Tie => (ResultKind::Tie, None, None, "Match tied".to_string()),
            Outcome::Draw => (ResultKind::Draw, None, None, "Match drawn".to_string()),
            Outcome::NoResult => (ResultKind::NoResult, None, None, "No result".to_string()),
        };
        Some(MatchResult { match_id: snapshot.match_id(), winning_team_id, kind, margin, summary, decided_at })
    }

    /// Attach the result to the match and close it. A match keeps its first result.
    pub fn record(&self, snapshot: &mut MatchSnapshot, result: MatchResult) -> ScoringResult<()> {
        let match_info = &mut snapshot.match_info;
        if match_info.result.is_some() || match_info.status.is_terminal() {
            return Err(ValidationError::MatchStatus { match_id: match_info.id, status: match_info.status, expected: MatchStatus::Live }.into());
        }
        match_info.status = match result.kind {
            ResultKind::Abandoned => MatchStatus::Abandoned,
            _ => MatchStatus::Completed,
        };
        info!("{} {}: {}", match_info.id, match_info.status, result.summary);
        match_info.result = Some(result);
        Ok(())
    }

    /// Abandon a scheduled or live match.
    pub fn abandon(&self, snapshot: &mut MatchSnapshot, decided_at: DateTime<Utc>) -> ScoringResult<MatchResult> {
        let result = MatchResult {
            match_id: snapshot.match_id(),
            winning_team_id: None,
            kind: ResultKind::Abandoned,
            margin: None,
            summary: "Match abandoned".to_string(),
            decided_at,
        };
        self.record(snapshot, result.clone())?;
        Ok(result)
    }
}

/// After three innings, the side that batted twice may still trail the other's single inning.
fn innings_victory(snapshot: &MatchSnapshot, finished: &[&Inning]) -> Outcome {
    let twice = finished[2].team_id;
    let Some(once) = snapshot.match_info.opponent_of(twice) else {
        return Outcome::Pending;
    };
    let total = |team: TeamId| -> u32 { finished.iter().filter(|inning| inning.team_id == team).map(|inning| inning.score).sum() };

    let (twice_total, once_total) = (total(twice), total(once));
    if twice_total < once_total {
        Outcome::Win { winner: once, margin: Margin::InningsAndRuns(once_total - twice_total) }
    } else {
        Outcome::Pending
    }
}

/// Every scheduled inning is in: the side batting last either chased the target down or fell short.
fn compare_totals(snapshot: &MatchSnapshot, finished: &[&Inning]) -> Outcome {
    let Some(last) = finished.last() else {
        return Outcome::Pending;
    };
    let chaser = last.team_id;
    let Some(defender) = snapshot.match_info.opponent_of(chaser) else {
        return Outcome::Pending;
    };
    let (chaser_total, defender_total) = (snapshot.team_total(chaser), snapshot.team_total(defender));

    if chaser_total > defender_total {
        let wickets_left = snapshot.match_info.team_size(chaser).saturating_sub(1).saturating_sub(last.wickets);
        Outcome::Win { winner: chaser, margin: Margin::Wickets(wickets_left) }
    } else if defender_total > chaser_total {
        Outcome::Win { winner: defender, margin: Margin::Runs(defender_total - chaser_total) }
    } else {
        Outcome::Tie
    }
}
