use crate::data::{InningState, MatchId, MatchResult};
use crate::logic::{AppliedBall, CreaseChange, InningCompletion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum_macros::Display;

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LiveEventType {
    ScoreUpdate,
    InningStatus,
    MatchResult,
}

/// Notification pushed to live viewers, serialized as `{type, matchID, payload, emittedAt}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    #[serde(rename = "type")]
    pub event_type: LiveEventType,
    #[serde(rename = "matchID")]
    pub match_id: MatchId,
    pub payload: Value,
    #[serde(rename = "emittedAt")]
    pub emitted_at: DateTime<Utc>,
}

impl LiveEvent {
    pub fn new(event_type: LiveEventType, match_id: MatchId, payload: Value) -> Self {
        Self { event_type, match_id, payload, emitted_at: Utc::now() }
    }

    pub fn score_update(match_id: MatchId, applied: &AppliedBall) -> Self {
        let event = &applied.record.event;
        let payload = json!({
            "inningSequence": applied.inning_sequence,
            "teamID": applied.batting_team_id,
            "score": applied.score,
            "wickets": applied.wickets,
            "overs": applied.overs,
            "runRate": applied.run_rate,
            "targetRunRate": applied.target_run_rate,
            "ball": {
                "over": event.over,
                "ballInOver": event.ball_in_over,
                "runsOffBat": event.runs_off_bat,
                "extras": event.extras,
                "extraRuns": event.extra_runs,
                "wicket": event.wicket,
            },
            "striker": applied.striker,
            "nonStriker": applied.non_striker,
            "currentBowler": applied.current_bowler,
        });
        Self::new(LiveEventType::ScoreUpdate, match_id, payload)
    }

    /// A new batsman or bowler came in without a ball being bowled.
    pub fn crease_update(match_id: MatchId, change: &CreaseChange) -> Self {
        let payload = json!({
            "inningSequence": change.inning_sequence,
            "striker": change.striker,
            "nonStriker": change.non_striker,
            "currentBowler": change.current_bowler,
        });
        Self::new(LiveEventType::ScoreUpdate, match_id, payload)
    }

    pub fn inning_opened(match_id: MatchId, change: &CreaseChange) -> Self {
        let payload = json!({
            "inningSequence": change.inning_sequence,
            "status": InningState::InProgress,
            "striker": change.striker,
            "nonStriker": change.non_striker,
            "currentBowler": change.current_bowler,
        });
        Self::new(LiveEventType::InningStatus, match_id, payload)
    }

    pub fn inning_completed(match_id: MatchId, completion: &InningCompletion) -> Self {
        let payload = json!({
            "inningSequence": completion.inning_sequence,
            "teamID": completion.team_id,
            "status": InningState::Completed,
            "reason": completion.reason,
            "score": completion.score,
            "wickets": completion.wickets,
            "overs": completion.overs,
            "runRate": completion.run_rate,
            "target": completion.target,
            "targetRunRate": completion.target_run_rate,
        });
        Self::new(LiveEventType::InningStatus, match_id, payload)
    }

    pub fn match_result(result: &MatchResult) -> Self {
        let payload = json!({
            "winningTeamID": result.winning_team_id,
            "kind": result.kind,
            "margin": result.margin,
            "summary": result.summary,
        });
        Self::new(LiveEventType::MatchResult, result.match_id, payload)
    }
}
