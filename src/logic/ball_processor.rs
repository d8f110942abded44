use super::strike::{rotate, should_rotate_strike};
use super::types::{AppliedBall, CreaseChange};
use crate::constants::{BALLS_PER_OVER, MAX_RUNS_PER_BALL};
use crate::data::{
    BallEvent, BallRecord, BatsmanInningStat, BowlerInningStat, Dismissal, ExtrasKind, MatchSnapshot, MatchStatus, PlayerId, TeamId,
};
use crate::scoring_error::{ScoringError, ScoringResult, StaleStateError, ValidationError};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Validates one delivery against the working copy of a match and applies it to the
/// team, batsman and bowler aggregates. Pure in-memory logic; persistence, retries and
/// notifications belong to the caller.
#[derive(Debug, Clone, Default)]
pub struct BallEventProcessor;

impl BallEventProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Apply `event` to the inning `batting_team` is currently batting in.
    ///
    /// Nothing in `snapshot` is touched unless every check passes.
    pub fn apply(
        &self,
        snapshot: &mut MatchSnapshot,
        batting_team: TeamId,
        event: &BallEvent,
        recorded_at: DateTime<Utc>,
    ) -> ScoringResult<AppliedBall> {
        let sequence = open_inning_sequence(snapshot, batting_team)?;
        validate_event_shape(snapshot, sequence, event)?;
        check_active_state(snapshot, sequence, event)?;

        let ball_limit = snapshot.match_info.format.ball_limit();
        let match_id = snapshot.match_id();
        let inning = snapshot
            .inning_mut(sequence)
            .ok_or(ValidationError::NoInningInProgress { match_id, team_id: batting_team })?;

        inning.score += event.total_runs();
        inning.extras += event.extras_total();
        inning.deliveries += 1;
        if event.is_legal_delivery() {
            inning.legal_balls += 1;
        }
        let over_completed = event.is_legal_delivery() && inning.legal_balls % BALLS_PER_OVER == 0;
        if event.wicket.is_some() {
            inning.wickets += 1;
        }
        let score_at_ball = inning.score;

        let strike_rotated = should_rotate_strike(event.runs_run(), over_completed);
        let (striker, non_striker) = rotate(inning.striker, inning.non_striker, strike_rotated);
        inning.striker = striker;
        inning.non_striker = non_striker;

        if let Some(wicket) = &event.wicket {
            if inning.striker == Some(wicket.dismissed_id) {
                inning.striker = None;
            } else if inning.non_striker == Some(wicket.dismissed_id) {
                inning.non_striker = None;
            }
        }
        if over_completed {
            inning.previous_over_bowler = inning.current_bowler;
            inning.current_bowler = None;
        }
        inning.recompute_rates(ball_limit);

        if let Some(stat) = snapshot.batsmen.get_mut(&(sequence, event.striker_id)) {
            stat.runs += event.runs_off_bat;
            if event.extras.counts_as_ball_faced() {
                stat.balls_faced += 1;
            }
            match event.runs_off_bat {
                4 => stat.fours += 1,
                6 => stat.sixes += 1,
                _ => {}
            }
        }

        if let Some(wicket) = &event.wicket {
            if let Some(stat) = snapshot.batsmen.get_mut(&(sequence, wicket.dismissed_id)) {
                stat.dismissal = Some(Dismissal {
                    kind: wicket.kind,
                    bowler_id: wicket.kind.credited_to_bowler().then_some(event.bowler_id),
                    fielder_id: wicket.fielder_id,
                    at_score: score_at_ball,
                });
                stat.is_currently_batting = false;
                stat.is_striker = false;
            }
        }

        if let Some(stat) = snapshot.bowlers.get_mut(&(sequence, event.bowler_id)) {
            let conceded = event.runs_conceded_by_bowler();
            stat.runs_conceded += conceded;
            stat.current_over_runs += conceded;
            match event.extras {
                ExtrasKind::Wide => stat.wides += 1,
                ExtrasKind::NoBall => stat.no_balls += 1,
                _ => stat.legal_balls += 1,
            }
            if event.wicket.is_some_and(|wicket| wicket.kind.credited_to_bowler()) {
                stat.wickets += 1;
            }
            if over_completed {
                if stat.current_over_runs == 0 {
                    stat.maidens += 1;
                }
                stat.current_over_runs = 0;
            }
        }

        snapshot.sync_active_flags(sequence);

        let inning = snapshot
            .inning(sequence)
            .ok_or(ValidationError::NoInningInProgress { match_id, team_id: batting_team })?;
        debug!(
            "{} inning {}: {}/{} ({}) after delivery {}",
            match_id,
            sequence,
            inning.score,
            inning.wickets,
            inning.overs_display(),
            event.delivery
        );

        Ok(AppliedBall {
            inning_sequence: sequence,
            batting_team_id: batting_team,
            record: BallRecord::new(sequence, batting_team, event.clone(), recorded_at),
            score: inning.score,
            wickets: inning.wickets,
            legal_balls: inning.legal_balls,
            overs: inning.overs_display(),
            run_rate: inning.run_rate,
            target_run_rate: inning.target_run_rate,
            striker: inning.striker,
            non_striker: inning.non_striker,
            current_bowler: inning.current_bowler,
            strike_rotated,
            over_completed,
            wicket: event.wicket,
        })
    }

    /// Send in a new batsman to the end vacated by the last wicket.
    pub fn nominate_batsman(&self, snapshot: &mut MatchSnapshot, batting_team: TeamId, player_id: PlayerId) -> ScoringResult<CreaseChange> {
        let sequence = open_inning_sequence(snapshot, batting_team)?;
        if !snapshot.match_info.in_squad(batting_team, player_id) {
            return Err(ValidationError::UnknownPlayer { team_id: batting_team, player_id }.into());
        }
        if snapshot.batsman(sequence, player_id).is_some() {
            return Err(ValidationError::AlreadyBatted(player_id).into());
        }

        let match_id = snapshot.match_id();
        let batting_position = snapshot.inning_batsmen(sequence).len() as u32 + 1;
        let inning = snapshot
            .inning_mut(sequence)
            .ok_or(ValidationError::NoInningInProgress { match_id, team_id: batting_team })?;
        if inning.striker.is_none() {
            inning.striker = Some(player_id);
        } else if inning.non_striker.is_none() {
            inning.non_striker = Some(player_id);
        } else {
            return Err(StaleStateError::CreaseFull.into());
        }
        let change = CreaseChange::from_inning(inning);

        snapshot
            .batsmen
            .insert((sequence, player_id), BatsmanInningStat::new(match_id, batting_team, sequence, player_id, batting_position));
        snapshot.sync_active_flags(sequence);
        Ok(change)
    }

    /// Hand the ball to a bowler for the next over.
    pub fn assign_bowler(&self, snapshot: &mut MatchSnapshot, batting_team: TeamId, bowler_id: PlayerId) -> ScoringResult<CreaseChange> {
        let sequence = open_inning_sequence(snapshot, batting_team)?;
        let match_id = snapshot.match_id();
        let format = snapshot.match_info.format;
        let inning = snapshot
            .inning(sequence)
            .ok_or(ValidationError::NoInningInProgress { match_id, team_id: batting_team })?;
        let bowling_team = inning.bowling_team_id;

        if let Some(current) = inning.current_bowler {
            return Err(StaleStateError::OverInProgress(current).into());
        }
        if !snapshot.match_info.in_squad(bowling_team, bowler_id) {
            return Err(ValidationError::UnknownPlayer { team_id: bowling_team, player_id: bowler_id }.into());
        }
        if inning.previous_over_bowler == Some(bowler_id) {
            return Err(ValidationError::ConsecutiveOvers(bowler_id).into());
        }
        if let (Some(quota), Some(stat)) = (format.max_overs_per_bowler(), snapshot.bowler(sequence, bowler_id)) {
            if stat.overs_completed() >= quota {
                return Err(ValidationError::BowlerQuota { player_id: bowler_id, quota }.into());
            }
        }

        snapshot
            .bowlers
            .entry((sequence, bowler_id))
            .or_insert_with(|| BowlerInningStat::new(match_id, bowling_team, sequence, bowler_id));
        let inning = snapshot
            .inning_mut(sequence)
            .ok_or(ValidationError::NoInningInProgress { match_id, team_id: batting_team })?;
        inning.current_bowler = Some(bowler_id);
        let change = CreaseChange::from_inning(inning);
        snapshot.sync_active_flags(sequence);
        Ok(change)
    }
}

/// Locate the inning `batting_team` is batting in, rejecting non-live matches and
/// innings that already finished.
pub(crate) fn open_inning_sequence(snapshot: &MatchSnapshot, batting_team: TeamId) -> ScoringResult<u32> {
    let match_info = &snapshot.match_info;
    if match_info.status != MatchStatus::Live {
        return Err(ValidationError::MatchStatus { match_id: match_info.id, status: match_info.status, expected: MatchStatus::Live }.into());
    }
    if !match_info.is_participant(batting_team) {
        return Err(ValidationError::UnknownTeam { match_id: match_info.id, team_id: batting_team }.into());
    }
    if let Some(inning) = snapshot.open_inning_for(batting_team) {
        return Ok(inning.sequence);
    }
    match snapshot.team_innings(batting_team).last() {
        Some(inning) if inning.completed => Err(ValidationError::InningCompleted { match_id: match_info.id, sequence: inning.sequence }.into()),
        _ => Err(ValidationError::NoInningInProgress { match_id: match_info.id, team_id: batting_team }.into()),
    }
}

fn validate_event_shape(snapshot: &MatchSnapshot, sequence: u32, event: &BallEvent) -> ScoringResult<()> {
    let malformed = |reason: String| -> ScoringError { ValidationError::MalformedEvent(reason).into() };
    let match_id = snapshot.match_id();

    if event.match_id != match_id {
        return Err(malformed(format!("event belongs to {}, not {}", event.match_id, match_id)));
    }
    if let Some(inning) = snapshot.inning(sequence) {
        if event.team_id != inning.bowling_team_id {
            return Err(ValidationError::UnknownTeam { match_id, team_id: event.team_id }.into());
        }
    }
    if event.striker_id == event.non_striker_id {
        return Err(malformed(format!("{} cannot be at both ends", event.striker_id)));
    }
    if event.runs_off_bat > MAX_RUNS_PER_BALL {
        return Err(malformed(format!("{} runs off the bat", event.runs_off_bat)));
    }
    if event.extra_runs > MAX_RUNS_PER_BALL {
        return Err(malformed(format!("{} extra runs", event.extra_runs)));
    }
    match event.extras {
        ExtrasKind::Wide if event.runs_off_bat > 0 => return Err(malformed("runs off the bat on a wide".to_string())),
        ExtrasKind::Bye | ExtrasKind::LegBye if event.runs_off_bat > 0 => {
            return Err(malformed(format!("runs off the bat on a {}", event.extras)));
        }
        ExtrasKind::Bye | ExtrasKind::LegBye if event.extra_runs == 0 => {
            return Err(malformed(format!("{} without runs", event.extras)));
        }
        ExtrasKind::None if event.extra_runs > 0 => return Err(malformed("extra runs without an extras kind".to_string())),
        _ => {}
    }
    if let Some(wicket) = &event.wicket {
        if !wicket.kind.possible_on(event.extras) {
            return Err(malformed(format!("{} is not possible on a {}", wicket.kind, event.extras)));
        }
        if wicket.dismissed_id != event.striker_id && wicket.dismissed_id != event.non_striker_id {
            return Err(malformed(format!("{} is not at the crease", wicket.dismissed_id)));
        }
        if wicket.dismissed_id == event.non_striker_id && !wicket.kind.can_dismiss_non_striker() {
            return Err(malformed(format!("non-striker cannot be out {}", wicket.kind)));
        }
    }
    Ok(())
}

fn check_active_state(snapshot: &MatchSnapshot, sequence: u32, event: &BallEvent) -> ScoringResult<()> {
    let Some(inning) = snapshot.inning(sequence) else {
        return Err(ValidationError::MalformedEvent(format!("inning {} missing", sequence)).into());
    };

    if inning.striker.is_none() || inning.non_striker.is_none() {
        return Err(StaleStateError::AwaitingBatsman.into());
    }
    if inning.current_bowler.is_none() {
        return Err(StaleStateError::AwaitingBowler.into());
    }

    let striker_active = snapshot.batsman(sequence, event.striker_id).is_some_and(|stat| stat.is_striker && stat.is_currently_batting);
    if inning.striker != Some(event.striker_id) || !striker_active {
        return Err(StaleStateError::StrikerNotActive { expected: inning.striker, got: event.striker_id }.into());
    }
    let non_striker_active = snapshot
        .batsman(sequence, event.non_striker_id)
        .is_some_and(|stat| !stat.is_striker && stat.is_currently_batting);
    if inning.non_striker != Some(event.non_striker_id) || !non_striker_active {
        return Err(StaleStateError::NonStrikerNotActive { expected: inning.non_striker, got: event.non_striker_id }.into());
    }
    let bowler_active = snapshot.bowler(sequence, event.bowler_id).is_some_and(|stat| stat.is_current_bowler);
    if inning.current_bowler != Some(event.bowler_id) || !bowler_active {
        return Err(StaleStateError::BowlerNotActive { expected: inning.current_bowler, got: event.bowler_id }.into());
    }

    let (expected_over, expected_ball) = (inning.current_over(), inning.next_ball_in_over());
    if event.delivery != inning.deliveries || event.over != expected_over || event.ball_in_over != expected_ball {
        return Err(StaleStateError::OutOfSequence {
            expected_delivery: inning.deliveries,
            expected_over,
            expected_ball,
            got_delivery: event.delivery,
            got_over: event.over,
            got_ball: event.ball_in_over,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DismissalKind, Inning, Match, MatchFormat, MatchId, Wicket};

    const BATTING: TeamId = TeamId(1);
    const BOWLING: TeamId = TeamId(2);

    fn live_snapshot(format: MatchFormat) -> MatchSnapshot {
        let mut match_info = Match::new(MatchId(1), format, BATTING, BOWLING)
            .with_squad(BATTING, (1..=5).map(PlayerId).collect())
            .with_squad(BOWLING, (20..=25).map(PlayerId).collect());
        match_info.status = MatchStatus::Live;

        let mut snapshot = MatchSnapshot::new(match_info);
        let mut inning = Inning::open(MatchId(1), BATTING, BOWLING, 0);
        inning.striker = Some(PlayerId(1));
        inning.non_striker = Some(PlayerId(2));
        inning.current_bowler = Some(PlayerId(20));
        snapshot.innings.push(inning);
        snapshot.batsmen.insert((0, PlayerId(1)), BatsmanInningStat::new(MatchId(1), BATTING, 0, PlayerId(1), 1));
        snapshot.batsmen.insert((0, PlayerId(2)), BatsmanInningStat::new(MatchId(1), BATTING, 0, PlayerId(2), 2));
        snapshot.bowlers.insert((0, PlayerId(20)), BowlerInningStat::new(MatchId(1), BOWLING, 0, PlayerId(20)));
        snapshot.sync_active_flags(0);
        snapshot
    }

    /// Next delivery from the current position with the current players.
    fn next_ball(snapshot: &MatchSnapshot, runs_off_bat: u32, extras: ExtrasKind, extra_runs: u32) -> BallEvent {
        let inning = snapshot.inning(0).unwrap();
        BallEvent {
            match_id: MatchId(1),
            team_id: BOWLING,
            bowler_id: inning.current_bowler.unwrap_or(PlayerId(20)),
            striker_id: inning.striker.unwrap_or(PlayerId(1)),
            non_striker_id: inning.non_striker.unwrap_or(PlayerId(2)),
            runs_off_bat,
            extras,
            extra_runs,
            wicket: None,
            over: inning.current_over(),
            ball_in_over: inning.next_ball_in_over(),
            delivery: inning.deliveries,
        }
    }

    fn apply(snapshot: &mut MatchSnapshot, event: &BallEvent) -> ScoringResult<AppliedBall> {
        BallEventProcessor::new().apply(snapshot, BATTING, event, Utc::now())
    }

    fn apply_next(snapshot: &mut MatchSnapshot, runs_off_bat: u32, extras: ExtrasKind, extra_runs: u32) -> ScoringResult<AppliedBall> {
        let event = next_ball(snapshot, runs_off_bat, extras, extra_runs);
        apply(snapshot, &event)
    }

    #[test]
    fn test_runs_update_team_batsman_and_bowler() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        let event = next_ball(&snapshot, 4, ExtrasKind::None, 0);
        let applied = apply(&mut snapshot, &event)?;

        assert_eq!(applied.score, 4);
        assert_eq!(applied.legal_balls, 1);
        assert!(!applied.strike_rotated);

        let striker = snapshot.batsman(0, PlayerId(1)).unwrap();
        assert_eq!((striker.runs, striker.balls_faced, striker.fours), (4, 1, 1));
        let bowler = snapshot.bowler(0, PlayerId(20)).unwrap();
        assert_eq!((bowler.runs_conceded, bowler.legal_balls), (4, 1));
        Ok(())
    }

    #[test]
    fn test_extras_accounting() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);

        let wide = next_ball(&snapshot, 0, ExtrasKind::Wide, 0);
        let applied = apply(&mut snapshot, &wide)?;
        assert_eq!((applied.score, applied.legal_balls), (1, 0));
        assert_eq!(snapshot.inning(0).unwrap().deliveries, 1);

        let bye = next_ball(&snapshot, 0, ExtrasKind::Bye, 2);
        apply(&mut snapshot, &bye)?;

        let no_ball = next_ball(&snapshot, 2, ExtrasKind::NoBall, 0);
        apply(&mut snapshot, &no_ball)?;

        let inning = snapshot.inning(0).unwrap();
        assert_eq!(inning.score, 1 + 2 + 3);
        assert_eq!(inning.extras, 1 + 2 + 1);
        assert_eq!(inning.legal_balls, 1);

        let striker = snapshot.batsman(0, PlayerId(1)).unwrap();
        // wide and bye are not balls faced, the no-ball is
        assert_eq!((striker.runs, striker.balls_faced), (2, 1));

        let bowler = snapshot.bowler(0, PlayerId(20)).unwrap();
        assert_eq!(bowler.runs_conceded, 1 + 3);
        assert_eq!((bowler.wides, bowler.no_balls, bowler.legal_balls), (1, 1, 1));
        Ok(())
    }

    #[test]
    fn test_odd_runs_rotate_strike() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        let event = next_ball(&snapshot, 1, ExtrasKind::None, 0);
        let applied = apply(&mut snapshot, &event)?;

        assert!(applied.strike_rotated);
        assert_eq!(applied.striker, Some(PlayerId(2)));
        assert_eq!(applied.non_striker, Some(PlayerId(1)));
        assert!(snapshot.batsman(0, PlayerId(2)).unwrap().is_striker);
        assert!(!snapshot.batsman(0, PlayerId(1)).unwrap().is_striker);
        Ok(())
    }

    #[test]
    fn test_end_of_over_rotation_and_bowler_release() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        for _ in 0..5 {
            let event = next_ball(&snapshot, 0, ExtrasKind::None, 0);
            apply(&mut snapshot, &event)?;
        }
        let last = next_ball(&snapshot, 2, ExtrasKind::None, 0);
        let applied = apply(&mut snapshot, &last)?;

        assert!(applied.over_completed);
        assert!(applied.strike_rotated);
        assert_eq!(applied.striker, Some(PlayerId(2)));
        assert!(applied.awaiting_bowler());

        let bowler = snapshot.bowler(0, PlayerId(20)).unwrap();
        assert!(!bowler.is_current_bowler);
        assert_eq!(bowler.maidens, 0);
        assert_eq!(snapshot.inning(0).unwrap().previous_over_bowler, Some(PlayerId(20)));

        let err = apply_next(&mut snapshot, 0, ExtrasKind::None, 0).unwrap_err();
        assert!(matches!(err, ScoringError::StaleState(StaleStateError::AwaitingBowler)));
        Ok(())
    }

    #[test]
    fn test_maiden_over() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        for _ in 0..5 {
            apply_next(&mut snapshot, 0, ExtrasKind::None, 0)?;
        }
        apply_next(&mut snapshot, 0, ExtrasKind::LegBye, 1)?;
        let bowler = snapshot.bowler(0, PlayerId(20)).unwrap();
        assert_eq!(bowler.maidens, 1);
        assert_eq!(bowler.current_over_runs, 0);
        Ok(())
    }

    #[test]
    fn test_wicket_vacates_crease() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        let mut event = next_ball(&snapshot, 0, ExtrasKind::None, 0);
        event.wicket = Some(Wicket { dismissed_id: PlayerId(1), kind: DismissalKind::Caught, fielder_id: Some(PlayerId(22)) });
        let applied = apply(&mut snapshot, &event)?;

        assert_eq!(applied.wickets, 1);
        assert!(applied.awaiting_batsman());
        assert_eq!(applied.striker, None);

        let out = snapshot.batsman(0, PlayerId(1)).unwrap();
        assert!(!out.is_currently_batting);
        assert!(!out.is_striker);
        let dismissal = out.dismissal.as_ref().unwrap();
        assert_eq!(dismissal.bowler_id, Some(PlayerId(20)));
        assert_eq!(dismissal.fielder_id, Some(PlayerId(22)));
        assert_eq!(snapshot.bowler(0, PlayerId(20)).unwrap().wickets, 1);

        let err = apply_next(&mut snapshot, 0, ExtrasKind::None, 0).unwrap_err();
        assert!(matches!(err, ScoringError::StaleState(StaleStateError::AwaitingBatsman)));

        let change = BallEventProcessor::new().nominate_batsman(&mut snapshot, BATTING, PlayerId(3))?;
        assert_eq!(change.striker, Some(PlayerId(3)));
        assert_eq!(snapshot.batsman(0, PlayerId(3)).unwrap().batting_position, 3);
        assert!(snapshot.batsman(0, PlayerId(3)).unwrap().is_striker);
        apply_next(&mut snapshot, 1, ExtrasKind::None, 0)?;
        Ok(())
    }

    #[test]
    fn test_run_out_of_non_striker_after_crossing() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        let mut event = next_ball(&snapshot, 1, ExtrasKind::None, 0);
        // striker completes one run, non-striker (now at the striker's end) is run out on the second
        event.wicket = Some(Wicket { dismissed_id: PlayerId(2), kind: DismissalKind::RunOut, fielder_id: None });
        let applied = apply(&mut snapshot, &event)?;

        assert_eq!(applied.striker, None);
        assert_eq!(applied.non_striker, Some(PlayerId(1)));
        assert_eq!(snapshot.bowler(0, PlayerId(20)).unwrap().wickets, 0);
        assert_eq!(snapshot.batsman(0, PlayerId(2)).unwrap().dismissal.as_ref().unwrap().bowler_id, None);
        Ok(())
    }

    #[test]
    fn test_replay_is_stale() -> eyre::Result<()> {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        let event = next_ball(&snapshot, 1, ExtrasKind::None, 0);
        apply(&mut snapshot, &event)?;
        let before = snapshot.clone();

        let err = apply(&mut snapshot, &event).unwrap_err();
        assert!(err.is_stale_state());
        assert_eq!(snapshot, before);

        // a wide leaves players and over position untouched, only the delivery index moves
        let dot = next_ball(&snapshot, 0, ExtrasKind::Wide, 0);
        apply(&mut snapshot, &dot)?;
        let err = apply(&mut snapshot, &dot).unwrap_err();
        assert!(matches!(err, ScoringError::StaleState(StaleStateError::OutOfSequence { .. })));
        Ok(())
    }

    #[test]
    fn test_inactive_players_are_stale() {
        let mut snapshot = live_snapshot(MatchFormat::T20);

        let mut event = next_ball(&snapshot, 0, ExtrasKind::None, 0);
        event.striker_id = PlayerId(3);
        assert!(matches!(apply(&mut snapshot, &event), Err(ScoringError::StaleState(StaleStateError::StrikerNotActive { .. }))));

        let mut event = next_ball(&snapshot, 0, ExtrasKind::None, 0);
        event.bowler_id = PlayerId(21);
        assert!(matches!(apply(&mut snapshot, &event), Err(ScoringError::StaleState(StaleStateError::BowlerNotActive { .. }))));
    }

    #[test]
    fn test_malformed_events_are_rejected() {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        let before = snapshot.clone();

        let mut cases = vec![
            next_ball(&snapshot, 2, ExtrasKind::Wide, 0),
            next_ball(&snapshot, 1, ExtrasKind::Bye, 1),
            next_ball(&snapshot, 0, ExtrasKind::LegBye, 0),
            next_ball(&snapshot, 0, ExtrasKind::None, 2),
            next_ball(&snapshot, 9, ExtrasKind::None, 0),
        ];
        let mut bowled_off_no_ball = next_ball(&snapshot, 0, ExtrasKind::NoBall, 0);
        bowled_off_no_ball.wicket = Some(Wicket { dismissed_id: PlayerId(1), kind: DismissalKind::Bowled, fielder_id: None });
        cases.push(bowled_off_no_ball);
        let mut wrong_team = next_ball(&snapshot, 0, ExtrasKind::None, 0);
        wrong_team.team_id = BATTING;
        cases.push(wrong_team);

        for event in cases {
            let err = apply(&mut snapshot, &event).unwrap_err();
            assert!(err.is_validation(), "expected validation error for {:?}, got {}", event, err);
        }
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_oversized_extras_are_rejected() {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        let before = snapshot.clone();

        for (extras, extra_runs) in [(ExtrasKind::Wide, u32::MAX), (ExtrasKind::Bye, 5000), (ExtrasKind::NoBall, MAX_RUNS_PER_BALL + 1)] {
            let err = apply_next(&mut snapshot, 0, extras, extra_runs).unwrap_err();
            assert!(matches!(err, ScoringError::Validation(ValidationError::MalformedEvent(_))), "{extras}: {err}");
        }
        assert_eq!(snapshot, before);

        let applied = apply_next(&mut snapshot, 0, ExtrasKind::Bye, MAX_RUNS_PER_BALL).unwrap();
        assert_eq!(applied.score, MAX_RUNS_PER_BALL);
    }

    #[test]
    fn test_completed_inning_rejects_balls() {
        let mut snapshot = live_snapshot(MatchFormat::T20);
        snapshot.inning_mut(0).unwrap().completed = true;
        let event = next_ball(&snapshot, 0, ExtrasKind::None, 0);
        let err = apply(&mut snapshot, &event).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::InningCompleted { sequence: 0, .. })));
    }

    #[test]
    fn test_assign_bowler_rules() -> eyre::Result<()> {
        let processor = BallEventProcessor::new();
        let mut snapshot = live_snapshot(MatchFormat::T20);

        let err = processor.assign_bowler(&mut snapshot, BATTING, PlayerId(21)).unwrap_err();
        assert!(matches!(err, ScoringError::StaleState(StaleStateError::OverInProgress(PlayerId(20)))));

        for _ in 0..6 {
            apply_next(&mut snapshot, 0, ExtrasKind::None, 0)?;
        }
        let err = processor.assign_bowler(&mut snapshot, BATTING, PlayerId(20)).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::ConsecutiveOvers(_))));
        let err = processor.assign_bowler(&mut snapshot, BATTING, PlayerId(3)).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::UnknownPlayer { .. })));

        let change = processor.assign_bowler(&mut snapshot, BATTING, PlayerId(21))?;
        assert_eq!(change.current_bowler, Some(PlayerId(21)));
        assert!(snapshot.bowler(0, PlayerId(21)).unwrap().is_current_bowler);
        assert!(!snapshot.bowler(0, PlayerId(20)).unwrap().is_current_bowler);
        Ok(())
    }

    #[test]
    fn test_bowler_quota() {
        let processor = BallEventProcessor::new();
        let mut snapshot = live_snapshot(MatchFormat::T20);
        {
            let inning = snapshot.inning_mut(0).unwrap();
            inning.current_bowler = None;
            inning.previous_over_bowler = Some(PlayerId(21));
        }
        snapshot.bowlers.get_mut(&(0, PlayerId(20))).unwrap().legal_balls = 24;
        snapshot.sync_active_flags(0);

        let err = processor.assign_bowler(&mut snapshot, BATTING, PlayerId(20)).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::BowlerQuota { quota: 4, .. })));
    }
}
