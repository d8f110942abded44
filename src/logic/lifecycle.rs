use super::ball_processor::open_inning_sequence;
use super::types::{CreaseChange, InningCompletion, OpenInning};
use crate::constants::DEFAULT_FOLLOW_ON_MARGIN;
use crate::data::{
    BatsmanInningStat, BowlerInningStat, CompletionReason, Inning, MatchFormat, MatchSnapshot, MatchStatus, PlayerId, TeamId,
};
use crate::scoring_error::{ScoringResult, ValidationError};
use tracing::{debug, info};

/// Drives innings through `NotStarted -> InProgress -> Completed` and the match from
/// `scheduled` to `live`.
#[derive(Debug, Clone)]
pub struct InningLifecycleDetector {
    follow_on_margin: u32,
}

impl Default for InningLifecycleDetector {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_ON_MARGIN)
    }
}

impl InningLifecycleDetector {
    pub fn new(follow_on_margin: u32) -> Self {
        Self { follow_on_margin }
    }

    pub fn follow_on_margin(&self) -> u32 {
        self.follow_on_margin
    }

    /// Move a scheduled match with a recorded toss to `live`.
    pub fn start_match(&self, snapshot: &mut MatchSnapshot) -> ScoringResult<()> {
        let match_info = &mut snapshot.match_info;
        if match_info.status != MatchStatus::Scheduled {
            return Err(ValidationError::MatchStatus { match_id: match_info.id, status: match_info.status, expected: MatchStatus::Scheduled }.into());
        }
        let [home, away] = match_info.teams;
        if home == away {
            return Err(ValidationError::UnknownTeam { match_id: match_info.id, team_id: away }.into());
        }
        let toss = match_info.toss.ok_or(ValidationError::MissingToss(match_info.id))?;
        if !match_info.is_participant(toss.winner) {
            return Err(ValidationError::UnknownTeam { match_id: match_info.id, team_id: toss.winner }.into());
        }

        match_info.status = MatchStatus::Live;
        info!("{} is live, {} won the toss and chose to {}", match_info.id, toss.winner, toss.decision);
        Ok(())
    }

    /// Open the next inning of a live match with its two openers and first bowler.
    pub fn open_inning(&self, snapshot: &mut MatchSnapshot, request: &OpenInning) -> ScoringResult<CreaseChange> {
        let match_info = &snapshot.match_info;
        let match_id = match_info.id;
        if match_info.status != MatchStatus::Live {
            return Err(ValidationError::MatchStatus { match_id, status: match_info.status, expected: MatchStatus::Live }.into());
        }
        let bowling_team = match_info
            .opponent_of(request.team_id)
            .ok_or(ValidationError::UnknownTeam { match_id, team_id: request.team_id })?;
        if let Some(open) = snapshot.open_inning() {
            return Err(ValidationError::InningInProgress { match_id, sequence: open.sequence }.into());
        }
        let sequence = snapshot.next_sequence();
        let limit = match_info.format.total_innings();
        if sequence >= limit {
            return Err(ValidationError::InningLimitReached { match_id, limit }.into());
        }

        let expected = self.expected_batting_team(snapshot, request.follow_on)?;
        if expected != request.team_id {
            return Err(ValidationError::BattingOrder { team_id: request.team_id, sequence }.into());
        }
        check_squad(snapshot, request.team_id, request.striker)?;
        check_squad(snapshot, request.team_id, request.non_striker)?;
        check_squad(snapshot, bowling_team, request.bowler)?;
        if request.striker == request.non_striker {
            return Err(ValidationError::DuplicateOpener(request.striker).into());
        }

        let mut inning = Inning::open(match_id, request.team_id, bowling_team, sequence);
        inning.follow_on = request.follow_on;
        if sequence + 1 == limit {
            let chasing = snapshot.team_total(bowling_team) + 1;
            inning.target = Some(chasing.saturating_sub(snapshot.team_total(request.team_id)));
        }
        inning.striker = Some(request.striker);
        inning.non_striker = Some(request.non_striker);
        inning.current_bowler = Some(request.bowler);
        inning.recompute_rates(match_info.format.ball_limit());
        let change = CreaseChange::from_inning(&inning);

        info!(
            "{} inning {} opened: {} batting{}{}",
            match_id,
            sequence,
            request.team_id,
            if request.follow_on { " (follow-on)" } else { "" },
            inning.target.map(|target| format!(", target {}", target)).unwrap_or_default()
        );

        snapshot.innings.push(inning);
        for (position, player_id) in [(1, request.striker), (2, request.non_striker)] {
            snapshot
                .batsmen
                .insert((sequence, player_id), BatsmanInningStat::new(match_id, request.team_id, sequence, player_id, position));
        }
        snapshot
            .bowlers
            .insert((sequence, request.bowler), BowlerInningStat::new(match_id, bowling_team, sequence, request.bowler));
        snapshot.sync_active_flags(sequence);
        Ok(change)
    }

    fn expected_batting_team(&self, snapshot: &MatchSnapshot, follow_on: bool) -> ScoringResult<TeamId> {
        let match_info = &snapshot.match_info;
        let sequence = snapshot.next_sequence();
        if follow_on && match_info.format != MatchFormat::Test {
            return Err(ValidationError::NotAllowedForFormat { action: "follow-on", format: match_info.format }.into());
        }
        if follow_on && sequence != 2 {
            return Err(ValidationError::FollowOn(format!("inning {} cannot be a follow-on", sequence)).into());
        }

        let Some(last) = snapshot.last_inning() else {
            return Ok(match_info.first_batting_team().ok_or(ValidationError::MissingToss(match_info.id))?);
        };
        let other = match_info
            .opponent_of(last.team_id)
            .ok_or(ValidationError::UnknownTeam { match_id: match_info.id, team_id: last.team_id })?;
        if !follow_on {
            return Ok(other);
        }

        let deficit = snapshot.team_total(other).saturating_sub(snapshot.team_total(last.team_id));
        if deficit < self.follow_on_margin {
            return Err(ValidationError::FollowOn(format!(
                "{} trails by {} runs, at least {} required",
                last.team_id, deficit, self.follow_on_margin
            ))
            .into());
        }
        Ok(last.team_id)
    }

    /// Reason the inning must end now, if any. Checked after every applied ball.
    pub fn evaluate(&self, snapshot: &MatchSnapshot, sequence: u32) -> Option<CompletionReason> {
        let inning = snapshot.inning(sequence).filter(|inning| !inning.completed)?;
        let match_info = &snapshot.match_info;

        if inning.target.is_some_and(|target| inning.score >= target) {
            return Some(CompletionReason::TargetReached);
        }
        if inning.wickets >= match_info.team_size(inning.team_id).saturating_sub(1) {
            return Some(CompletionReason::AllOut);
        }
        if match_info.format.ball_limit().is_some_and(|limit| inning.legal_balls >= limit) {
            return Some(CompletionReason::OversExhausted);
        }
        None
    }

    /// Mark the inning completed, release its active players and fix the final rates.
    pub fn complete(&self, snapshot: &mut MatchSnapshot, sequence: u32, reason: CompletionReason) -> ScoringResult<InningCompletion> {
        let match_id = snapshot.match_id();
        let ball_limit = snapshot.match_info.format.ball_limit();
        let Some(inning) = snapshot.inning_mut(sequence) else {
            return Err(ValidationError::MalformedEvent(format!("inning {} does not exist", sequence)).into());
        };
        if inning.completed {
            return Err(ValidationError::InningCompleted { match_id, sequence }.into());
        }

        inning.completed = true;
        inning.completion_reason = Some(reason);
        inning.declared = reason == CompletionReason::Declared;
        inning.striker = None;
        inning.non_striker = None;
        inning.current_bowler = None;
        inning.recompute_rates(ball_limit);
        let completion = InningCompletion::from_inning(inning, reason);
        snapshot.sync_active_flags(sequence);

        info!(
            "{} inning {} completed ({}): {}/{} in {} overs",
            match_id, sequence, reason, completion.score, completion.wickets, completion.overs
        );
        Ok(completion)
    }

    pub fn evaluate_and_complete(&self, snapshot: &mut MatchSnapshot, sequence: u32) -> ScoringResult<Option<InningCompletion>> {
        match self.evaluate(snapshot, sequence) {
            Some(reason) => self.complete(snapshot, sequence, reason).map(Some),
            None => Ok(None),
        }
    }

    /// Test only: the batting team ends its inning voluntarily.
    pub fn declare(&self, snapshot: &mut MatchSnapshot, batting_team: TeamId) -> ScoringResult<InningCompletion> {
        let format = snapshot.match_info.format;
        if format != MatchFormat::Test {
            return Err(ValidationError::NotAllowedForFormat { action: "declaration", format }.into());
        }
        let sequence = open_inning_sequence(snapshot, batting_team)?;
        self.complete(snapshot, sequence, CompletionReason::Declared)
    }

    /// Play ended externally. Closes the inning in progress, if any.
    pub fn conclude_play(&self, snapshot: &mut MatchSnapshot) -> ScoringResult<Option<InningCompletion>> {
        let match_info = &mut snapshot.match_info;
        if match_info.status != MatchStatus::Live {
            return Err(ValidationError::MatchStatus { match_id: match_info.id, status: match_info.status, expected: MatchStatus::Live }.into());
        }
        match_info.play_concluded = true;
        debug!("{} play concluded", match_info.id);

        match snapshot.open_inning().map(|inning| inning.sequence) {
            Some(sequence) => self.complete(snapshot, sequence, CompletionReason::MatchConcluded).map(Some),
            None => Ok(None),
        }
    }
}

fn check_squad(snapshot: &MatchSnapshot, team_id: TeamId, player_id: PlayerId) -> ScoringResult<()> {
    if snapshot.match_info.in_squad(team_id, player_id) {
        Ok(())
    } else {
        Err(ValidationError::UnknownPlayer { team_id, player_id }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Match, MatchId, TossDecision};
    use crate::scoring_error::ScoringError;

    const HOME: TeamId = TeamId(1);
    const AWAY: TeamId = TeamId(2);

    fn scheduled(format: MatchFormat) -> MatchSnapshot {
        MatchSnapshot::new(Match::new(MatchId(9), format, HOME, AWAY).with_toss(AWAY, TossDecision::Bowl))
    }

    fn live(format: MatchFormat) -> MatchSnapshot {
        let mut snapshot = scheduled(format);
        snapshot.match_info.status = MatchStatus::Live;
        snapshot
    }

    fn openers(team: TeamId) -> OpenInning {
        let base = team.as_u64() * 100;
        OpenInning::new(team, PlayerId(base + 1), PlayerId(base + 2), PlayerId(1000 - base))
    }

    /// Open the next inning for `team` and close it at `score`.
    fn bat(detector: &InningLifecycleDetector, snapshot: &mut MatchSnapshot, request: OpenInning, score: u32) -> eyre::Result<()> {
        let change = detector.open_inning(snapshot, &request)?;
        snapshot.inning_mut(change.inning_sequence).unwrap().score = score;
        detector.complete(snapshot, change.inning_sequence, CompletionReason::AllOut)?;
        Ok(())
    }

    #[test]
    fn test_start_match_requires_toss() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut no_toss = MatchSnapshot::new(Match::new(MatchId(9), MatchFormat::T20, HOME, AWAY));
        let err = detector.start_match(&mut no_toss).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::MissingToss(_))));
        let message = ValidationError::MissingToss(MatchId(9)).to_string();
        assert!(message.contains(&MatchId(9).to_string()) && message.ends_with("has no toss recorded"));

        let mut snapshot = scheduled(MatchFormat::T20);
        detector.start_match(&mut snapshot)?;
        assert_eq!(snapshot.match_info.status, MatchStatus::Live);
        assert!(detector.start_match(&mut snapshot).unwrap_err().is_validation());
        Ok(())
    }

    #[test]
    fn test_open_inning_follows_toss_and_alternates() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::T20);

        // away won the toss and bowled, so home bats first
        let err = detector.open_inning(&mut snapshot, &openers(AWAY)).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::BattingOrder { sequence: 0, .. })));

        let change = detector.open_inning(&mut snapshot, &openers(HOME))?;
        assert_eq!(change.inning_sequence, 0);
        assert_eq!(change.striker, Some(PlayerId(101)));
        assert!(snapshot.batsman(0, PlayerId(101)).unwrap().is_striker);
        assert!(snapshot.bowler(0, PlayerId(900)).unwrap().is_current_bowler);
        assert_eq!(snapshot.inning(0).unwrap().target, None);

        let err = detector.open_inning(&mut snapshot, &openers(AWAY)).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::InningInProgress { sequence: 0, .. })));

        snapshot.inning_mut(0).unwrap().score = 180;
        detector.complete(&mut snapshot, 0, CompletionReason::OversExhausted)?;
        detector.open_inning(&mut snapshot, &openers(AWAY))?;
        let chase = snapshot.inning(1).unwrap();
        assert_eq!(chase.target, Some(181));
        assert_eq!(chase.target_run_rate, Some(9.05));

        detector.complete(&mut snapshot, 1, CompletionReason::AllOut)?;
        let err = detector.open_inning(&mut snapshot, &openers(HOME)).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::InningLimitReached { limit: 2, .. })));
        Ok(())
    }

    #[test]
    fn test_open_inning_rejects_bad_openers() {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::T20);
        snapshot.match_info.squads.insert(HOME, vec![PlayerId(101), PlayerId(102)]);

        let outsider = OpenInning::new(HOME, PlayerId(101), PlayerId(555), PlayerId(900));
        assert!(matches!(
            detector.open_inning(&mut snapshot, &outsider),
            Err(ScoringError::Validation(ValidationError::UnknownPlayer { .. }))
        ));
        let same = OpenInning::new(HOME, PlayerId(101), PlayerId(101), PlayerId(900));
        assert!(matches!(
            detector.open_inning(&mut snapshot, &same),
            Err(ScoringError::Validation(ValidationError::DuplicateOpener(_)))
        ));
        assert!(snapshot.innings.is_empty());
    }

    #[test]
    fn test_follow_on() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::Test);
        bat(&detector, &mut snapshot, openers(HOME), 450)?;
        bat(&detector, &mut snapshot, openers(AWAY), 220)?;

        let follow_on = openers(AWAY).with_follow_on();
        detector.open_inning(&mut snapshot, &follow_on)?;
        let third = snapshot.inning(2).unwrap();
        assert!(third.follow_on);
        assert_eq!(third.team_id, AWAY);
        assert_eq!(third.target, None);

        snapshot.inning_mut(2).unwrap().score = 300;
        detector.complete(&mut snapshot, 2, CompletionReason::AllOut)?;
        detector.open_inning(&mut snapshot, &openers(HOME))?;
        // 520 - 450 + 1
        assert_eq!(snapshot.inning(3).unwrap().target, Some(71));
        Ok(())
    }

    #[test]
    fn test_follow_on_needs_deficit() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::new(150);
        let mut snapshot = live(MatchFormat::Test);
        bat(&detector, &mut snapshot, openers(HOME), 300)?;
        bat(&detector, &mut snapshot, openers(AWAY), 160)?;

        let err = detector.open_inning(&mut snapshot, &openers(AWAY).with_follow_on()).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::FollowOn(_))));
        detector.open_inning(&mut snapshot, &openers(HOME))?;
        Ok(())
    }

    #[test]
    fn test_follow_on_not_allowed_in_limited_overs() {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::Odi);
        let err = detector.open_inning(&mut snapshot, &openers(HOME).with_follow_on()).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::NotAllowedForFormat { .. })));
    }

    #[test]
    fn test_evaluate_reasons() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::T20);
        detector.open_inning(&mut snapshot, &openers(HOME))?;
        assert_eq!(detector.evaluate(&snapshot, 0), None);

        snapshot.inning_mut(0).unwrap().wickets = 10;
        assert_eq!(detector.evaluate(&snapshot, 0), Some(CompletionReason::AllOut));

        snapshot.inning_mut(0).unwrap().wickets = 3;
        snapshot.inning_mut(0).unwrap().legal_balls = 120;
        assert_eq!(detector.evaluate(&snapshot, 0), Some(CompletionReason::OversExhausted));

        snapshot.inning_mut(0).unwrap().target = Some(100);
        snapshot.inning_mut(0).unwrap().score = 100;
        assert_eq!(detector.evaluate(&snapshot, 0), Some(CompletionReason::TargetReached));
        Ok(())
    }

    #[test]
    fn test_all_out_follows_squad_size() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::Test);
        snapshot.match_info.squads.insert(HOME, (101..=106).map(PlayerId).collect());
        detector.open_inning(&mut snapshot, &openers(HOME))?;

        snapshot.inning_mut(0).unwrap().wickets = 4;
        assert_eq!(detector.evaluate(&snapshot, 0), None);
        snapshot.inning_mut(0).unwrap().wickets = 5;
        assert_eq!(detector.evaluate(&snapshot, 0), Some(CompletionReason::AllOut));

        // no over limit in a Test
        snapshot.inning_mut(0).unwrap().wickets = 0;
        snapshot.inning_mut(0).unwrap().legal_balls = 6 * 200;
        assert_eq!(detector.evaluate(&snapshot, 0), None);
        Ok(())
    }

    #[test]
    fn test_complete_is_terminal() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::T20);
        detector.open_inning(&mut snapshot, &openers(HOME))?;

        let completion = detector.complete(&mut snapshot, 0, CompletionReason::AllOut)?;
        assert_eq!(completion.reason, CompletionReason::AllOut);
        let inning = snapshot.inning(0).unwrap();
        assert!(inning.completed);
        assert!(!inning.ready_for_delivery());
        assert!(snapshot.inning_batsmen(0).iter().all(|stat| !stat.is_currently_batting));
        assert!(snapshot.inning_bowlers(0).iter().all(|stat| !stat.is_current_bowler));

        let err = detector.complete(&mut snapshot, 0, CompletionReason::AllOut).unwrap_err();
        assert!(matches!(err, ScoringError::Validation(ValidationError::InningCompleted { .. })));
        assert_eq!(detector.evaluate(&snapshot, 0), None);
        Ok(())
    }

    #[test]
    fn test_declare_only_in_tests() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut limited = live(MatchFormat::T20);
        detector.open_inning(&mut limited, &openers(HOME))?;
        assert!(matches!(
            detector.declare(&mut limited, HOME),
            Err(ScoringError::Validation(ValidationError::NotAllowedForFormat { .. }))
        ));

        let mut test = live(MatchFormat::Test);
        detector.open_inning(&mut test, &openers(HOME))?;
        let completion = detector.declare(&mut test, HOME)?;
        assert_eq!(completion.reason, CompletionReason::Declared);
        assert!(test.inning(0).unwrap().declared);
        Ok(())
    }

    #[test]
    fn test_conclude_play_closes_open_inning() -> eyre::Result<()> {
        let detector = InningLifecycleDetector::default();
        let mut snapshot = live(MatchFormat::Test);
        detector.open_inning(&mut snapshot, &openers(HOME))?;

        let completion = detector.conclude_play(&mut snapshot)?;
        assert_eq!(completion.map(|c| c.reason), Some(CompletionReason::MatchConcluded));
        assert!(snapshot.match_info.play_concluded);
        assert_eq!(detector.conclude_play(&mut snapshot)?, None);
        Ok(())
    }
}
