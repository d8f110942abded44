use super::ball_event::BallRecord;
use super::ids::{MatchId, PlayerId, TeamId};
use super::inning::Inning;
use super::match_info::Match;
use super::match_result::MatchResult;
use super::player_stats::{BatsmanInningStat, BowlerInningStat};
use ahash::RandomState;
use std::collections::HashMap;

pub type FastHasher = RandomState;
/// FastHashMap using ahash
pub type FastHashMap<K, V> = HashMap<K, V, FastHasher>;

/// (inning sequence, player) identifies a stat row within a match.
pub type StatKey = (u32, PlayerId);

/// Everything the scoring core reads and writes for one match, loaded as a unit.
///
/// Mutations are made on a clone and written back through [`ScoringCommit::diff`], so a
/// failed unit of work never leaves a partial update behind.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSnapshot {
    pub match_info: Match,
    /// Innings ordered by sequence.
    pub innings: Vec<Inning>,
    pub batsmen: FastHashMap<StatKey, BatsmanInningStat>,
    pub bowlers: FastHashMap<StatKey, BowlerInningStat>,
    pub version: u64,
}

impl MatchSnapshot {
    pub fn new(match_info: Match) -> Self {
        Self {
            match_info,
            innings: Vec::new(),
            batsmen: FastHashMap::default(),
            bowlers: FastHashMap::default(),
            version: 0,
        }
    }

    pub fn match_id(&self) -> MatchId {
        self.match_info.id
    }

    pub fn inning(&self, sequence: u32) -> Option<&Inning> {
        self.innings.iter().find(|inning| inning.sequence == sequence)
    }

    pub fn inning_mut(&mut self, sequence: u32) -> Option<&mut Inning> {
        self.innings.iter_mut().find(|inning| inning.sequence == sequence)
    }

    /// The inning currently open for batting, if any. At most one exists per match.
    pub fn open_inning(&self) -> Option<&Inning> {
        self.innings.iter().find(|inning| !inning.completed)
    }

    pub fn open_inning_for(&self, team_id: TeamId) -> Option<&Inning> {
        self.open_inning().filter(|inning| inning.team_id == team_id)
    }

    pub fn last_inning(&self) -> Option<&Inning> {
        self.innings.iter().max_by_key(|inning| inning.sequence)
    }

    pub fn next_sequence(&self) -> u32 {
        self.innings.len() as u32
    }

    pub fn team_innings(&self, team_id: TeamId) -> Vec<&Inning> {
        let mut innings: Vec<&Inning> = self.innings.iter().filter(|inning| inning.team_id == team_id).collect();
        innings.sort_by_key(|inning| inning.sequence);
        innings
    }

    /// Aggregate runs of a team over all its innings so far.
    pub fn team_total(&self, team_id: TeamId) -> u32 {
        self.team_innings(team_id).iter().map(|inning| inning.score).sum()
    }

    pub fn completed_innings(&self) -> usize {
        self.innings.iter().filter(|inning| inning.completed).count()
    }

    pub fn batsman(&self, sequence: u32, player_id: PlayerId) -> Option<&BatsmanInningStat> {
        self.batsmen.get(&(sequence, player_id))
    }

    pub fn bowler(&self, sequence: u32, player_id: PlayerId) -> Option<&BowlerInningStat> {
        self.bowlers.get(&(sequence, player_id))
    }

    pub fn inning_batsmen(&self, sequence: u32) -> Vec<&BatsmanInningStat> {
        let mut rows: Vec<&BatsmanInningStat> = self.batsmen.values().filter(|stat| stat.inning_sequence == sequence).collect();
        rows.sort_by_key(|stat| stat.batting_position);
        rows
    }

    pub fn inning_bowlers(&self, sequence: u32) -> Vec<&BowlerInningStat> {
        let mut rows: Vec<&BowlerInningStat> = self.bowlers.values().filter(|stat| stat.inning_sequence == sequence).collect();
        rows.sort_by_key(|stat| stat.player_id);
        rows
    }

    /// Copy the inning's active-player pointers onto the stat rows' flags.
    pub fn sync_active_flags(&mut self, sequence: u32) {
        let Some(inning) = self.inning(sequence) else {
            return;
        };
        let (striker, non_striker, bowler) = (inning.striker, inning.non_striker, inning.current_bowler);

        for stat in self.batsmen.values_mut().filter(|stat| stat.inning_sequence == sequence) {
            let at_crease = Some(stat.player_id) == striker || Some(stat.player_id) == non_striker;
            stat.is_currently_batting = at_crease;
            stat.is_striker = Some(stat.player_id) == striker;
        }
        for stat in self.bowlers.values_mut().filter(|stat| stat.inning_sequence == sequence) {
            stat.is_current_bowler = Some(stat.player_id) == bowler;
        }
    }
}

/// The rows one unit of work changes, applied by the store all-or-nothing.
#[derive(Clone, Debug, Default)]
pub struct ScoringCommit {
    pub match_id: MatchId,
    /// Version the working copy was loaded at. The store rejects the commit if it moved.
    pub expected_version: u64,
    pub match_info: Option<Match>,
    pub innings: Vec<Inning>,
    pub batsmen: Vec<BatsmanInningStat>,
    pub bowlers: Vec<BowlerInningStat>,
    pub ball: Option<BallRecord>,
    pub result: Option<MatchResult>,
}

impl ScoringCommit {
    /// Collect every row of `after` that differs from `before`.
    pub fn diff(before: &MatchSnapshot, after: &MatchSnapshot) -> Self {
        let match_info = (before.match_info != after.match_info).then(|| after.match_info.clone());
        let result = match (&before.match_info.result, &after.match_info.result) {
            (None, Some(result)) => Some(result.clone()),
            _ => None,
        };

        let innings = after
            .innings
            .iter()
            .filter(|inning| before.inning(inning.sequence) != Some(*inning))
            .cloned()
            .collect();
        let batsmen = after
            .batsmen
            .iter()
            .filter(|(key, stat)| before.batsmen.get(*key) != Some(*stat))
            .map(|(_, stat)| stat.clone())
            .collect();
        let bowlers = after
            .bowlers
            .iter()
            .filter(|(key, stat)| before.bowlers.get(*key) != Some(*stat))
            .map(|(_, stat)| stat.clone())
            .collect();

        Self {
            match_id: before.match_id(),
            expected_version: before.version,
            match_info,
            innings,
            batsmen,
            bowlers,
            ball: None,
            result,
        }
    }

    pub fn with_ball(mut self, ball: BallRecord) -> Self {
        self.ball = Some(ball);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.match_info.is_none()
            && self.innings.is_empty()
            && self.batsmen.is_empty()
            && self.bowlers.is_empty()
            && self.ball.is_none()
            && self.result.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::match_info::{MatchFormat, MatchStatus};

    fn snapshot() -> MatchSnapshot {
        let mut snapshot = MatchSnapshot::new(Match::new(MatchId(1), MatchFormat::T20, TeamId(1), TeamId(2)));
        let mut inning = Inning::open(MatchId(1), TeamId(1), TeamId(2), 0);
        inning.striker = Some(PlayerId(1));
        inning.non_striker = Some(PlayerId(2));
        inning.current_bowler = Some(PlayerId(20));
        snapshot.innings.push(inning);
        for (position, player) in [(1, PlayerId(1)), (2, PlayerId(2))] {
            snapshot.batsmen.insert((0, player), BatsmanInningStat::new(MatchId(1), TeamId(1), 0, player, position));
        }
        snapshot.bowlers.insert((0, PlayerId(20)), BowlerInningStat::new(MatchId(1), TeamId(2), 0, PlayerId(20)));
        snapshot.sync_active_flags(0);
        snapshot
    }

    #[test]
    fn test_sync_active_flags() {
        let snapshot = snapshot();
        assert!(snapshot.batsman(0, PlayerId(1)).unwrap().is_striker);
        assert!(!snapshot.batsman(0, PlayerId(2)).unwrap().is_striker);
        assert!(snapshot.batsman(0, PlayerId(2)).unwrap().is_currently_batting);
        assert!(snapshot.bowler(0, PlayerId(20)).unwrap().is_current_bowler);
    }

    #[test]
    fn test_diff_only_collects_changed_rows() {
        let before = snapshot();
        let mut after = before.clone();
        assert!(ScoringCommit::diff(&before, &after).is_empty());

        after.inning_mut(0).unwrap().score = 4;
        after.batsmen.get_mut(&(0, PlayerId(1))).unwrap().runs = 4;
        after.match_info.status = MatchStatus::Live;

        let commit = ScoringCommit::diff(&before, &after);
        assert_eq!(commit.innings.len(), 1);
        assert_eq!(commit.batsmen.len(), 1);
        assert_eq!(commit.batsmen[0].player_id, PlayerId(1));
        assert!(commit.bowlers.is_empty());
        assert!(commit.match_info.is_some());
        assert!(commit.result.is_none());
    }

    #[test]
    fn test_team_total_is_keyed_by_team() {
        let mut snapshot = snapshot();
        snapshot.inning_mut(0).unwrap().score = 120;
        let mut second = Inning::open(MatchId(1), TeamId(2), TeamId(1), 1);
        second.score = 80;
        snapshot.innings.push(second);

        assert_eq!(snapshot.team_total(TeamId(1)), 120);
        assert_eq!(snapshot.team_total(TeamId(2)), 80);
        assert_eq!(snapshot.next_sequence(), 2);
    }
}
