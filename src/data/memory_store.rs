use super::ball_event::BallRecord;
use super::ball_event_hash::BallEventHash;
use super::ids::MatchId;
use super::match_info::Match;
use super::snapshot::{MatchSnapshot, ScoringCommit};
use super::store::AggregateStore;
use crate::store_error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::debug;

struct MatchEntry {
    snapshot: MatchSnapshot,
    balls: Vec<BallRecord>,
    ball_hashes: HashSet<BallEventHash>,
}

/// In-memory aggregate store. Each match entry is updated under its map shard lock, so a
/// commit is observed either fully or not at all.
///
/// Transient failures can be injected with [`MemoryAggregateStore::fail_next_commits`].
#[derive(Default)]
pub struct MemoryAggregateStore {
    matches: DashMap<MatchId, MatchEntry>,
    injected_failures: AtomicU32,
    commits: AtomicU64,
    failed_commits: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub matches: usize,
    pub commits: u64,
    pub failed_commits: u64,
}

impl MemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with [`StoreError::Transient`].
    pub fn fail_next_commits(&self, count: u32) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            matches: self.matches.len(),
            commits: self.commits.load(Ordering::Relaxed),
            failed_commits: self.failed_commits.load(Ordering::Relaxed),
        }
    }

    fn take_injected_failure(&self) -> bool {
        self.injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| remaining.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AggregateStore for MemoryAggregateStore {
    async fn create_match(&self, match_info: Match) -> Result<(), StoreError> {
        let match_id = match_info.id;
        match self.matches.entry(match_id) {
            Entry::Occupied(_) => Err(StoreError::MatchExists(match_id)),
            Entry::Vacant(entry) => {
                entry.insert(MatchEntry { snapshot: MatchSnapshot::new(match_info), balls: Vec::new(), ball_hashes: HashSet::new() });
                debug!("Created {}", match_id);
                Ok(())
            }
        }
    }

    async fn load_snapshot(&self, match_id: MatchId) -> Result<Option<MatchSnapshot>, StoreError> {
        Ok(self.matches.get(&match_id).map(|entry| entry.snapshot.clone()))
    }

    async fn commit(&self, commit: ScoringCommit) -> Result<u64, StoreError> {
        if self.take_injected_failure() {
            self.failed_commits.fetch_add(1, Ordering::Relaxed);
            return Err(StoreError::Transient(format!("injected failure committing {}", commit.match_id)));
        }

        let mut entry = self.matches.get_mut(&commit.match_id).ok_or(StoreError::MatchNotFound(commit.match_id))?;

        // Every check runs before the first write.
        if entry.snapshot.version != commit.expected_version {
            return Err(StoreError::VersionConflict {
                match_id: commit.match_id,
                expected: commit.expected_version,
                found: entry.snapshot.version,
            });
        }
        if commit.result.is_some() && entry.snapshot.match_info.result.is_some() {
            return Err(StoreError::ResultAlreadyRecorded(commit.match_id));
        }
        if let Some(ball) = &commit.ball {
            if entry.ball_hashes.contains(&ball.hash) {
                return Err(StoreError::DuplicateBall(ball.hash.to_string()));
            }
        }

        let ScoringCommit { match_info, innings, batsmen, bowlers, ball, result, .. } = commit;
        let snapshot = &mut entry.snapshot;

        if let Some(match_info) = match_info {
            snapshot.match_info = match_info;
        }
        if let Some(result) = result {
            snapshot.match_info.result = Some(result);
        }
        for inning in innings {
            match snapshot.innings.iter_mut().find(|existing| existing.sequence == inning.sequence) {
                Some(existing) => *existing = inning,
                None => {
                    snapshot.innings.push(inning);
                    snapshot.innings.sort_by_key(|inning| inning.sequence);
                }
            }
        }
        for stat in batsmen {
            snapshot.batsmen.insert((stat.inning_sequence, stat.player_id), stat);
        }
        for stat in bowlers {
            snapshot.bowlers.insert((stat.inning_sequence, stat.player_id), stat);
        }
        snapshot.version += 1;
        let version = snapshot.version;

        if let Some(ball) = ball {
            entry.ball_hashes.insert(ball.hash.clone());
            entry.balls.push(ball);
        }

        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(version)
    }

    async fn ball_records(&self, match_id: MatchId) -> Result<Vec<BallRecord>, StoreError> {
        self.matches
            .get(&match_id)
            .map(|entry| entry.balls.clone())
            .ok_or(StoreError::MatchNotFound(match_id))
    }
}
