use crate::data::{AggregateStore, BatsmanInningStat, BowlerInningStat, MatchId, MatchSnapshot, TeamId};
use crate::scoring_error::{ScoringError, ScoringResult, ValidationError};
use crate::utils::cache::TtlCache;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::trace;

/// (match, batting team, inning sequence) addresses one projection.
pub type QueryKey = (MatchId, TeamId, u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBatsmen {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub inning_sequence: u32,
    pub striker: Option<BatsmanInningStat>,
    pub non_striker: Option<BatsmanInningStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentBowler {
    pub match_id: MatchId,
    /// Batting team of the inning.
    pub team_id: TeamId,
    pub inning_sequence: u32,
    pub bowler: Option<BowlerInningStat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Batsmen at the crease, read off the stat rows' active flags.
pub fn project_batsmen(snapshot: &MatchSnapshot, team_id: TeamId, sequence: u32) -> CurrentBatsmen {
    let active: Vec<&BatsmanInningStat> = snapshot
        .inning_batsmen(sequence)
        .into_iter()
        .filter(|stat| stat.team_id == team_id && stat.is_currently_batting)
        .collect();

    CurrentBatsmen {
        match_id: snapshot.match_id(),
        team_id,
        inning_sequence: sequence,
        striker: active.iter().find(|stat| stat.is_striker).map(|stat| (*stat).clone()),
        non_striker: active.iter().find(|stat| !stat.is_striker).map(|stat| (*stat).clone()),
    }
}

/// Bowler of the current over, read off the stat rows' active flags.
pub fn project_bowler(snapshot: &MatchSnapshot, team_id: TeamId, sequence: u32) -> CurrentBowler {
    let bowler = snapshot
        .inning(sequence)
        .filter(|inning| inning.team_id == team_id)
        .and_then(|_| snapshot.inning_bowlers(sequence).into_iter().find(|stat| stat.is_current_bowler))
        .cloned();

    CurrentBowler { match_id: snapshot.match_id(), team_id, inning_sequence: sequence, bowler }
}

/// Read-only projections for viewers, cached until the next accepted mutation of the match.
///
/// Every invalidation bumps the match generation. A read-through fill that started under an
/// older generation is served to its caller but never cached.
pub struct LiveQuery {
    store: Arc<dyn AggregateStore>,
    batsmen: TtlCache<QueryKey, CurrentBatsmen>,
    bowlers: TtlCache<QueryKey, CurrentBowler>,
    generations: DashMap<MatchId, u64>,
}

impl LiveQuery {
    pub fn new(store: Arc<dyn AggregateStore>, ttl: Duration) -> Self {
        Self { store, batsmen: TtlCache::new(ttl), bowlers: TtlCache::new(ttl), generations: DashMap::new() }
    }

    pub async fn current_batsmen(&self, match_id: MatchId, team_id: TeamId, sequence: u32) -> ScoringResult<CurrentBatsmen> {
        let key = (match_id, team_id, sequence);
        if let Some(cached) = self.batsmen.get(&key) {
            return Ok(cached);
        }
        let generation = self.generation(match_id);
        let snapshot = self.load(match_id, team_id).await?;
        let projection = project_batsmen(&snapshot, team_id, sequence);
        fill(&self.generations, &self.batsmen, key, generation, projection.clone());
        Ok(projection)
    }

    pub async fn current_bowler(&self, match_id: MatchId, team_id: TeamId, sequence: u32) -> ScoringResult<CurrentBowler> {
        let key = (match_id, team_id, sequence);
        if let Some(cached) = self.bowlers.get(&key) {
            return Ok(cached);
        }
        let generation = self.generation(match_id);
        let snapshot = self.load(match_id, team_id).await?;
        let projection = project_bowler(&snapshot, team_id, sequence);
        fill(&self.generations, &self.bowlers, key, generation, projection.clone());
        Ok(projection)
    }

    /// Drop every cached projection of the match. Must run after the commit it follows.
    pub fn invalidate_match(&self, match_id: MatchId) {
        *self.generations.entry(match_id).or_insert(0) += 1;
        let dropped = self.batsmen.invalidate_where(|key| key.0 == match_id) + self.bowlers.invalidate_where(|key| key.0 == match_id);
        if dropped > 0 {
            trace!("Invalidated {} cached projections of {}", dropped, match_id);
        }
    }

    pub fn cleanup_expired(&self) {
        self.batsmen.cleanup_expired();
        self.bowlers.cleanup_expired();
    }

    pub fn stats(&self) -> QueryCacheStats {
        let mut stats = QueryCacheStats::default();
        for cache_stats in [&self.batsmen.stats, &self.bowlers.stats] {
            stats.hits += cache_stats.hits.load(Ordering::Relaxed);
            stats.misses += cache_stats.misses.load(Ordering::Relaxed);
            stats.evictions += cache_stats.evictions.load(Ordering::Relaxed);
        }
        stats
    }

    fn generation(&self, match_id: MatchId) -> u64 {
        self.generations.get(&match_id).map(|generation| *generation).unwrap_or(0)
    }

    async fn load(&self, match_id: MatchId, team_id: TeamId) -> ScoringResult<MatchSnapshot> {
        let snapshot = self
            .store
            .load_snapshot(match_id)
            .await
            .map_err(|source| ScoringError::Storage { attempts: 1, source })?
            .ok_or(ValidationError::UnknownMatch(match_id))?;
        if !snapshot.match_info.is_participant(team_id) {
            return Err(ValidationError::UnknownTeam { match_id, team_id }.into());
        }
        Ok(snapshot)
    }
}

/// Cache `value` unless the match was invalidated after `generation` was read. The generation
/// entry stays locked across the check and the insert, so an invalidation cannot slip between them.
fn fill<V: Clone>(generations: &DashMap<MatchId, u64>, cache: &TtlCache<QueryKey, V>, key: QueryKey, generation: u64, value: V) {
    let current = generations.entry(key.0).or_insert(0);
    if *current == generation {
        cache.insert(key, value);
    } else {
        trace!("Skipped caching {:?}: read at generation {}, now {}", key, generation, *current);
    }
}
