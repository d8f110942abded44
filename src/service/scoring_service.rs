use crate::data::{
    AggregateStore, BallEvent, BallRecord, FastHashMap, IdentityDirectory, Match, MatchId, MatchResult, MatchSnapshot, MemoryAggregateStore,
    PlayerId, ScoringCommit, StaticDirectory, TeamId,
};
use crate::logic::{
    BallEventProcessor, BallOutcome, CreaseChange, CurrentBatsmen, CurrentBowler, InningCompletion, InningLifecycleDetector, LiveQuery,
    MatchResultResolver, OpenInning, QueryCacheStats,
};
use crate::publish::{BroadcastSink, EventSink, LiveEvent, LiveStatePublisher, PublisherStatsSnapshot};
use crate::scoring_error::{ScoringError, ScoringResult, ValidationError};
use crate::service::config::ScoringConfig;
use crate::service::retry::RetryPolicy;
use crate::store_error::StoreError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

/// Display names of the two sides, resolved through the identity directory.
#[derive(Debug, Clone, Default)]
pub struct TeamNames(FastHashMap<TeamId, String>);

impl TeamNames {
    pub fn name(&self, team_id: TeamId) -> String {
        self.0.get(&team_id).cloned().unwrap_or_else(|| team_id.to_string())
    }
}

/// What one unit of work hands back besides the new snapshot.
struct UnitOutput<T> {
    value: T,
    ball: Option<BallRecord>,
    events: Vec<LiveEvent>,
}

impl<T> UnitOutput<T> {
    fn new(value: T) -> Self {
        Self { value, ball: None, events: Vec::new() }
    }

    fn with_ball(mut self, ball: BallRecord) -> Self {
        self.ball = Some(ball);
        self
    }

    fn with_event(mut self, event: LiveEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// A failed attempt: either final, or a storage error that may be retried.
enum AttemptError {
    Scoring(ScoringError),
    Store(StoreError),
}

impl From<ScoringError> for AttemptError {
    fn from(error: ScoringError) -> Self {
        Self::Scoring(error)
    }
}

impl From<StoreError> for AttemptError {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}

/// Scoring service
///
/// Entry point of the scoring core. Every mutating call runs as one unit of work:
/// take the match lock, load the snapshot, apply the change to a copy, commit the
/// changed rows atomically, then invalidate cached projections and publish. Calls for
/// one match are serialized; calls for different matches run concurrently.
pub struct ScoringService {
    config: ScoringConfig,
    store: Arc<dyn AggregateStore>,
    directory: Arc<dyn IdentityDirectory>,
    processor: BallEventProcessor,
    lifecycle: InningLifecycleDetector,
    resolver: MatchResultResolver,
    query: LiveQuery,
    publisher: LiveStatePublisher,
    retry: RetryPolicy,
    match_locks: DashMap<MatchId, Arc<Mutex<()>>>,
    team_names: DashMap<TeamId, String>,
    viewers: Option<Arc<BroadcastSink>>,
}

impl ScoringService {
    /// Create the service and start its publisher. Must be called inside a tokio runtime.
    pub fn new(
        config: ScoringConfig,
        store: Arc<dyn AggregateStore>,
        directory: Arc<dyn IdentityDirectory>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        info!(
            "Initializing ScoringService (timeout {:?}, {} storage attempt(s))",
            config.scoring_timeout(),
            config.storage_max_attempts
        );
        Self {
            processor: BallEventProcessor::new(),
            lifecycle: InningLifecycleDetector::new(config.follow_on_margin),
            resolver: MatchResultResolver::new(),
            query: LiveQuery::new(Arc::clone(&store), config.query_cache_ttl()),
            publisher: LiveStatePublisher::spawn(sink, config.publisher_config()),
            retry: RetryPolicy::from_config(&config),
            match_locks: DashMap::new(),
            team_names: DashMap::new(),
            viewers: None,
            config,
            store,
            directory,
        }
    }

    /// Register a match written by match setup.
    pub async fn register_match(&self, match_info: Match) -> ScoringResult<()> {
        let match_id = match_info.id;
        self.store.create_match(match_info).await.map_err(|source| match source {
            StoreError::MatchExists(match_id) => ValidationError::DuplicateMatch(match_id).into(),
            source => ScoringError::Storage { attempts: 1, source },
        })?;
        debug!("Registered {}", match_id);
        Ok(())
    }

    pub async fn start_match(&self, match_id: MatchId) -> ScoringResult<()> {
        self.run_unit(match_id, "start_match", |snapshot, _| {
            self.lifecycle.start_match(snapshot)?;
            Ok(UnitOutput::new(()))
        })
        .await
    }

    pub async fn open_inning(&self, match_id: MatchId, request: OpenInning) -> ScoringResult<CreaseChange> {
        self.run_unit(match_id, "open_inning", |snapshot, _| {
            let change = self.lifecycle.open_inning(snapshot, &request)?;
            let event = LiveEvent::inning_opened(match_id, &change);
            Ok(UnitOutput::new(change).with_event(event))
        })
        .await
    }

    /// Apply one delivery. Inning completion and, when decided, the match result are
    /// committed together with the ball.
    pub async fn apply_ball_event(&self, match_id: MatchId, team_id: TeamId, event: BallEvent) -> ScoringResult<BallOutcome> {
        let recorded_at = Utc::now();
        self.run_unit(match_id, "apply_ball_event", |snapshot, names| {
            let applied = self.processor.apply(snapshot, team_id, &event, recorded_at)?;
            let completion = self.lifecycle.evaluate_and_complete(snapshot, applied.inning_sequence)?;
            let result = match completion {
                Some(_) => self.resolve(snapshot, names, recorded_at)?,
                None => None,
            };

            let mut events = vec![LiveEvent::score_update(match_id, &applied)];
            events.extend(completion.as_ref().map(|completion| LiveEvent::inning_completed(match_id, completion)));
            events.extend(result.as_ref().map(LiveEvent::match_result));

            let ball = applied.record.clone();
            let mut output = UnitOutput::new(BallOutcome { applied, completion, result }).with_ball(ball);
            output.events = events;
            Ok(output)
        })
        .await
    }

    pub async fn nominate_batsman(&self, match_id: MatchId, team_id: TeamId, player_id: PlayerId) -> ScoringResult<CreaseChange> {
        self.run_unit(match_id, "nominate_batsman", |snapshot, _| {
            let change = self.processor.nominate_batsman(snapshot, team_id, player_id)?;
            let event = LiveEvent::crease_update(match_id, &change);
            Ok(UnitOutput::new(change).with_event(event))
        })
        .await
    }

    pub async fn assign_bowler(&self, match_id: MatchId, team_id: TeamId, bowler_id: PlayerId) -> ScoringResult<CreaseChange> {
        self.run_unit(match_id, "assign_bowler", |snapshot, _| {
            let change = self.processor.assign_bowler(snapshot, team_id, bowler_id)?;
            let event = LiveEvent::crease_update(match_id, &change);
            Ok(UnitOutput::new(change).with_event(event))
        })
        .await
    }

    /// Test only: close the batting team's inning by declaration.
    pub async fn declare_inning(&self, match_id: MatchId, team_id: TeamId) -> ScoringResult<(InningCompletion, Option<MatchResult>)> {
        let decided_at = Utc::now();
        self.run_unit(match_id, "declare_inning", |snapshot, names| {
            let completion = self.lifecycle.declare(snapshot, team_id)?;
            let result = self.resolve(snapshot, names, decided_at)?;
            let mut output = UnitOutput::new((completion.clone(), result.clone())).with_event(LiveEvent::inning_completed(match_id, &completion));
            if let Some(result) = &result {
                output = output.with_event(LiveEvent::match_result(result));
            }
            Ok(output)
        })
        .await
    }

    /// Decide and persist the result if the completed innings allow it. Returns the
    /// already recorded result unchanged when there is one.
    pub async fn try_resolve(&self, match_id: MatchId) -> ScoringResult<Option<MatchResult>> {
        let decided_at = Utc::now();
        self.run_unit(match_id, "try_resolve", |snapshot, names| {
            if let Some(existing) = &snapshot.match_info.result {
                return Ok(UnitOutput::new(Some(existing.clone())));
            }
            let result = self.resolve(snapshot, names, decided_at)?;
            let mut output = UnitOutput::new(result.clone());
            if let Some(result) = &result {
                output = output.with_event(LiveEvent::match_result(result));
            }
            Ok(output)
        })
        .await
    }

    /// Play ended externally: close the open inning and settle the match.
    pub async fn conclude_play(&self, match_id: MatchId) -> ScoringResult<Option<MatchResult>> {
        let decided_at = Utc::now();
        self.run_unit(match_id, "conclude_play", |snapshot, names| {
            let completion = self.lifecycle.conclude_play(snapshot)?;
            let result = self.resolve(snapshot, names, decided_at)?;

            let mut output = UnitOutput::new(result.clone());
            if let Some(completion) = &completion {
                output = output.with_event(LiveEvent::inning_completed(match_id, completion));
            }
            if let Some(result) = &result {
                output = output.with_event(LiveEvent::match_result(result));
            }
            Ok(output)
        })
        .await
    }

    pub async fn abandon_match(&self, match_id: MatchId) -> ScoringResult<MatchResult> {
        let decided_at = Utc::now();
        self.run_unit(match_id, "abandon_match", |snapshot, _| {
            let result = self.resolver.abandon(snapshot, decided_at)?;
            let event = LiveEvent::match_result(&result);
            Ok(UnitOutput::new(result).with_event(event))
        })
        .await
    }

    pub async fn current_batsmen(&self, match_id: MatchId, team_id: TeamId, inning_sequence: u32) -> ScoringResult<CurrentBatsmen> {
        self.query.current_batsmen(match_id, team_id, inning_sequence).await
    }

    pub async fn current_bowler(&self, match_id: MatchId, team_id: TeamId, inning_sequence: u32) -> ScoringResult<CurrentBowler> {
        self.query.current_bowler(match_id, team_id, inning_sequence).await
    }

    /// Audit trail of applied deliveries, in application order.
    pub async fn ball_log(&self, match_id: MatchId) -> ScoringResult<Vec<BallRecord>> {
        self.store.ball_records(match_id).await.map_err(|source| match source {
            StoreError::MatchNotFound(match_id) => ValidationError::UnknownMatch(match_id).into(),
            source => ScoringError::Storage { attempts: 1, source },
        })
    }

    /// Current persisted state of a match.
    pub async fn snapshot(&self, match_id: MatchId) -> ScoringResult<MatchSnapshot> {
        self.store
            .load_snapshot(match_id)
            .await
            .map_err(|source| ScoringError::Storage { attempts: 1, source })?
            .ok_or_else(|| ValidationError::UnknownMatch(match_id).into())
    }

    /// Subscribe to live events of the built-in broadcast sink. `None` when the service
    /// was built with a custom sink; subscribe on that sink instead.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<LiveEvent>> {
        self.viewers.as_ref().map(|sink| sink.subscribe())
    }

    /// Matches with a unit of work running or waiting.
    pub fn busy_matches(&self) -> usize {
        self.match_locks.len()
    }

    pub fn publisher_stats(&self) -> PublisherStatsSnapshot {
        self.publisher.stats()
    }

    pub fn query_stats(&self) -> QueryCacheStats {
        self.query.stats()
    }

    pub fn get_config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Stop accepting live events and drain the ones already queued.
    pub async fn shutdown(self) -> PublisherStatsSnapshot {
        info!("Stopping ScoringService");
        let stats = self.publisher.shutdown().await;
        info!(
            "ScoringService stopped: {} live event(s) delivered, {} dropped, {} failed",
            stats.delivered, stats.dropped, stats.failed
        );
        stats
    }

    fn resolve(&self, snapshot: &mut MatchSnapshot, names: &TeamNames, decided_at: DateTime<Utc>) -> ScoringResult<Option<MatchResult>> {
        if snapshot.match_info.result.is_some() {
            return Ok(None);
        }
        let outcome = self.resolver.decide(snapshot);
        let Some(result) = self.resolver.build_result(snapshot, outcome, |team| names.name(team), decided_at) else {
            return Ok(None);
        };
        self.resolver.record(snapshot, result.clone())?;
        Ok(Some(result))
    }

    fn match_lock(&self, match_id: MatchId) -> Arc<Mutex<()>> {
        Arc::clone(self.match_locks.entry(match_id).or_default().value())
    }

    async fn names_for(&self, match_info: &Match) -> TeamNames {
        let mut names = FastHashMap::default();
        for team_id in match_info.teams {
            if let Some(name) = self.team_names.get(&team_id) {
                names.insert(team_id, name.clone());
                continue;
            }
            if let Some(team) = self.directory.team(team_id).await {
                self.team_names.insert(team_id, team.name.clone());
                names.insert(team_id, team.name);
            }
        }
        TeamNames(names)
    }

    /// Run `mutate` as one serialized, bounded, atomically committed unit of work.
    ///
    /// `mutate` is invoked against a fresh snapshot on every attempt, so it must not
    /// carry state between calls.
    async fn run_unit<T, F>(&self, match_id: MatchId, operation: &'static str, mutate: F) -> ScoringResult<T>
    where
        F: Fn(&mut MatchSnapshot, &TeamNames) -> ScoringResult<UnitOutput<T>>,
    {
        let started = Instant::now();
        let work = async {
            let _guard = self.match_lock(match_id).lock_owned().await;
            let output = self.commit_with_retry(match_id, operation, &mutate).await?;

            // still under the match lock, so live events leave in commit order
            self.query.invalidate_match(match_id);
            for event in output.events {
                let _ = self.publisher.publish(event);
            }
            Ok(output.value)
        };

        let result = tokio::time::timeout(self.config.scoring_timeout(), work).await;
        self.release_idle_lock(match_id);
        match result {
            Ok(result) => result,
            Err(_) => {
                let elapsed = started.elapsed();
                warn!("{} on {} timed out after {:?}", operation, match_id, elapsed);
                Err(ScoringError::Timeout { match_id, elapsed })
            }
        }
    }

    async fn commit_with_retry<T, F>(&self, match_id: MatchId, operation: &'static str, mutate: &F) -> ScoringResult<UnitOutput<T>>
    where
        F: Fn(&mut MatchSnapshot, &TeamNames) -> ScoringResult<UnitOutput<T>>,
    {
        let mut attempt = 1;
        loop {
            match self.attempt(match_id, mutate).await {
                Ok(output) => return Ok(output),
                Err(AttemptError::Scoring(e)) => return Err(e),
                Err(AttemptError::Store(source)) if source.is_transient() && self.retry.should_retry(attempt) => {
                    attempt += 1;
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!("{} on {} failed ({}), attempt {}/{} in {:?}", operation, match_id, source, attempt, self.retry.max_attempts, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Store(source)) => {
                    error!(
                        target: "scoring::alert",
                        "{} on {} abandoned after {} attempt(s): {}", operation, match_id, attempt, source
                    );
                    return Err(ScoringError::Storage { attempts: attempt, source });
                }
            }
        }
    }

    /// Drop the match lock once nobody holds or waits on it.
    fn release_idle_lock(&self, match_id: MatchId) {
        // the map's own handle is the only one left
        self.match_locks.remove_if(&match_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn attempt<T, F>(&self, match_id: MatchId, mutate: &F) -> Result<UnitOutput<T>, AttemptError>
    where
        F: Fn(&mut MatchSnapshot, &TeamNames) -> ScoringResult<UnitOutput<T>>,
    {
        let before = self
            .store
            .load_snapshot(match_id)
            .await?
            .ok_or(ScoringError::from(ValidationError::UnknownMatch(match_id)))?;
        let names = self.names_for(&before.match_info).await;

        let mut after = before.clone();
        let output = mutate(&mut after, &names)?;

        let mut commit = ScoringCommit::diff(&before, &after);
        if let Some(ball) = &output.ball {
            commit = commit.with_ball(ball.clone());
        }
        if !commit.is_empty() {
            let version = self.store.commit(commit).await?;
            debug!("{} committed at version {}", match_id, version);
        }
        Ok(output)
    }
}

/// Builder for ScoringService
pub struct ScoringServiceBuilder {
    config: Option<ScoringConfig>,
    store: Option<Arc<dyn AggregateStore>>,
    directory: Option<Arc<dyn IdentityDirectory>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ScoringServiceBuilder {
    pub fn new() -> Self {
        Self { config: None, store: None, directory: None, sink: None }
    }

    pub fn with_config(mut self, config: ScoringConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AggregateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn IdentityDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Missing parts default to the in-memory store, an empty directory and an
    /// in-process broadcast sink reachable through [`ScoringService::subscribe`].
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> ScoringService {
        let config = self.config.unwrap_or_else(|| ScoringConfig::from_env().unwrap_or_default());
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryAggregateStore::new()));
        let directory = self.directory.unwrap_or_else(|| Arc::new(StaticDirectory::new()));
        match self.sink {
            Some(sink) => ScoringService::new(config, store, directory, sink),
            None => {
                let viewers = Arc::new(BroadcastSink::new(config.publish_channel_capacity));
                let mut service = ScoringService::new(config, store, directory, viewers.clone());
                service.viewers = Some(viewers);
                service
            }
        }
    }
}

impl Default for ScoringServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
