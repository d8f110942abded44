use chrono::Utc;
use cricket_scoring::{
    BallEvent, BallEventProcessor, ExtrasKind, InningLifecycleDetector, Match, MatchFormat, MatchId, MatchResultResolver, MatchSnapshot,
    OpenInning, PlayerId, ScoringServiceBuilder, TeamId, TossDecision,
};
use criterion::{Criterion, criterion_group, criterion_main};
use lazy_static::lazy_static;

const HOME: TeamId = TeamId(1);
const AWAY: TeamId = TeamId(2);

lazy_static! {
    static ref FIXTURE: Match = Match::new(MatchId(1), MatchFormat::Odi, HOME, AWAY)
        .with_toss(HOME, TossDecision::Bat)
        .with_squad(HOME, (1..=11).map(PlayerId).collect())
        .with_squad(AWAY, (101..=111).map(PlayerId).collect());
    static ref OPENERS: OpenInning = OpenInning::new(HOME, PlayerId(1), PlayerId(2), PlayerId(101));
    static ref LIVE_INNING: MatchSnapshot = live_inning().unwrap();
}

fn live_inning() -> eyre::Result<MatchSnapshot> {
    let lifecycle = InningLifecycleDetector::default();
    let mut snapshot = MatchSnapshot::new(FIXTURE.clone());
    lifecycle.start_match(&mut snapshot)?;
    lifecycle.open_inning(&mut snapshot, &OPENERS)?;
    Ok(snapshot)
}

fn next_ball(snapshot: &MatchSnapshot, runs_off_bat: u32) -> eyre::Result<BallEvent> {
    let inning = snapshot.open_inning().ok_or_else(|| eyre::eyre!("no inning in progress"))?;
    Ok(BallEvent {
        match_id: snapshot.match_id(),
        team_id: inning.bowling_team_id,
        bowler_id: inning.current_bowler.ok_or_else(|| eyre::eyre!("no bowler"))?,
        striker_id: inning.striker.ok_or_else(|| eyre::eyre!("no striker"))?,
        non_striker_id: inning.non_striker.ok_or_else(|| eyre::eyre!("no non-striker"))?,
        runs_off_bat,
        extras: ExtrasKind::None,
        extra_runs: 0,
        wicket: None,
        over: inning.current_over(),
        ball_in_over: inning.next_ball_in_over(),
        delivery: inning.deliveries,
    })
}

/// One over of mixed scoring against a fresh copy of the live inning.
fn bowl_over() -> eyre::Result<()> {
    let processor = BallEventProcessor::new();
    let lifecycle = InningLifecycleDetector::default();
    let resolver = MatchResultResolver::new();
    let mut snapshot = LIVE_INNING.clone();

    for runs in [1, 0, 4, 2, 6, 1] {
        let event = next_ball(&snapshot, runs)?;
        let applied = processor.apply(&mut snapshot, HOME, &event, Utc::now())?;
        lifecycle.evaluate_and_complete(&mut snapshot, applied.inning_sequence)?;
        resolver.decide(&snapshot);
    }
    Ok(())
}

async fn service_over() -> eyre::Result<()> {
    let service = ScoringServiceBuilder::new().build();
    service.register_match(FIXTURE.clone()).await?;
    service.start_match(FIXTURE.id).await?;
    service.open_inning(FIXTURE.id, OPENERS.clone()).await?;

    for runs in [1, 0, 4, 2, 6, 1] {
        let event = next_ball(&service.snapshot(FIXTURE.id).await?, runs)?;
        service.apply_ball_event(FIXTURE.id, HOME, event).await?;
    }
    service.shutdown().await;
    Ok(())
}

fn benchmark_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    group.sample_size(50);
    group.bench_function("processor_bowl_over", |b| b.iter(bowl_over));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    group.bench_function("service_bowl_over", |b| b.to_async(&runtime).iter(service_over));
    group.finish();
}

criterion_group!(benches, benchmark_scoring);
criterion_main!(benches);
