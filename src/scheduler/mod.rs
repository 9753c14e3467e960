//! Per-match polling timelines.
//!
//! Each discovered match gets one poll chain (a single tokio task that owns the
//! last snapshot and trend and hands them to its next job by value) plus two
//! one-shot notice tasks. All of them watch the timeline phase in the
//! [`TimelineStore`] and stand down once it is terminal.

pub mod job;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{HealthState, LatencyStats};
use crate::config::SchedulerConfig;
use crate::detector::{self, ScoreTrend};
use crate::error::{FetchError, SchedulerError};
use crate::fetcher::MatchSource;
use crate::notify::render::{render_event, render_post_kickoff, render_pre_match};
use crate::notify::Notifier;
use crate::state::{TimelinePhase, TimelineStore};
use crate::types::{MatchSnapshot, MatchStatus};

pub use job::{JobKind, NoticeJob, PollContext, PollJob, ScheduledJob};

/// How a timeline's poll chain ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineOutcome {
    /// The match was observed `Finished`.
    Settled,
    /// The timeline went terminal from outside while a job was pending.
    Cancelled,
}

enum PollStep {
    Reschedule(PollJob),
    Settled,
    Cancelled,
}

#[derive(Clone)]
pub struct Scheduler {
    cfg: Arc<SchedulerConfig>,
    source: Arc<dyn MatchSource>,
    notifier: Arc<dyn Notifier>,
    store: Arc<TimelineStore>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

impl Scheduler {
    pub fn new(
        cfg: SchedulerConfig,
        source: Arc<dyn MatchSource>,
        notifier: Arc<dyn Notifier>,
        store: Arc<TimelineStore>,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self {
            cfg: Arc::new(cfg),
            source,
            notifier,
            store,
            health,
            latency,
        }
    }

    /// Start a timeline for `snapshot` unless its match id is already known.
    ///
    /// Returns the poll chain's handle, or `None` when the id is registered
    /// (running or terminal). The chain publishes its own terminal phase.
    pub fn start_timeline(
        &self,
        snapshot: MatchSnapshot,
    ) -> Option<JoinHandle<Result<TimelineOutcome, SchedulerError>>> {
        let phase = self.store.try_register(&snapshot)?;
        self.health.inc_started();

        let match_id = snapshot.id;
        let now = Utc::now();
        let kicked_off = snapshot.kickoff <= now;

        if !kicked_off {
            let fire_at = pre_match_fire_at(
                snapshot.kickoff,
                self.cfg.kickoff_notice_lead,
                random_jitter(self.cfg.notice_jitter),
            );
            if fire_at > now {
                self.spawn_notice(ScheduledJob::new(
                    match_id,
                    JobKind::PreMatchNotice,
                    fire_at,
                    snapshot.clone(),
                    phase.clone(),
                ));
            }
        }

        let post_kickoff_at = snapshot.kickoff + to_chrono(self.cfg.post_kickoff_offset);
        if post_kickoff_at > now {
            self.spawn_notice(ScheduledJob::new(
                match_id,
                JobKind::PostKickoffNotice,
                post_kickoff_at,
                snapshot.clone(),
                phase.clone(),
            ));
        }

        let trend = match (snapshot.team_score(), snapshot.opposition_score()) {
            (Some(team), Some(opposition)) if kicked_off => ScoreTrend::classify(team, opposition),
            _ => ScoreTrend::seeded(),
        };
        let first_poll = if kicked_off { now } else { snapshot.kickoff };
        let give_up_at =
            tokio::time::Instant::now() + job::until(snapshot.kickoff + to_chrono(self.cfg.timeline_cutoff));

        debug!(match_id, "[SCHEDULER] Fixture:\n{snapshot}");
        info!(
            match_id,
            kickoff = %snapshot.kickoff,
            first_poll = %first_poll,
            "[SCHEDULER] Timeline started: {} v {}",
            snapshot.home_team,
            snapshot.away_team,
        );

        let job = ScheduledJob::new(
            match_id,
            JobKind::Poll,
            first_poll,
            PollContext::new(snapshot, trend, give_up_at),
            phase,
        );
        let scheduler = self.clone();
        Some(tokio::spawn(async move { scheduler.run_timeline(job).await }))
    }

    async fn run_timeline(self, job: PollJob) -> Result<TimelineOutcome, SchedulerError> {
        let match_id = job.match_id;
        let result = self.run_chain(job).await;

        match &result {
            Ok(TimelineOutcome::Settled) => {
                self.store.set_phase(match_id, TimelinePhase::Settled);
                self.health.inc_settled();
                info!(match_id, "[SCHEDULER] Timeline settled");
            }
            Ok(TimelineOutcome::Cancelled) => {
                debug!(match_id, "[SCHEDULER] Timeline cancelled with a job pending");
            }
            Err(e) => {
                self.store.set_phase(match_id, TimelinePhase::Abandoned);
                self.health.inc_abandoned();
                error!(match_id, "[SCHEDULER] Timeline abandoned: {e}");
            }
        }
        result
    }

    /// Jobs of one timeline run strictly one after another on this task.
    async fn run_chain(&self, mut job: PollJob) -> Result<TimelineOutcome, SchedulerError> {
        loop {
            if !job.wait_until_due().await {
                return Ok(TimelineOutcome::Cancelled);
            }
            match self.poll(job).await? {
                PollStep::Reschedule(next) => job = next,
                PollStep::Settled => return Ok(TimelineOutcome::Settled),
                PollStep::Cancelled => return Ok(TimelineOutcome::Cancelled),
            }
        }
    }

    async fn poll(&self, job: PollJob) -> Result<PollStep, SchedulerError> {
        let match_id = job.match_id;
        let fetched = self.fetch(match_id).await;

        // Settled from outside while the fetch was in flight.
        if job.is_cancelled() {
            return Ok(PollStep::Cancelled);
        }

        let mut ctx = job.context.clone();
        let current = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                ctx.failures += 1;
                if ctx.failures >= self.cfg.max_fetch_retries {
                    return Err(SchedulerError::RetriesExhausted {
                        match_id,
                        attempts: ctx.failures,
                        last: e,
                    });
                }
                warn!(
                    match_id,
                    attempt = ctx.failures,
                    "[SCHEDULER] Fetch failed ({e}), retrying in {}s",
                    self.cfg.retry_backoff.as_secs(),
                );
                return Ok(PollStep::Reschedule(job.reschedule(self.cfg.retry_backoff, ctx)));
            }
        };

        let (changes, trend) = detector::diff(&ctx.last, &current, ctx.trend);
        if changes.is_empty() {
            debug!(match_id, status = %current.status, "[SCHEDULER] No change");
        }
        if trend != ctx.trend {
            debug!(match_id, trend = %trend.kind, "[SCHEDULER] {}", current.scoreline());
        }
        for event in changes.events() {
            debug!(match_id, %event, "[SCHEDULER] Change detected");
            let text = render_event(event, &current, &trend);
            self.notify(match_id, &text).await;
        }

        if current.status.is_live() {
            self.store.set_phase(match_id, TimelinePhase::Live);
        }
        if let MatchStatus::Other(raw) = &current.status {
            debug!(match_id, status = %raw, "[SCHEDULER] Unmapped status, still polling");
        }

        if current.status == MatchStatus::Finished {
            return Ok(PollStep::Settled);
        }
        if ctx.past_cutoff() {
            return Err(SchedulerError::PastCutoff {
                match_id,
                status: current.status,
            });
        }

        let next = ctx.advance(current, trend);
        Ok(PollStep::Reschedule(job.reschedule(self.cfg.poll_interval, next)))
    }

    /// One bounded fetch. Elapsed timeouts count as a failed fetch.
    async fn fetch(&self, match_id: u64) -> Result<MatchSnapshot, FetchError> {
        let started = tokio::time::Instant::now();
        let result = tokio::time::timeout(self.cfg.fetch_timeout, self.source.fetch_match(match_id))
            .await
            .unwrap_or(Err(FetchError::Timeout));
        self.latency.record(started.elapsed(), &result);
        result
    }

    /// Send failures are counted and logged, never retried.
    async fn notify(&self, match_id: u64, text: &str) {
        match self.notifier.send(&self.cfg.destination, text).await {
            Ok(()) => self.health.record_send(true),
            Err(e) => {
                self.health.record_send(false);
                warn!(match_id, "[SCHEDULER] Notification failed: {e}");
            }
        }
    }

    fn spawn_notice(&self, mut job: NoticeJob) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            if !job.wait_until_due().await {
                debug!(match_id = job.match_id, kind = %job.kind, "[SCHEDULER] Notice cancelled");
                return;
            }
            let text = match job.kind {
                JobKind::PreMatchNotice => render_pre_match(&job.context),
                JobKind::PostKickoffNotice => render_post_kickoff(&job.context),
                JobKind::Poll => return,
            };
            scheduler.notify(job.match_id, &text).await;
        });
    }
}

/// `kickoff - lead + jitter`.
pub fn pre_match_fire_at(kickoff: DateTime<Utc>, lead: Duration, jitter: Duration) -> DateTime<Utc> {
    kickoff - to_chrono(lead) + to_chrono(jitter)
}

/// Uniform in `0..=max`, whole seconds.
fn random_jitter(max: Duration) -> Duration {
    Duration::from_secs(rand::rng().random_range(0..=max.as_secs()))
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::error::NotifyError;
    use crate::notify::MockNotifier;
    use crate::testutil::snapshot;

    /// Replays a fixed list of fetch results, then reports unavailable.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<MatchSnapshot, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<MatchSnapshot, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MatchSource for ScriptedSource {
        async fn fetch_match(&self, _id: u64) -> Result<MatchSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Unavailable("script exhausted".into())))
        }

        async fn fetch_fixtures(
            &self,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<MatchSnapshot>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, _destination: &str, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn scheduler_with(
        source: Arc<dyn MatchSource>,
        notifier: Arc<dyn Notifier>,
        cfg: SchedulerConfig,
    ) -> Scheduler {
        Scheduler::new(
            cfg,
            source,
            notifier,
            TimelineStore::new(),
            Arc::new(HealthState::new()),
            Arc::new(LatencyStats::new()),
        )
    }

    fn upcoming_in(minutes: i64) -> MatchSnapshot {
        let mut snap = snapshot(MatchStatus::Scheduled, None, None);
        snap.kickoff = Utc::now() + chrono::Duration::minutes(minutes);
        snap
    }

    #[tokio::test(start_paused = true)]
    async fn finished_match_settles_and_stops_polling() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(MatchStatus::InPlay, Some(1), Some(0))),
            Ok(snapshot(MatchStatus::Finished, Some(1), Some(0))),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(source.clone(), notifier.clone(), SchedulerConfig::default());

        let live = snapshot(MatchStatus::InPlay, Some(0), Some(0));
        let handle = scheduler.start_timeline(live.clone()).unwrap();
        assert_eq!(handle.await.unwrap(), Ok(TimelineOutcome::Settled));

        assert_eq!(source.calls(), 2);
        assert_eq!(scheduler.store.phase(live.id), Some(TimelinePhase::Settled));
        assert_eq!(scheduler.health.settled(), 1);
        // Settled timelines accept nothing new.
        assert!(scheduler.start_timeline(live).is_none());

        // The post-kickoff notice was still pending and must not fire.
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(source.calls(), 2);
        let messages = notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("GOAL! Liverpool FC score!"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_abandon_once() {
        let source = ScriptedSource::new(vec![
            Err(FetchError::Timeout),
            Err(FetchError::Unavailable("503".into())),
            Err(FetchError::Malformed("missing status".into())),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let cfg = SchedulerConfig {
            max_fetch_retries: 3,
            ..SchedulerConfig::default()
        };
        let scheduler = scheduler_with(source.clone(), notifier.clone(), cfg);

        let live = snapshot(MatchStatus::InPlay, Some(0), Some(0));
        let handle = scheduler.start_timeline(live.clone()).unwrap();
        let err = handle.await.unwrap().unwrap_err();

        assert_eq!(
            err,
            SchedulerError::RetriesExhausted {
                match_id: live.id,
                attempts: 3,
                last: FetchError::Malformed("missing status".into()),
            }
        );
        assert_eq!(source.calls(), 3);
        assert_eq!(scheduler.store.phase(live.id), Some(TimelinePhase::Abandoned));
        assert_eq!(scheduler.health.abandoned(), 1);
        assert_eq!(scheduler.health.settled(), 0);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn a_good_fetch_resets_the_failure_count() {
        let source = ScriptedSource::new(vec![
            Err(FetchError::Timeout),
            Ok(snapshot(MatchStatus::InPlay, Some(0), Some(0))),
            Err(FetchError::Timeout),
            Ok(snapshot(MatchStatus::Finished, Some(0), Some(0))),
        ]);
        let cfg = SchedulerConfig {
            max_fetch_retries: 2,
            ..SchedulerConfig::default()
        };
        let scheduler = scheduler_with(source.clone(), Arc::new(RecordingNotifier::default()), cfg);

        let handle = scheduler
            .start_timeline(snapshot(MatchStatus::InPlay, Some(0), Some(0)))
            .unwrap();
        assert_eq!(handle.await.unwrap(), Ok(TimelineOutcome::Settled));
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sends_do_not_stop_the_timeline() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(MatchStatus::InPlay, Some(0), Some(1))),
            Ok(snapshot(MatchStatus::Finished, Some(0), Some(1))),
        ]);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .returning(|_, _| Err(NotifyError::Unavailable("chat not found".into())));
        let scheduler = scheduler_with(source.clone(), Arc::new(notifier), SchedulerConfig::default());

        let handle = scheduler
            .start_timeline(snapshot(MatchStatus::InPlay, Some(0), Some(0)))
            .unwrap();
        assert_eq!(handle.await.unwrap(), Ok(TimelineOutcome::Settled));
        // Conceded + full time.
        assert_eq!(scheduler.health.failed(), 2);
        assert_eq!(scheduler.health.sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn upcoming_match_gets_notice_then_polls_from_kickoff() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(MatchStatus::InPlay, Some(0), Some(0))),
            Ok(snapshot(MatchStatus::Finished, Some(0), Some(0))),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(source.clone(), notifier.clone(), SchedulerConfig::default());

        let upcoming = upcoming_in(30);
        let handle = scheduler.start_timeline(upcoming.clone()).unwrap();
        assert_eq!(handle.await.unwrap(), Ok(TimelineOutcome::Settled));

        let messages = notifier.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], render_pre_match(&upcoming));
        assert!(messages[1].starts_with("Kick off!"));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_jobs_after_settlement_do_nothing() {
        let source = ScriptedSource::new(vec![Ok(snapshot(MatchStatus::InPlay, Some(0), Some(0)))]);
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_with(source.clone(), notifier.clone(), SchedulerConfig::default());

        let upcoming = upcoming_in(30);
        let handle = scheduler.start_timeline(upcoming.clone()).unwrap();
        scheduler.store.set_phase(upcoming.id, TimelinePhase::Settled);

        assert_eq!(handle.await.unwrap(), Ok(TimelineOutcome::Cancelled));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(source.calls(), 0);
        assert!(notifier.messages().is_empty());
        assert_eq!(scheduler.health.settled(), 0);
    }

    /// Never finishes: either hangs or keeps reporting `status`.
    struct StuckSource {
        status: Option<MatchStatus>,
        calls: AtomicUsize,
    }

    impl StuckSource {
        fn new(status: Option<MatchStatus>) -> Arc<Self> {
            Arc::new(Self {
                status,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MatchSource for StuckSource {
        async fn fetch_match(&self, _id: u64) -> Result<MatchSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.status {
                Some(status) => Ok(snapshot(status.clone(), None, None)),
                None => std::future::pending().await,
            }
        }

        async fn fetch_fixtures(
            &self,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<MatchSnapshot>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn postponed_match_is_abandoned_past_the_cutoff() {
        let postponed = MatchStatus::Other("POSTPONED".into());
        let source = StuckSource::new(Some(postponed.clone()));
        let notifier = Arc::new(RecordingNotifier::default());
        let cfg = SchedulerConfig {
            poll_interval: Duration::from_secs(60),
            timeline_cutoff: Duration::from_secs(2 * 3600),
            ..SchedulerConfig::default()
        };
        let scheduler = scheduler_with(source.clone(), notifier.clone(), cfg);

        let fixture = snapshot(MatchStatus::Scheduled, None, None);
        let handle = scheduler.start_timeline(fixture.clone()).unwrap();
        let err = handle.await.unwrap().unwrap_err();

        assert_eq!(
            err,
            SchedulerError::PastCutoff {
                match_id: fixture.id,
                status: postponed,
            }
        );
        // About one poll a minute for the two hours left before the cutoff.
        assert!((115..=125).contains(&source.calls()), "calls = {}", source.calls());
        assert_eq!(scheduler.store.phase(fixture.id), Some(TimelinePhase::Abandoned));
        assert_eq!(scheduler.health.abandoned(), 1);

        // Polling has stopped and the next discovery can prune it.
        let calls = source.calls();
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(source.calls(), calls);
        let tomorrow = Utc::now().date_naive() + chrono::Duration::days(1);
        assert_eq!(scheduler.store.prune_terminal_before(tomorrow), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_fetches_time_out_into_abandonment() {
        let source = StuckSource::new(None);
        let cfg = SchedulerConfig {
            max_fetch_retries: 3,
            ..SchedulerConfig::default()
        };
        let scheduler = scheduler_with(source.clone(), Arc::new(RecordingNotifier::default()), cfg);

        let live = snapshot(MatchStatus::InPlay, Some(0), Some(0));
        let handle = scheduler.start_timeline(live.clone()).unwrap();
        let err = handle.await.unwrap().unwrap_err();

        assert_eq!(
            err,
            SchedulerError::RetriesExhausted {
                match_id: live.id,
                attempts: 3,
                last: FetchError::Timeout,
            }
        );
        assert_eq!(source.calls(), 3);
        assert_eq!(scheduler.latency.report().timeouts, 3);
        assert_eq!(scheduler.store.phase(live.id), Some(TimelinePhase::Abandoned));
    }

    #[test]
    fn pre_match_notice_lands_inside_the_jitter_window() {
        let kickoff = Utc::now() + chrono::Duration::hours(2);
        let lead = Duration::from_secs(900);
        for _ in 0..50 {
            let jitter = random_jitter(Duration::from_secs(120));
            let at = pre_match_fire_at(kickoff, lead, jitter);
            assert!(at >= kickoff - chrono::Duration::seconds(900));
            assert!(at <= kickoff - chrono::Duration::seconds(780));
        }
    }
}
