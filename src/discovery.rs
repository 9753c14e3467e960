use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, error, info};

use crate::api::HealthState;
use crate::error::Result;
use crate::fetcher::MatchSource;
use crate::scheduler::job::until;
use crate::scheduler::Scheduler;
use crate::state::TimelineStore;
use crate::types::{FollowedSide, MatchStatus};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryStats {
    pub fixtures: usize,
    pub started: usize,
    pub already_known: usize,
    pub not_followed: usize,
    pub already_finished: usize,
    pub pruned: usize,
}

/// Seeds one timeline per followed fixture, once a day.
pub struct DailyDiscovery {
    source: Arc<dyn MatchSource>,
    scheduler: Scheduler,
    store: Arc<TimelineStore>,
    health: Arc<HealthState>,
    discovery_time: NaiveTime,
}

impl DailyDiscovery {
    pub fn new(
        source: Arc<dyn MatchSource>,
        scheduler: Scheduler,
        store: Arc<TimelineStore>,
        health: Arc<HealthState>,
        discovery_time: NaiveTime,
    ) -> Self {
        Self {
            source,
            scheduler,
            store,
            health,
            discovery_time,
        }
    }

    /// Runs now if today's slot has passed, then at every following slot.
    pub async fn run(self) {
        if should_run_at_start(Utc::now(), self.discovery_time) {
            self.run_logged().await;
        }

        loop {
            let next = next_run_after(Utc::now(), self.discovery_time);
            info!(next_run = %next, "[DISCOVERY] Next run scheduled");
            tokio::time::sleep(until(next)).await;
            self.run_logged().await;
        }
    }

    async fn run_logged(&self) {
        // A failed run is not retried until the next slot.
        if let Err(e) = self.discover_once().await {
            error!("[DISCOVERY] Fixture discovery failed: {e}");
        }
    }

    /// Fetch today's fixtures and start a timeline for each followed match
    /// not seen before. Safe to call repeatedly.
    pub async fn discover_once(&self) -> Result<DiscoveryStats> {
        let today = Utc::now().date_naive();
        let mut stats = DiscoveryStats {
            pruned: self.store.prune_terminal_before(today),
            ..DiscoveryStats::default()
        };

        let fixtures = self.source.fetch_fixtures(today, today).await?;
        stats.fixtures = fixtures.len();

        for snapshot in fixtures {
            if snapshot.followed == FollowedSide::None {
                stats.not_followed += 1;
                continue;
            }
            if snapshot.status == MatchStatus::Finished {
                debug!(match_id = snapshot.id, "[DISCOVERY] Skipping finished match");
                stats.already_finished += 1;
                continue;
            }
            if let Some(phase) = self.store.phase(snapshot.id) {
                debug!(match_id = snapshot.id, %phase, "[DISCOVERY] Already tracked");
                stats.already_known += 1;
                continue;
            }
            if self.scheduler.start_timeline(snapshot).is_some() {
                stats.started += 1;
            } else {
                stats.already_known += 1;
            }
        }

        let now_secs = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        self.health.set_last_discovery_at_secs(now_secs);

        info!(
            fixtures = stats.fixtures,
            started = stats.started,
            already_known = stats.already_known,
            pruned = stats.pruned,
            tracked = self.store.timeline_count(),
            "[DISCOVERY] {today}: {} fixtures, +{} timelines, {} already known, {} not followed, {} finished, {} pruned",
            stats.fixtures,
            stats.started,
            stats.already_known,
            stats.not_followed,
            stats.already_finished,
            stats.pruned,
        );

        Ok(stats)
    }
}

/// Whether today's slot `at` has already come, so a fresh start runs at once.
pub fn should_run_at_start(now: DateTime<Utc>, at: NaiveTime) -> bool {
    now.time() >= at
}

/// The first `at` strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
