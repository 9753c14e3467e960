use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::detector::ScoreTrend;
use crate::state::TimelinePhase;
use crate::types::MatchSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Poll,
    PreMatchNotice,
    PostKickoffNotice,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobKind::Poll => "poll",
            JobKind::PreMatchNotice => "pre_match_notice",
            JobKind::PostKickoffNotice => "post_kickoff_notice",
        };
        write!(f, "{s}")
    }
}

/// What a poll job carries forward to its successor.
#[derive(Debug, Clone)]
pub struct PollContext {
    /// Last snapshot that was fetched successfully.
    pub last: MatchSnapshot,
    pub trend: ScoreTrend,
    /// Consecutive failed fetches since `last`.
    pub failures: u32,
    /// Past this instant an unfinished match is given up on.
    pub give_up_at: Instant,
}

impl PollContext {
    pub fn new(last: MatchSnapshot, trend: ScoreTrend, give_up_at: Instant) -> Self {
        Self {
            last,
            trend,
            failures: 0,
            give_up_at,
        }
    }

    /// The successor after a good fetch: failures reset, cutoff kept.
    pub fn advance(self, last: MatchSnapshot, trend: ScoreTrend) -> Self {
        Self {
            last,
            trend,
            failures: 0,
            ..self
        }
    }

    pub fn past_cutoff(&self) -> bool {
        Instant::now() >= self.give_up_at
    }
}

/// One pending unit of work for a timeline.
///
/// Jobs are moved, never shared: the chain that owns a poll job hands its
/// context to the next job by value. The phase receiver is the cancellation
/// signal; once the timeline is terminal the job does nothing.
pub struct ScheduledJob<C> {
    pub match_id: u64,
    pub kind: JobKind,
    pub fire_at: DateTime<Utc>,
    pub context: C,
    phase: watch::Receiver<TimelinePhase>,
}

pub type PollJob = ScheduledJob<PollContext>;
pub type NoticeJob = ScheduledJob<MatchSnapshot>;

impl<C> ScheduledJob<C> {
    pub fn new(
        match_id: u64,
        kind: JobKind,
        fire_at: DateTime<Utc>,
        context: C,
        phase: watch::Receiver<TimelinePhase>,
    ) -> Self {
        Self {
            match_id,
            kind,
            fire_at,
            context,
            phase,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase.borrow().is_terminal()
    }

    /// Sleep until `fire_at`, waking early if the timeline turns terminal.
    /// Returns false if the job was cancelled and must not run.
    pub async fn wait_until_due(&mut self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let delay = until(self.fire_at);
        let cancelled = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.phase.wait_for(|p| p.is_terminal()) => true,
        };
        !cancelled && !self.is_cancelled()
    }

    /// The same job, due again `after` from now, carrying `context`.
    pub fn reschedule(self, after: Duration, context: C) -> Self {
        let after = chrono::Duration::from_std(after).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            fire_at: Utc::now() + after,
            context,
            ..self
        }
    }
}

/// Time left until `at`, zero if it has passed.
pub fn until(at: DateTime<Utc>) -> Duration {
    (at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}
