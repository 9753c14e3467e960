use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;

use crate::types::MatchSnapshot;

// ---------------------------------------------------------------------------
// TimelinePhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelinePhase {
    /// Discovered, not yet seen in play.
    Upcoming,
    /// In play or at half time.
    Live,
    /// Finished. Terminal.
    Settled,
    /// Gave up after repeated fetch failures. Terminal.
    Abandoned,
}

impl TimelinePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TimelinePhase::Settled | TimelinePhase::Abandoned)
    }
}

impl std::fmt::Display for TimelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimelinePhase::Upcoming => "upcoming",
            TimelinePhase::Live => "live",
            TimelinePhase::Settled => "settled",
            TimelinePhase::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// TimelineStore
// ---------------------------------------------------------------------------

/// Registry entry. Only the timeline's own tasks publish phase changes; the
/// store hands out receivers so pending jobs can observe cancellation.
struct TimelineEntry {
    home_team: String,
    away_team: String,
    kickoff: DateTime<Utc>,
    phase_tx: watch::Sender<TimelinePhase>,
}

impl TimelineEntry {
    fn summary(&self, match_id: u64) -> TimelineSummary {
        TimelineSummary {
            match_id,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            kickoff: self.kickoff,
            phase: *self.phase_tx.borrow(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineSummary {
    pub match_id: u64,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub phase: TimelinePhase,
}

/// match_id → timeline. Entries outlive their timeline so a settled match is
/// never picked up again by a same-day re-discovery.
pub struct TimelineStore {
    timelines: DashMap<u64, TimelineEntry>,
}

impl TimelineStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new timeline in the `Upcoming` phase.
    ///
    /// Returns `None` if the match id is already registered, live or not.
    pub fn try_register(&self, snapshot: &MatchSnapshot) -> Option<watch::Receiver<TimelinePhase>> {
        match self.timelines.entry(snapshot.id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let (phase_tx, phase_rx) = watch::channel(TimelinePhase::Upcoming);
                slot.insert(TimelineEntry {
                    home_team: snapshot.home_team.clone(),
                    away_team: snapshot.away_team.clone(),
                    kickoff: snapshot.kickoff,
                    phase_tx,
                });
                Some(phase_rx)
            }
        }
    }

    /// Publish a phase change. Terminal phases are final; later updates are ignored.
    pub fn set_phase(&self, match_id: u64, phase: TimelinePhase) {
        if let Some(entry) = self.timelines.get(&match_id) {
            entry.phase_tx.send_if_modified(|current| {
                if current.is_terminal() || *current == phase {
                    return false;
                }
                *current = phase;
                true
            });
        }
    }

    pub fn phase(&self, match_id: u64) -> Option<TimelinePhase> {
        self.timelines.get(&match_id).map(|e| *e.phase_tx.borrow())
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    /// Timelines that have not reached a terminal phase.
    pub fn live_count(&self) -> usize {
        self.timelines
            .iter()
            .filter(|e| !e.phase_tx.borrow().is_terminal())
            .count()
    }

    /// Drop terminal timelines whose kickoff date is before `day`.
    /// Returns how many were removed.
    pub fn prune_terminal_before(&self, day: NaiveDate) -> usize {
        let before = self.timelines.len();
        self.timelines.retain(|_, e| {
            !(e.phase_tx.borrow().is_terminal() && e.kickoff.date_naive() < day)
        });
        before - self.timelines.len()
    }

    pub fn summary(&self, match_id: u64) -> Option<TimelineSummary> {
        self.timelines.get(&match_id).map(|e| e.summary(match_id))
    }

    /// Sorted by kickoff.
    pub fn summaries(&self) -> Vec<TimelineSummary> {
        let mut out: Vec<TimelineSummary> = self
            .timelines
            .iter()
            .map(|e| e.summary(*e.key()))
            .collect();
        out.sort_by_key(|s| (s.kickoff, s.match_id));
        out
    }
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self {
            timelines: DashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
