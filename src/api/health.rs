//! Shared health counters for the /health endpoint.
//! Updated by the scheduler and the discovery job.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters. Written by timelines, read by the API.
#[derive(Default)]
pub struct HealthState {
    pub timelines_started: AtomicU64,
    pub timelines_settled: AtomicU64,
    pub timelines_abandoned: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notifications_failed: AtomicU64,
    /// Unix seconds of the last successful discovery run (0 = none).
    pub last_discovery_at_secs: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_started(&self) {
        self.timelines_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_settled(&self) {
        self.timelines_settled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_abandoned(&self) {
        self.timelines_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send(&self, ok: bool) {
        if ok {
            self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.notifications_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_last_discovery_at_secs(&self, secs: u64) {
        self.last_discovery_at_secs.store(secs, Ordering::Relaxed);
    }

    pub fn started(&self) -> u64 {
        self.timelines_started.load(Ordering::Relaxed)
    }

    pub fn settled(&self) -> u64 {
        self.timelines_settled.load(Ordering::Relaxed)
    }

    pub fn abandoned(&self) -> u64 {
        self.timelines_abandoned.load(Ordering::Relaxed)
    }

    pub fn sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.notifications_failed.load(Ordering::Relaxed)
    }

    pub fn last_discovery_at_secs(&self) -> u64 {
        self.last_discovery_at_secs.load(Ordering::Relaxed)
    }
}
