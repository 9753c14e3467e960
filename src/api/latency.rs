//! Data-source fetch latency, split by outcome.
//!
//! Successful fetches and failed ones are kept in separate histograms so a
//! provider that fails fast does not drag the healthy percentiles down.
//! Timeouts are only counted: their latency is the configured timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::error::FetchError;

/// 1ms to 10 minutes, 3 significant figures.
const LOWEST_MS: u64 = 1;
const HIGHEST_MS: u64 = 600_000;
const SIGFIG: u8 = 3;

pub struct LatencyStats {
    ok: Mutex<Histogram<u64>>,
    failed: Mutex<Histogram<u64>>,
    timeouts: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Percentiles {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencyReport {
    pub ok: Percentiles,
    pub failed: Percentiles,
    pub timeouts: u64,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            ok: Mutex::new(empty_histogram()),
            failed: Mutex::new(empty_histogram()),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Record one `fetch_match` call.
    pub fn record<T>(&self, elapsed: Duration, result: &Result<T, FetchError>) {
        let target = match result {
            Ok(_) => &self.ok,
            Err(FetchError::Timeout) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(_) => &self.failed,
        };
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(HIGHEST_MS);
        if let Ok(mut h) = target.lock() {
            h.saturating_record(ms.clamp(LOWEST_MS, HIGHEST_MS));
        }
    }

    pub fn report(&self) -> LatencyReport {
        LatencyReport {
            ok: percentiles(&self.ok),
            failed: percentiles(&self.failed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_histogram() -> Histogram<u64> {
    Histogram::new_with_bounds(LOWEST_MS, HIGHEST_MS, SIGFIG).expect("valid histogram bounds")
}

fn percentiles(histogram: &Mutex<Histogram<u64>>) -> Percentiles {
    let Ok(h) = histogram.lock() else {
        return Percentiles::default();
    };
    if h.is_empty() {
        return Percentiles::default();
    }
    Percentiles {
        samples: h.len(),
        p50_ms: Some(h.value_at_quantile(0.5)),
        p95_ms: Some(h.value_at_quantile(0.95)),
        p99_ms: Some(h.value_at_quantile(0.99)),
    }
}
