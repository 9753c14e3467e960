use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::health::HealthState;
use crate::api::latency::{LatencyReport, LatencyStats};
use crate::error::AppError;
use crate::state::{TimelineStore, TimelineSummary};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<TimelineStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/timelines", get(get_timelines))
        .route("/timelines/:id", get(get_timeline))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timelines_tracked: usize,
    pub timelines_live: usize,
    pub timelines_started: u64,
    pub timelines_settled: u64,
    pub timelines_abandoned: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub last_discovery_at: Option<u64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last = state.health.last_discovery_at_secs();
    Json(HealthResponse {
        status: "ok",
        timelines_tracked: state.store.timeline_count(),
        timelines_live: state.store.live_count(),
        timelines_started: state.health.started(),
        timelines_settled: state.health.settled(),
        timelines_abandoned: state.health.abandoned(),
        notifications_sent: state.health.sent(),
        notifications_failed: state.health.failed(),
        last_discovery_at: (last > 0).then_some(last),
    })
}

async fn get_timelines(State(state): State<ApiState>) -> Json<Vec<TimelineSummary>> {
    Json(state.store.summaries())
}

async fn get_timeline(
    State(state): State<ApiState>,
    Path(match_id): Path<u64>,
) -> Result<Json<TimelineSummary>, AppError> {
    state
        .store
        .summary(match_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no timeline for match {match_id}")))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyReport> {
    Json(state.latency.report())
}
