mod api;
mod config;
mod detector;
mod discovery;
mod error;
mod fetcher;
mod notify;
mod scheduler;
mod state;
mod types;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::api::{HealthState, LatencyStats};
use crate::config::Config;
use crate::discovery::DailyDiscovery;
use crate::error::{AppError, Result};
use crate::fetcher::{FootballDataClient, MatchSource};
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::scheduler::Scheduler;
use crate::state::TimelineStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Collaborators ---
    let source: Arc<dyn MatchSource> = Arc::new(FootballDataClient::new(&cfg)?);

    let notifier: Arc<dyn Notifier> = match &cfg.telegram_bot_token {
        Some(token) => {
            let telegram = TelegramNotifier::new(token.clone())
                .map_err(|e| AppError::Config(format!("telegram client: {e}")))?;
            info!("Notifications go to Telegram chat {}", cfg.notify_chat_id);
            Arc::new(telegram)
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    if cfg.followed_teams.is_empty() {
        warn!("FOLLOWED_TEAMS is empty, no fixture will ever be watched");
    }
    info!(
        followed = cfg.followed_teams.len(),
        competition = ?cfg.competition_id,
        "Watching {} followed teams, discovery daily at {} UTC",
        cfg.followed_teams.len(),
        cfg.discovery_time.format("%H:%M"),
    );

    // --- Shared state ---
    let store = TimelineStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    let scheduler = Scheduler::new(
        cfg.scheduler(),
        Arc::clone(&source),
        notifier,
        Arc::clone(&store),
        Arc::clone(&health),
        Arc::clone(&latency),
    );

    // Daily discovery (runs now if today's slot already passed)
    let discovery = DailyDiscovery::new(
        source,
        scheduler,
        Arc::clone(&store),
        Arc::clone(&health),
        cfg.discovery_time,
    );
    tokio::spawn(async move { discovery.run().await });

    // HTTP API server
    let api_state = ApiState {
        store,
        health,
        latency,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
