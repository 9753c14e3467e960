use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;

use crate::error::{AppError, Result};
use crate::types::FollowedTeams;

pub const FOOTBALL_DATA_URL: &str = "https://api.football-data.org/v4";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Teams watched when FOLLOWED_TEAMS is not set.
pub const DEFAULT_FOLLOWED_TEAMS: &str = "Liverpool FC,Chelsea FC,Tottenham Hotspur FC";

/// Destination used by the dry-run notifier when NOTIFY_CHAT_ID is unset.
pub const DEFAULT_DESTINATION: &str = "log";

/// Pre-match notice fires this long before kickoff (plus jitter).
pub const KICKOFF_NOTICE_LEAD_SECS: u64 = 900;

/// Upper bound of the random delay added to one-shot notices.
pub const NOTICE_JITTER_SECS: u64 = 120;

/// Post-kickoff notice fires this long after kickoff.
pub const POST_KICKOFF_OFFSET_SECS: u64 = 1200;

/// Delay between successful polls of a live match.
pub const POLL_INTERVAL_SECS: u64 = 60;

/// Fixed delay before retrying a failed fetch.
pub const RETRY_BACKOFF_SECS: u64 = 30;

/// Consecutive fetch failures tolerated before a timeline is abandoned.
pub const MAX_FETCH_RETRIES: u32 = 5;

/// A timeline still open this long after kickoff is abandoned
/// (postponed, suspended or never reported finished).
pub const TIMELINE_CUTOFF_SECS: u64 = 4 * 60 * 60;

/// Per-request timeout for the data source.
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Daily discovery wall-clock time (UTC).
pub const DISCOVERY_TIME: &str = "08:00";

#[derive(Debug, Clone)]
pub struct Config {
    pub football_data_url: String,
    pub football_data_token: String,
    /// Restrict fixture discovery to one competition (COMPETITION_ID, e.g. 2021).
    pub competition_id: Option<u32>,
    pub followed_teams: FollowedTeams,
    /// Telegram bot token; when absent notifications are only logged.
    pub telegram_bot_token: Option<String>,
    pub notify_chat_id: String,
    pub kickoff_notice_lead_secs: u64,
    pub notice_jitter_secs: u64,
    pub post_kickoff_offset_secs: u64,
    pub poll_interval_secs: u64,
    pub retry_backoff_secs: u64,
    pub max_fetch_retries: u32,
    pub fetch_timeout_secs: u64,
    pub timeline_cutoff_secs: u64,
    pub discovery_time: NaiveTime,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let football_data_token = std::env::var("FOOTBALL_DATA_TOKEN")
            .map_err(|_| AppError::Config("FOOTBALL_DATA_TOKEN must be set".to_string()))?;

        let discovery_time_raw =
            std::env::var("DISCOVERY_TIME").unwrap_or_else(|_| DISCOVERY_TIME.to_string());
        let discovery_time = NaiveTime::parse_from_str(discovery_time_raw.trim(), "%H:%M")
            .map_err(|_| AppError::Config("DISCOVERY_TIME must be HH:MM".to_string()))?;

        let competition_id = match std::env::var("COMPETITION_ID") {
            Ok(v) if !v.trim().is_empty() => Some(v.trim().parse::<u32>().map_err(|_| {
                AppError::Config("COMPETITION_ID must be a numeric competition id".to_string())
            })?),
            _ => None,
        };

        Ok(Self {
            football_data_url: std::env::var("FOOTBALL_DATA_URL")
                .unwrap_or_else(|_| FOOTBALL_DATA_URL.to_string()),
            football_data_token,
            competition_id,
            followed_teams: FollowedTeams::from_csv(
                &std::env::var("FOLLOWED_TEAMS")
                    .unwrap_or_else(|_| DEFAULT_FOLLOWED_TEAMS.to_string()),
            ),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            notify_chat_id: std::env::var("NOTIFY_CHAT_ID")
                .unwrap_or_else(|_| DEFAULT_DESTINATION.to_string()),
            kickoff_notice_lead_secs: env_or("KICKOFF_NOTICE_LEAD_SECS", KICKOFF_NOTICE_LEAD_SECS),
            notice_jitter_secs: env_or("NOTICE_JITTER_SECS", NOTICE_JITTER_SECS),
            post_kickoff_offset_secs: env_or("POST_KICKOFF_OFFSET_SECS", POST_KICKOFF_OFFSET_SECS),
            poll_interval_secs: env_secs("POLL_INTERVAL_SECS", POLL_INTERVAL_SECS),
            retry_backoff_secs: env_secs("RETRY_BACKOFF_SECS", RETRY_BACKOFF_SECS),
            max_fetch_retries: env_or("MAX_FETCH_RETRIES", MAX_FETCH_RETRIES).max(1),
            fetch_timeout_secs: env_secs("FETCH_TIMEOUT_SECS", FETCH_TIMEOUT_SECS),
            timeline_cutoff_secs: env_secs("TIMELINE_CUTOFF_SECS", TIMELINE_CUTOFF_SECS),
            discovery_time,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }

    /// Tunables handed to the polling scheduler.
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            destination: self.notify_chat_id.clone(),
            kickoff_notice_lead: Duration::from_secs(self.kickoff_notice_lead_secs),
            notice_jitter: Duration::from_secs(self.notice_jitter_secs),
            post_kickoff_offset: Duration::from_secs(self.post_kickoff_offset_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            max_fetch_retries: self.max_fetch_retries,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            timeline_cutoff: Duration::from_secs(self.timeline_cutoff_secs),
        }
    }
}

/// Parse an env var, falling back to `default` when unset or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Like [`env_or`] for delays; zero is raised to one second so no loop spins.
fn env_secs(key: &str, default: u64) -> u64 {
    env_or(key, default).max(1)
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Where rendered notifications are sent (e.g. a Telegram chat id).
    pub destination: String,
    pub kickoff_notice_lead: Duration,
    pub notice_jitter: Duration,
    pub post_kickoff_offset: Duration,
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
    pub max_fetch_retries: u32,
    pub fetch_timeout: Duration,
    /// How long after kickoff a timeline may stay open.
    pub timeline_cutoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            destination: DEFAULT_DESTINATION.to_string(),
            kickoff_notice_lead: Duration::from_secs(KICKOFF_NOTICE_LEAD_SECS),
            notice_jitter: Duration::from_secs(NOTICE_JITTER_SECS),
            post_kickoff_offset: Duration::from_secs(POST_KICKOFF_OFFSET_SECS),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            retry_backoff: Duration::from_secs(RETRY_BACKOFF_SECS),
            max_fetch_retries: MAX_FETCH_RETRIES,
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            timeline_cutoff: Duration::from_secs(TIMELINE_CUTOFF_SECS),
        }
    }
}
