use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::types::MatchStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) | AppError::Fetch(FetchError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Fetch(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Failure reported by a match data source. Every variant is treated the same
/// way by the scheduler: a transient failure that is retried with backoff.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("match {0} not found")]
    NotFound(u64),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider request timed out")]
    Timeout,

    /// A response arrived but a required field was missing or mistyped.
    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Unavailable(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification sink unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Unavailable(e.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("gave up on match {match_id} after {attempts} consecutive fetch failures (last: {last})")]
    RetriesExhausted {
        match_id: u64,
        attempts: u32,
        last: FetchError,
    },

    /// Still not finished long after kickoff (postponed, suspended, stale feed).
    #[error("gave up on match {match_id}: still {status} past the timeline cutoff")]
    PastCutoff { match_id: u64, status: MatchStatus },
}
