//! Notification sinks. Delivery is fire-and-forget: callers log failures and
//! move on, nothing here retries.

pub mod render;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::TELEGRAM_API_URL;
use crate::error::NotifyError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError>;
}

/// Posts messages through the Telegram Bot API.
pub struct TelegramNotifier {
    http: Client,
    bot_token: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(bot_token: String) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { http, bot_token })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, self.bot_token);
        // No parse_mode: text goes out unescaped.
        let request = SendMessageRequest {
            chat_id: destination,
            text,
        };

        let resp = self.http.post(&url).json(&request).send().await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Unavailable(format!(
                "Telegram returned HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// Dry-run sink used when no bot token is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        info!(destination, "[NOTIFY] {text}");
        Ok(())
    }
}
