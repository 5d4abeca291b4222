//! Telegram Bot API delivery.
//!
//! [`TelegramNotifier`] posts an HTML-formatted message to the `sendMessage`
//! method of a bot. Only the response status is inspected. There is no retry:
//! a failed send is logged and reported as [`NotifyOutcome::Failed`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use envmon_core::alert::ThresholdAlert;

use super::{AlertNotifier, NotifyOutcome};

/// Default Bot API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// HTTP request timeout for a single send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Bot credentials and destination chat. Either may be unset.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        Self {
            bot_token,
            chat_id,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// `(token, chat_id)` when both are set and non-empty.
    fn channel(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat = self.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat))
    }

    pub fn is_configured(&self) -> bool {
        self.channel().is_some()
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for Telegram delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// Token or chat id missing.
    #[error("Telegram channel not configured")]
    NotConfigured,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Bot API returned a non-2xx status code.
    #[error("Telegram returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// TelegramNotifier
// ---------------------------------------------------------------------------

/// Delivers threshold alerts to a Telegram chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    /// Create a notifier with a pre-configured HTTP client.
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Send one alert.
    pub async fn send(&self, alert: &ThresholdAlert) -> Result<(), TelegramError> {
        let (token, chat_id) = self.config.channel().ok_or(TelegramError::NotConfigured)?;
        let url = format!("{}/bot{token}/sendMessage", self.config.api_base);
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": format_message(alert),
            "parse_mode": "HTML",
        });

        // The request URL embeds the bot token; strip it from any error.
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        if !response.status().is_success() {
            return Err(TelegramError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertNotifier for TelegramNotifier {
    async fn notify(&self, alert: &ThresholdAlert) -> NotifyOutcome {
        match self.send(alert).await {
            Ok(()) => {
                tracing::info!(
                    device_id = %alert.device_id,
                    alert_type = %alert.alert_type,
                    "Alert sent to Telegram"
                );
                NotifyOutcome::Sent
            }
            Err(TelegramError::NotConfigured) => {
                tracing::debug!(
                    device_id = %alert.device_id,
                    alert_type = %alert.alert_type,
                    "Telegram not configured, skipping notification"
                );
                NotifyOutcome::NoChannelConfigured
            }
            Err(e) => {
                tracing::warn!(
                    device_id = %alert.device_id,
                    alert_type = %alert.alert_type,
                    error = %e,
                    "Telegram delivery failed"
                );
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Render the alert as Telegram HTML.
pub fn format_message(alert: &ThresholdAlert) -> String {
    let unit = alert.alert_type.unit();
    format!(
        "\u{1f6a8} <b>{} high</b>\n\n\
         <i>Device:</i> <code>{}</code>\n\
         <i>Value:</i> {}{unit} (threshold {}{unit})\n\
         <i>Alert:</i> {}\n\
         <i>Time:</i> {}",
        alert.alert_type.metric_label(),
        html_escape(&alert.device_id),
        alert.observed_value,
        alert.threshold_value,
        alert.alert_type,
        alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
