//! Outbound alert delivery.
//!
//! Delivery is best-effort: implementations report a [`NotifyOutcome`] and
//! never return an error to the ingestion pipeline.

pub mod telegram;

use async_trait::async_trait;
use envmon_core::alert::ThresholdAlert;

/// Result of one notification attempt. None of these abort ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The channel accepted the message.
    Sent,
    /// No token or destination is configured; nothing was sent.
    NoChannelConfigured,
    /// The request failed or the endpoint rejected it.
    Failed(String),
    /// The attempt did not finish within the caller's deadline.
    TimedOut,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::NoChannelConfigured => "no_channel_configured",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Sends threshold alerts to an external channel.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, alert: &ThresholdAlert) -> NotifyOutcome;
}
