//! Reading ingestion: persist, publish, evaluate thresholds, and dispatch
//! debounced alerts.
//!
//! Per accepted submission:
//!
//! 1. Store the reading. A storage failure aborts with no alerting.
//! 2. Publish the stored row to the [`ChangeFeed`].
//! 3. Evaluate thresholds against the stored values.
//! 4. For each breach, under the [`CooldownGate`] permit for its pair, look up
//!    the last alert and record a new one when the cooldown has elapsed.
//!    A failed lookup is treated as "no prior alert".
//! 5. Notify all recorded breaches concurrently, each bounded by the notify
//!    timeout. Notification failures never fail the request.

pub mod store;

use std::sync::Arc;
use std::time::Duration;

use envmon_core::alert::{AlertType, Breach, ThresholdAlert};
use envmon_core::cooldown::{check_cooldown, CooldownGate, Eligibility};
use envmon_core::ingest::ReadingSubmission;
use envmon_core::thresholds::{evaluate, ThresholdConfig};
use envmon_db::models::alert_event::CreateAlertEvent;
use envmon_db::models::reading::{CreateReading, Reading};
use envmon_events::{AlertNotifier, ChangeFeed, NotifyOutcome};
use futures::future::join_all;

use self::store::TelemetryStore;

/// What happened to one breach of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    /// An alert for the same pair is still inside its cooldown window.
    Suppressed {
        alert_type: AlertType,
        remaining: chrono::Duration,
    },
    /// The breach was eligible and a notification was attempted.
    Dispatched {
        alert_type: AlertType,
        /// Whether the alert log accepted the record.
        recorded: bool,
        notify: NotifyOutcome,
    },
}

impl AlertDecision {
    pub fn alert_type(&self) -> AlertType {
        match self {
            Self::Suppressed { alert_type, .. } | Self::Dispatched { alert_type, .. } => {
                *alert_type
            }
        }
    }
}

/// Result of ingesting one submission.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// The stored row.
    pub reading: Reading,
    /// One entry per threshold breach, temperature first.
    pub decisions: Vec<AlertDecision>,
}

/// Orchestrates storage, live fan-out, and alerting for submissions.
pub struct IngestPipeline {
    store: Arc<dyn TelemetryStore>,
    notifier: Arc<dyn AlertNotifier>,
    feed: Arc<ChangeFeed>,
    thresholds: ThresholdConfig,
    gate: CooldownGate,
    notify_timeout: Duration,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        notifier: Arc<dyn AlertNotifier>,
        feed: Arc<ChangeFeed>,
        thresholds: ThresholdConfig,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            feed,
            thresholds,
            gate: CooldownGate::new(),
            notify_timeout,
        }
    }

    /// Ingest a validated submission.
    pub async fn ingest(
        &self,
        submission: &ReadingSubmission,
    ) -> Result<IngestReport, sqlx::Error> {
        let reading = self
            .store
            .insert_reading(&CreateReading::from(submission))
            .await
            .map_err(|e| {
                tracing::error!(
                    device_id = %submission.device_id(),
                    error = %e,
                    "Failed to store reading",
                );
                e
            })?;
        tracing::info!(
            reading_id = reading.id,
            device_id = %reading.device_id,
            temperature = ?reading.temperature,
            humidity = ?reading.humidity,
            "Reading stored",
        );

        self.feed.publish(reading.clone());

        let breaches = evaluate(reading.metrics(), &self.thresholds);
        let mut decisions = Vec::with_capacity(breaches.len());
        let mut to_notify = Vec::new();

        for breach in &breaches {
            match self.debounce(&reading, breach).await {
                Ok(recorded) => to_notify.push((*breach, recorded)),
                Err(remaining) => {
                    tracing::debug!(
                        device_id = %reading.device_id,
                        alert_type = %breach.alert_type,
                        remaining_secs = remaining.num_seconds(),
                        "Alert suppressed by cooldown",
                    );
                    decisions.push(AlertDecision::Suppressed {
                        alert_type: breach.alert_type,
                        remaining,
                    });
                }
            }
        }

        let outcomes = join_all(
            to_notify
                .iter()
                .map(|(breach, _)| self.notify(&reading, breach)),
        )
        .await;

        for ((breach, recorded), notify) in to_notify.into_iter().zip(outcomes) {
            decisions.push(AlertDecision::Dispatched {
                alert_type: breach.alert_type,
                recorded,
                notify,
            });
        }
        decisions.sort_by_key(|d| d.alert_type() != AlertType::TemperatureHigh);

        Ok(IngestReport { reading, decisions })
    }

    /// Decide and record one breach while holding its pair's permit.
    ///
    /// Returns `Ok(recorded)` when eligible, `Err(remaining)` when suppressed.
    async fn debounce(&self, reading: &Reading, breach: &Breach) -> Result<bool, chrono::Duration> {
        let _permit = self
            .gate
            .acquire(&reading.device_id, breach.alert_type)
            .await;

        let last = match self
            .store
            .latest_alert(&reading.device_id, breach.alert_type)
            .await
        {
            Ok(last) => last,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    device_id = %reading.device_id,
                    alert_type = %breach.alert_type,
                    "Cooldown lookup failed, treating as no prior alert",
                );
                None
            }
        };

        if let Eligibility::Suppressed { remaining } =
            check_cooldown(last, reading.created_at, self.thresholds.cooldown())
        {
            return Err(remaining);
        }

        let event = CreateAlertEvent {
            device_id: reading.device_id.clone(),
            alert_type: breach.alert_type,
            temperature: reading.temperature,
            humidity: reading.humidity,
            created_at: reading.created_at,
        };
        match self.store.record_alert(&event).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    device_id = %reading.device_id,
                    alert_type = %breach.alert_type,
                    "Failed to record alert",
                );
                Ok(false)
            }
        }
    }

    async fn notify(&self, reading: &Reading, breach: &Breach) -> NotifyOutcome {
        let alert = ThresholdAlert::from_breach(&reading.device_id, breach, reading.created_at);
        match tokio::time::timeout(self.notify_timeout, self.notifier.notify(&alert)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    device_id = %alert.device_id,
                    alert_type = %alert.alert_type,
                    timeout_secs = self.notify_timeout.as_secs_f64(),
                    "Alert notification timed out",
                );
                NotifyOutcome::TimedOut
            }
        }
    }
}
