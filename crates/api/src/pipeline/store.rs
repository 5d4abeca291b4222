//! Persistence seam used by the ingestion pipeline and read endpoints.

use async_trait::async_trait;
use envmon_core::alert::AlertType;
use envmon_core::types::Timestamp;
use envmon_db::models::alert_event::CreateAlertEvent;
use envmon_db::models::reading::{CreateReading, Reading};
use envmon_db::repositories::{AlertEventRepo, ReadingRepo};
use envmon_db::DbPool;

/// Storage operations the API needs: append readings, read recent history,
/// and consult or extend the alert log.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Append a reading; the store assigns `id` and `created_at`.
    async fn insert_reading(&self, reading: &CreateReading) -> Result<Reading, sqlx::Error>;

    /// Up to `limit` readings for a device, newest first.
    async fn recent_readings(&self, device_id: &str, limit: i64)
        -> Result<Vec<Reading>, sqlx::Error>;

    /// Timestamp of the latest recorded alert for the pair, if any.
    async fn latest_alert(
        &self,
        device_id: &str,
        alert_type: AlertType,
    ) -> Result<Option<Timestamp>, sqlx::Error>;

    /// Append an alert to the log.
    async fn record_alert(&self, event: &CreateAlertEvent) -> Result<(), sqlx::Error>;

    /// Confirm the backing store is reachable.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

/// PostgreSQL-backed store delegating to the repositories.
#[derive(Debug, Clone)]
pub struct PgTelemetryStore {
    pool: DbPool,
}

impl PgTelemetryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TelemetryStore for PgTelemetryStore {
    async fn insert_reading(&self, reading: &CreateReading) -> Result<Reading, sqlx::Error> {
        ReadingRepo::insert(&self.pool, reading).await
    }

    async fn recent_readings(
        &self,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<Reading>, sqlx::Error> {
        ReadingRepo::list_recent(&self.pool, device_id, limit).await
    }

    async fn latest_alert(
        &self,
        device_id: &str,
        alert_type: AlertType,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let latest = AlertEventRepo::find_latest(&self.pool, device_id, alert_type).await?;
        Ok(latest.map(|event| event.created_at))
    }

    async fn record_alert(&self, event: &CreateAlertEvent) -> Result<(), sqlx::Error> {
        let stored = AlertEventRepo::insert(&self.pool, event).await?;
        tracing::debug!(alert_event_id = stored.id, "Alert recorded");
        Ok(())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        envmon_db::health_check(&self.pool).await
    }
}
