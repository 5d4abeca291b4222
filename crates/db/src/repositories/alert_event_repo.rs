//! Repository for the `alert_events` table.

use envmon_core::alert::AlertType;
use sqlx::PgPool;

use crate::models::alert_event::{AlertEvent, CreateAlertEvent};

const COLUMNS: &str = "id, device_id, alert_type, temperature, humidity, created_at";

/// Provides query operations for recorded alerts.
pub struct AlertEventRepo;

impl AlertEventRepo {
    /// Record an alert.
    pub async fn insert(
        pool: &PgPool,
        event: &CreateAlertEvent,
    ) -> Result<AlertEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_events (device_id, alert_type, temperature, humidity, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertEvent>(&query)
            .bind(&event.device_id)
            .bind(event.alert_type.as_str())
            .bind(event.temperature)
            .bind(event.humidity)
            .bind(event.created_at)
            .fetch_one(pool)
            .await
    }

    /// Most recent alert of the given type for a device, if any.
    ///
    /// Served by `idx_alert_events_device_type_created`.
    pub async fn find_latest(
        pool: &PgPool,
        device_id: &str,
        alert_type: AlertType,
    ) -> Result<Option<AlertEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_events \
             WHERE device_id = $1 AND alert_type = $2 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, AlertEvent>(&query)
            .bind(device_id)
            .bind(alert_type.as_str())
            .fetch_optional(pool)
            .await
    }
}
