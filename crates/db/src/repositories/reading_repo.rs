//! Repository for the `sensor_data` table (append-only time-series).

use sqlx::PgPool;

use crate::models::reading::{CreateReading, Reading};

/// Column list for `sensor_data` SELECT / RETURNING clauses.
const COLUMNS: &str = "id, device_id, temperature, humidity, created_at";

/// Provides query operations for sensor readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Insert one reading and return the stored row.
    pub async fn insert(pool: &PgPool, reading: &CreateReading) -> Result<Reading, sqlx::Error> {
        let query = format!(
            "INSERT INTO sensor_data (device_id, temperature, humidity) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reading>(&query)
            .bind(&reading.device_id)
            .bind(reading.temperature)
            .bind(reading.humidity)
            .fetch_one(pool)
            .await
    }

    /// The `limit` most recent readings for a device, newest first.
    pub async fn list_recent(
        pool: &PgPool,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<Reading>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sensor_data \
             WHERE device_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, Reading>(&query)
            .bind(device_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
