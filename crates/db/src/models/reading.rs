//! Sensor reading model (`sensor_data`, append-only).

use envmon_core::ingest::ReadingSubmission;
use envmon_core::thresholds::ReadingMetrics;
use envmon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored reading. `id` and `created_at` are assigned by the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: DbId,
    pub device_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub created_at: Timestamp,
}

impl Reading {
    pub fn metrics(&self) -> ReadingMetrics {
        ReadingMetrics {
            temperature: self.temperature,
            humidity: self.humidity,
        }
    }
}

/// DTO for inserting a new reading.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateReading {
    pub device_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl From<&ReadingSubmission> for CreateReading {
    fn from(sub: &ReadingSubmission) -> Self {
        Self {
            device_id: sub.device_id().to_string(),
            temperature: sub.temperature(),
            humidity: sub.humidity(),
        }
    }
}
