//! Alert history model (`alert_events`).
//!
//! Rows are written once per eligible breach and read back only to decide
//! whether the cooldown window for a (device, alert type) has elapsed.

use envmon_core::alert::{AlertType, UnknownAlertType};
use envmon_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AlertEvent {
    pub id: DbId,
    pub device_id: String,
    /// snake_case [`AlertType`] name.
    pub alert_type: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub created_at: Timestamp,
}

impl AlertEvent {
    pub fn kind(&self) -> Result<AlertType, UnknownAlertType> {
        self.alert_type.parse()
    }
}

/// DTO for recording an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAlertEvent {
    pub device_id: String,
    pub alert_type: AlertType,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    /// Server timestamp of the triggering reading.
    pub created_at: Timestamp,
}
