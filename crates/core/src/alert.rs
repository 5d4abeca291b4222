//! Alert types for threshold breaches on device readings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// The kind of breach an alert reports.
///
/// Stored as its snake_case name in `alert_events.alert_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    TemperatureHigh,
    HumidityHigh,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemperatureHigh => "temperature_high",
            Self::HumidityHigh => "humidity_high",
        }
    }

    /// Human-readable metric name used in notification text.
    pub fn metric_label(self) -> &'static str {
        match self {
            Self::TemperatureHigh => "Temperature",
            Self::HumidityHigh => "Humidity",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::TemperatureHigh => "°C",
            Self::HumidityHigh => "%",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown alert type: {0}")]
pub struct UnknownAlertType(pub String);

impl FromStr for AlertType {
    type Err = UnknownAlertType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature_high" => Ok(Self::TemperatureHigh),
            "humidity_high" => Ok(Self::HumidityHigh),
            other => Err(UnknownAlertType(other.to_string())),
        }
    }
}

/// A single metric on one reading that met or exceeded its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breach {
    pub alert_type: AlertType,
    /// The observed metric value.
    pub observed: f64,
    /// The configured threshold it was compared against.
    pub threshold: f64,
}

/// An eligible breach, ready to be sent to the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdAlert {
    pub device_id: String,
    pub alert_type: AlertType,
    pub observed_value: f64,
    pub threshold_value: f64,
    /// Server timestamp of the reading that triggered the alert.
    pub timestamp: Timestamp,
}

impl ThresholdAlert {
    pub fn from_breach(device_id: &str, breach: &Breach, timestamp: Timestamp) -> Self {
        Self {
            device_id: device_id.to_string(),
            alert_type: breach.alert_type,
            observed_value: breach.observed,
            threshold_value: breach.threshold,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_type_round_trips_through_str() {
        for t in [AlertType::TemperatureHigh, AlertType::HumidityHigh] {
            assert_eq!(t.as_str().parse::<AlertType>(), Ok(t));
        }
    }

    #[test]
    fn unknown_alert_type_is_rejected() {
        assert_eq!(
            "pressure_low".parse::<AlertType>(),
            Err(UnknownAlertType("pressure_low".into()))
        );
    }

    #[test]
    fn alert_type_serializes_snake_case() {
        let json = serde_json::to_string(&AlertType::HumidityHigh).unwrap();
        assert_eq!(json, "\"humidity_high\"");
    }
}
