//! Threshold evaluation for device readings.
//!
//! Pure logic: the caller passes the stored reading's metrics and the
//! process-wide [`ThresholdConfig`].

use crate::alert::{AlertType, Breach};
use crate::error::CoreError;

pub const DEFAULT_TEMP_THRESHOLD: f64 = 40.0;
pub const DEFAULT_HUM_THRESHOLD: f64 = 90.0;
pub const DEFAULT_COOLDOWN_MINUTES: u32 = 10;

/// Alerting thresholds, read-only after startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    /// Temperature (°C) at or above which `temperature_high` fires.
    pub temp_threshold: f64,
    /// Relative humidity (%) at or above which `humidity_high` fires.
    pub hum_threshold: f64,
    /// Minimum minutes between two recorded alerts of the same device and type.
    pub cooldown_minutes: u32,
}

impl ThresholdConfig {
    /// Cooldown window as a duration.
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.cooldown_minutes))
    }

    /// Reject non-finite thresholds.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, value) in [
            ("temp_threshold", self.temp_threshold),
            ("hum_threshold", self.hum_threshold),
        ] {
            if !value.is_finite() {
                return Err(CoreError::Validation(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temp_threshold: DEFAULT_TEMP_THRESHOLD,
            hum_threshold: DEFAULT_HUM_THRESHOLD,
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
        }
    }
}

/// Metric values of one stored reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingMetrics {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// Return every breach on the reading, temperature first.
///
/// Comparison is inclusive: a value equal to its threshold breaches.
/// Absent metrics never breach.
pub fn evaluate(metrics: ReadingMetrics, config: &ThresholdConfig) -> Vec<Breach> {
    let checks = [
        (
            AlertType::TemperatureHigh,
            metrics.temperature,
            config.temp_threshold,
        ),
        (AlertType::HumidityHigh, metrics.humidity, config.hum_threshold),
    ];

    checks
        .into_iter()
        .filter_map(|(alert_type, value, threshold)| {
            let observed = value?;
            (observed >= threshold).then_some(Breach {
                alert_type,
                observed,
                threshold,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(temperature: Option<f64>, humidity: Option<f64>) -> ReadingMetrics {
        ReadingMetrics {
            temperature,
            humidity,
        }
    }

    #[test]
    fn no_breach_within_thresholds() {
        let breaches = evaluate(metrics(Some(25.0), Some(50.0)), &ThresholdConfig::default());
        assert!(breaches.is_empty());
    }

    #[test]
    fn high_temperature_breaches_alone() {
        let breaches = evaluate(metrics(Some(45.0), Some(50.0)), &ThresholdConfig::default());
        assert_eq!(
            breaches,
            vec![Breach {
                alert_type: AlertType::TemperatureHigh,
                observed: 45.0,
                threshold: 40.0,
            }]
        );
    }

    #[test]
    fn threshold_value_itself_breaches() {
        let breaches = evaluate(metrics(Some(40.0), Some(90.0)), &ThresholdConfig::default());
        assert_eq!(breaches.len(), 2);
    }

    #[test]
    fn both_metrics_breach_independently() {
        let breaches = evaluate(metrics(Some(50.0), Some(95.0)), &ThresholdConfig::default());
        let types: Vec<_> = breaches.iter().map(|b| b.alert_type).collect();
        assert_eq!(types, vec![AlertType::TemperatureHigh, AlertType::HumidityHigh]);
    }

    #[test]
    fn absent_metrics_never_breach() {
        let config = ThresholdConfig {
            temp_threshold: -100.0,
            hum_threshold: -100.0,
            cooldown_minutes: 1,
        };
        assert!(evaluate(metrics(None, None), &config).is_empty());
    }

    #[test]
    fn cooldown_converts_minutes() {
        assert_eq!(
            ThresholdConfig::default().cooldown(),
            chrono::Duration::minutes(10)
        );
    }

    #[test]
    fn validate_rejects_nan_threshold() {
        let config = ThresholdConfig {
            temp_threshold: f64::NAN,
            ..ThresholdConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ThresholdConfig::default().validate().is_ok());
    }
}
