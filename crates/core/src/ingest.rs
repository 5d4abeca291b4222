//! Validation of inbound device submissions.
//!
//! The request body arrives as loosely typed JSON. [`validate_submission`]
//! is the only way to build a [`ReadingSubmission`], so everything past the
//! HTTP boundary works with a statically shaped, checked value.

use std::fmt;

use serde_json::Value;

use crate::error::CoreError;

/// A validated reading ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSubmission {
    device_id: String,
    temperature: Option<f64>,
    humidity: Option<f64>,
}

impl ReadingSubmission {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn humidity(&self) -> Option<f64> {
        self.humidity
    }
}

/// A single problem found in a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    /// The body is not a JSON object.
    NotAnObject,
    /// A required field is absent or empty.
    Missing(&'static str),
    /// A field is present with the wrong JSON type.
    WrongType(&'static str),
    /// A metric is present but cannot be read as a finite number.
    NotNumeric(&'static str),
    /// Neither `temperature` nor `humidity` was supplied.
    NoMetrics,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "body must be a JSON object"),
            Self::Missing(field) => write!(f, "{field} is required"),
            Self::WrongType(field) => write!(f, "{field} must be a string"),
            Self::NotNumeric(field) => write!(f, "{field} must be a number"),
            Self::NoMetrics => write!(f, "at least one of temperature or humidity is required"),
        }
    }
}

/// Submission rejected; lists every offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Names of the fields involved, for logging.
    pub fn fields(&self) -> Vec<&'static str> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                FieldIssue::Missing(f) | FieldIssue::WrongType(f) | FieldIssue::NotNumeric(f) => {
                    Some(*f)
                }
                FieldIssue::NoMetrics => Some("temperature|humidity"),
                FieldIssue::NotAnObject => None,
            })
            .collect()
    }
}

impl From<ValidationError> for CoreError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a parsed request body into a [`ReadingSubmission`].
///
/// Metrics may be JSON numbers or numeric strings; `null` counts as absent.
pub fn validate_submission(body: &Value) -> Result<ReadingSubmission, ValidationError> {
    let Some(obj) = body.as_object() else {
        return Err(ValidationError {
            issues: vec![FieldIssue::NotAnObject],
        });
    };

    let mut issues = Vec::new();

    let device_id = match obj.get("device_id") {
        None | Some(Value::Null) => {
            issues.push(FieldIssue::Missing("device_id"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            issues.push(FieldIssue::Missing("device_id"));
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            issues.push(FieldIssue::WrongType("device_id"));
            None
        }
    };

    let temperature = coerce_metric(obj.get("temperature"), "temperature", &mut issues);
    let humidity = coerce_metric(obj.get("humidity"), "humidity", &mut issues);

    let metric_present = |v: Option<&Value>| !matches!(v, None | Some(Value::Null));
    if !metric_present(obj.get("temperature")) && !metric_present(obj.get("humidity")) {
        issues.push(FieldIssue::NoMetrics);
    }

    match device_id {
        Some(device_id) if issues.is_empty() => Ok(ReadingSubmission {
            device_id,
            temperature,
            humidity,
        }),
        _ => Err(ValidationError { issues }),
    }
}

/// Read an optional metric as `f64`, recording an issue if it is malformed.
fn coerce_metric(
    value: Option<&Value>,
    field: &'static str,
    issues: &mut Vec<FieldIssue>,
) -> Option<f64> {
    let parsed = match value? {
        Value::Null => return None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Some(v),
        _ => {
            issues.push(FieldIssue::NotNumeric(field));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_full_payload() {
        let sub = validate_submission(&json!({
            "device_id": "esp32-01",
            "temperature": 21.5,
            "humidity": 40
        }))
        .expect("valid payload");
        assert_eq!(sub.device_id(), "esp32-01");
        assert_eq!(sub.temperature(), Some(21.5));
        assert_eq!(sub.humidity(), Some(40.0));
    }

    #[test]
    fn accepts_single_metric() {
        let sub = validate_submission(&json!({"device_id": "d", "humidity": 55.0})).unwrap();
        assert_eq!(sub.temperature(), None);
        assert_eq!(sub.humidity(), Some(55.0));
    }

    #[test]
    fn coerces_numeric_strings() {
        let sub = validate_submission(&json!({"device_id": "d", "temperature": " 45.5 "})).unwrap();
        assert_eq!(sub.temperature(), Some(45.5));
    }

    #[test]
    fn null_metric_counts_as_absent() {
        let sub =
            validate_submission(&json!({"device_id": "d", "temperature": null, "humidity": 10}))
                .unwrap();
        assert_eq!(sub.temperature(), None);
    }

    #[test]
    fn missing_device_id_is_rejected() {
        let err = validate_submission(&json!({"temperature": 20})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::Missing("device_id")]);
    }

    #[test]
    fn blank_device_id_is_rejected() {
        let err = validate_submission(&json!({"device_id": "   ", "temperature": 20})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::Missing("device_id")]);
    }

    #[test]
    fn non_string_device_id_is_rejected() {
        let err = validate_submission(&json!({"device_id": 7, "temperature": 20})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::WrongType("device_id")]);
    }

    #[test]
    fn missing_both_metrics_is_rejected() {
        let err = validate_submission(&json!({"device_id": "d"})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::NoMetrics]);
    }

    #[test]
    fn reports_every_offending_field() {
        let err = validate_submission(&json!({})).unwrap_err();
        assert_eq!(
            err.issues,
            vec![FieldIssue::Missing("device_id"), FieldIssue::NoMetrics]
        );
        assert_eq!(
            err.to_string(),
            "device_id is required; at least one of temperature or humidity is required"
        );
    }

    #[test]
    fn non_numeric_metric_is_rejected() {
        let err =
            validate_submission(&json!({"device_id": "d", "temperature": "hot"})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::NotNumeric("temperature")]);
        assert_eq!(err.fields(), vec!["temperature"]);
    }

    #[test]
    fn boolean_metric_is_rejected() {
        let err = validate_submission(&json!({"device_id": "d", "humidity": true})).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::NotNumeric("humidity")]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = validate_submission(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.issues, vec![FieldIssue::NotAnObject]);
    }

    #[test]
    fn validation_error_maps_to_core_validation() {
        let err = validate_submission(&json!({})).unwrap_err();
        assert_matches!(
            CoreError::from(err),
            CoreError::Validation(msg) if msg.contains("device_id")
        );
    }
}
