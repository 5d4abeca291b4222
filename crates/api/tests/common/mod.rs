#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use envmon_api::config::ServerConfig;
use envmon_api::pipeline::store::TelemetryStore;
use envmon_api::router::build_app_router;
use envmon_api::state::AppState;
use envmon_core::alert::{AlertType, ThresholdAlert};
use envmon_core::auth::DeviceCredential;
use envmon_core::thresholds::ThresholdConfig;
use envmon_core::types::Timestamp;
use envmon_db::models::alert_event::CreateAlertEvent;
use envmon_db::models::reading::{CreateReading, Reading};
use envmon_events::{AlertNotifier, NotifyOutcome, TelegramConfig};

pub const TEST_SECRET: &str = "s3cret-device-key";

/// Build a test `ServerConfig` with default thresholds and no notifier channel.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        device_credential: DeviceCredential::new(TEST_SECRET),
        thresholds: ThresholdConfig::default(),
        telegram: TelegramConfig::new(None, None),
        notify_timeout_secs: 10,
    }
}

/// Build the full application router over the given fakes, using the same
/// middleware stack as production.
pub fn build_test_app(store: Arc<MemoryStore>, notifier: Arc<RecordingNotifier>) -> Router {
    build_test_app_with_state(store, notifier).0
}

/// Like [`build_test_app`], also returning the state for direct access.
pub fn build_test_app_with_state(
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
) -> (Router, AppState) {
    let config = test_config();
    let state = AppState::new(config.clone(), store, notifier);
    (build_app_router(state.clone(), &config), state)
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    readings: Vec<Reading>,
    alerts: Vec<CreateAlertEvent>,
    next_id: i64,
}

/// `TelemetryStore` kept in memory, with a manual clock and failure switches.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    now: Mutex<Timestamp>,
    pub fail_insert: AtomicBool,
    pub fail_lookup: AtomicBool,
    pub fail_record: AtomicBool,
    /// Delay inside `latest_alert`, to widen race windows.
    lookup_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tables: Mutex::new(Tables::default()),
            now: Mutex::new(start_time()),
            fail_insert: AtomicBool::new(false),
            fail_lookup: AtomicBool::new(false),
            fail_record: AtomicBool::new(false),
            lookup_delay: Mutex::new(None),
        })
    }

    /// Move the store clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.lock().unwrap() = Some(delay);
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.tables.lock().unwrap().readings.clone()
    }

    pub fn alerts(&self) -> Vec<CreateAlertEvent> {
        self.tables.lock().unwrap().alerts.clone()
    }

    pub fn alerts_of(&self, alert_type: AlertType) -> usize {
        self.alerts()
            .iter()
            .filter(|a| a.alert_type == alert_type)
            .count()
    }

    /// Seed a reading directly, bypassing the pipeline.
    pub fn seed_reading(&self, device_id: &str, temperature: f64, at: Timestamp) -> Reading {
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let reading = Reading {
            id: tables.next_id,
            device_id: device_id.to_string(),
            temperature: Some(temperature),
            humidity: None,
            created_at: at,
        };
        tables.readings.push(reading.clone());
        reading
    }
}

pub fn start_time() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn injected() -> sqlx::Error {
    sqlx::Error::Protocol("injected failure".into())
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn insert_reading(&self, reading: &CreateReading) -> Result<Reading, sqlx::Error> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let created_at: DateTime<Utc> = *self.now.lock().unwrap();
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let stored = Reading {
            id: tables.next_id,
            device_id: reading.device_id.clone(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            created_at,
        };
        tables.readings.push(stored.clone());
        Ok(stored)
    }

    async fn recent_readings(
        &self,
        device_id: &str,
        limit: i64,
    ) -> Result<Vec<Reading>, sqlx::Error> {
        let mut rows: Vec<Reading> = self
            .readings()
            .into_iter()
            .filter(|r| r.device_id == device_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn latest_alert(
        &self,
        device_id: &str,
        alert_type: AlertType,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let delay = *self.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(self
            .alerts()
            .iter()
            .filter(|a| a.device_id == device_id && a.alert_type == alert_type)
            .map(|a| a.created_at)
            .max())
    }

    async fn record_alert(&self, event: &CreateAlertEvent) -> Result<(), sqlx::Error> {
        if self.fail_record.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.tables.lock().unwrap().alerts.push(event.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Recording notifier
// ---------------------------------------------------------------------------

/// `AlertNotifier` that records every alert and returns a fixed outcome.
pub struct RecordingNotifier {
    calls: Mutex<Vec<ThresholdAlert>>,
    outcome: NotifyOutcome,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Self::with_outcome(NotifyOutcome::Sent)
    }

    pub fn with_outcome(outcome: NotifyOutcome) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome,
            delay: None,
        })
    }

    /// A notifier that takes `delay` before answering.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            outcome: NotifyOutcome::Sent,
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> Vec<ThresholdAlert> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify(&self, alert: &ThresholdAlert) -> NotifyOutcome {
        self.calls.lock().unwrap().push(alert.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// POST a JSON body to `uri` with the given extra headers.
pub async fn post_json(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
) -> Response<Body> {
    post_raw(app, uri, headers, body.to_string()).await
}

pub async fn post_raw(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: String,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(Body::from(body)).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
