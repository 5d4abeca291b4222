//! `envmon-watch` -- terminal live view of one device.
//!
//! Fetches recent readings from the envmon API, then follows the live feed
//! and logs each update together with the device's online status.
//!
//! See [`LiveConfig::from_env`] for the environment variables.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use envmon_live::config::LiveConfig;
use envmon_live::reconciler::{LiveSnapshot, ViewState};
use envmon_live::session::{LiveView, SessionOptions};
use envmon_live::source::{HttpHistory, WsFeed};

/// How often the online/offline status is re-evaluated without new data.
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "envmon_live=debug,envmon_watch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LiveConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        device_id = %config.device_id,
        history_limit = config.history_limit,
        capacity = config.capacity,
        "Starting envmon-watch",
    );

    let history = HttpHistory::new(&config.api_url).expect("Failed to build HTTP client");
    let feed = WsFeed::new(config.feed_url());
    let mut view = LiveView::new(
        Arc::new(history),
        Arc::new(feed),
        SessionOptions::from(&config),
    );
    let mut snapshots = view.watch();
    view.switch_device(config.device_id.clone()).await;

    let mut ticker = tokio::time::interval(STATUS_INTERVAL);
    ticker.tick().await;
    let mut last_seen_id = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT (Ctrl-C), shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let latest_id = snapshot.latest().map(|e| e.row.id);
                if latest_id != last_seen_id || snapshot.state != ViewState::Ready {
                    report(&snapshot);
                    last_seen_id = latest_id;
                }
            }
            _ = ticker.tick() => report(&snapshots.borrow().clone()),
        }
    }

    view.shutdown().await;
    tracing::info!("Shutdown complete");
}

fn report(snapshot: &LiveSnapshot) {
    let device_id = snapshot.device_id.as_deref().unwrap_or("-");
    match &snapshot.state {
        ViewState::Idle => tracing::info!("Idle"),
        ViewState::Loading => tracing::info!(device_id, "Loading recent readings"),
        ViewState::Error(message) => {
            tracing::error!(device_id, error = %message, "Live view failed")
        }
        ViewState::Ready => {
            let status = snapshot.status(Utc::now());
            match snapshot.latest() {
                Some(entry) => tracing::info!(
                    device_id,
                    time = %entry.time,
                    temperature = ?entry.row.temperature,
                    humidity = ?entry.row.humidity,
                    online = status.online,
                    last_seen = status.last_seen.as_deref().unwrap_or("never"),
                    entries = snapshot.entries.len(),
                    "Latest reading",
                ),
                None => tracing::info!(device_id, online = false, "No readings yet"),
            }
        }
    }
}
