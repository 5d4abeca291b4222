pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Device ingestion route mounted at the root, where field firmware posts.
pub fn ingest_router() -> Router<AppState> {
    Router::new().route("/ingest", post(handlers::ingest::ingest_reading))
}

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ingest                      submit a reading (device secret)
/// /readings?device_id&limit    recent readings, newest first
/// /ws/readings?device_id       live feed of stored readings (WebSocket)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(ingest_router())
        .route("/readings", get(handlers::readings::list_readings))
        .route("/ws/readings", get(handlers::feed::reading_feed))
}
