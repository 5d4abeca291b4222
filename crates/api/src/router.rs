//! Application router: the route tree plus the HTTP middleware stack.
//!
//! `main.rs` and the integration tests both call [`build_app_router`], so the
//! tests exercise the same layers production serves with.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::Router;
use envmon_core::auth::CREDENTIAL_HEADERS;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// How long browsers may cache a CORS preflight answer.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Build the full application [`Router`].
///
/// Layers, outermost first: CORS, request id assignment, tracing, request id
/// echo on the response, request timeout, panic recovery.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(CatchPanicLayer::new());

    // CORS is applied as a separate, outermost router layer: `CorsLayer`
    // needs a `Default` response body, which axum's `Body` provides.
    service_routes()
        .layer(middleware)
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// `/health`, the legacy root `/ingest` that deployed firmware posts to, and
/// everything under `/api/v1`.
fn service_routes() -> Router<AppState> {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::ingest_router())
        .nest("/api/v1", routes::api_routes())
}

/// CORS for the configured dashboard origins.
///
/// Every device credential header is allowed so browser-based tools can post
/// readings. Panics on an unparsable origin.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{origin}': {e}"))
        })
        .collect();

    let headers: Vec<HeaderName> = CREDENTIAL_HEADERS
        .into_iter()
        .map(HeaderName::from_static)
        .chain([CONTENT_TYPE])
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(headers)
        .allow_credentials(true)
        .max_age(PREFLIGHT_MAX_AGE)
}
