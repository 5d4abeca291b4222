//! Handler for device submissions.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use envmon_core::error::CoreError;
use envmon_core::ingest::validate_submission;

use crate::error::{AppError, AppResult};
use crate::middleware::device_auth::DeviceAuth;
use crate::response::IngestResponse;
use crate::state::AppState;

/// POST /ingest
///
/// Authenticate, validate, store, and run alerting for one reading. The body
/// is parsed here rather than through `Json` so credential failures are
/// reported before any payload problem.
pub async fn ingest_reading(
    State(state): State<AppState>,
    _auth: DeviceAuth,
    body: Bytes,
) -> AppResult<(StatusCode, Json<IngestResponse>)> {
    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;

    let submission = validate_submission(&payload).map_err(|e| {
        tracing::debug!(fields = ?e.fields(), "Rejected submission");
        AppError::Core(CoreError::from(e))
    })?;

    let report = state.pipeline.ingest(&submission).await?;
    if !report.decisions.is_empty() {
        tracing::debug!(
            reading_id = report.reading.id,
            decisions = ?report.decisions,
            "Alert evaluation complete",
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            success: true,
            row: report.reading,
        }),
    ))
}
