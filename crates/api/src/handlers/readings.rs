//! Handler for the reading history query.

use axum::extract::{Query, State};
use axum::Json;
use envmon_db::models::reading::Reading;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default number of readings returned.
pub const DEFAULT_LIMIT: i64 = 200;

/// Largest page a caller may request; larger values are clamped.
pub const MAX_LIMIT: i64 = 2000;

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    pub device_id: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/v1/readings?device_id=<id>&limit=<n>
///
/// Most recent readings for one device, newest first.
pub async fn list_readings(
    State(state): State<AppState>,
    Query(params): Query<ReadingsQuery>,
) -> AppResult<Json<DataResponse<Vec<Reading>>>> {
    let device_id = params
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("device_id is required".into()))?;

    let limit = resolve_limit(params.limit)?;
    let data = state.store.recent_readings(device_id, limit).await?;
    Ok(Json(DataResponse { data }))
}

fn resolve_limit(requested: Option<i64>) -> AppResult<i64> {
    match requested {
        None => Ok(DEFAULT_LIMIT),
        Some(n) if n < 1 => Err(AppError::BadRequest(format!(
            "limit must be at least 1, got {n}"
        ))),
        Some(n) => Ok(n.min(MAX_LIMIT)),
    }
}
