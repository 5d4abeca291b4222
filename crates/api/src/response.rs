//! Shared response envelope types for API handlers.

use envmon_db::models::reading::Reading;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Body returned by `POST /ingest` on success.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub row: Reading,
}
