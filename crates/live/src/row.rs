//! Wire types the watcher reads from the API.

use envmon_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

/// One stored reading as served by the history endpoint and the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRow {
    pub id: DbId,
    pub device_id: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub created_at: Timestamp,
}

/// Live-feed text frame.
#[derive(Debug, Deserialize)]
pub struct FeedFrame {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub row: Option<ReadingRow>,
}

/// `{ "data": T }` response envelope.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}
