use std::time::Duration;

use async_trait::async_trait;

use super::{FetchError, ReadingHistory};
use crate::row::{DataEnvelope, ReadingRow};

/// Request timeout for history fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches history from `GET /api/v1/readings`.
#[derive(Debug, Clone)]
pub struct HttpHistory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpHistory {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReadingHistory for HttpHistory {
    async fn fetch_recent(
        &self,
        device_id: &str,
        limit: usize,
    ) -> Result<Vec<ReadingRow>, FetchError> {
        let url = format!("{}/api/v1/readings", self.base_url);
        let limit = limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("device_id", device_id), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: DataEnvelope<Vec<ReadingRow>> = response.json().await?;
        tracing::debug!(device_id, rows = body.data.len(), "Fetched history");
        Ok(body.data)
    }
}
