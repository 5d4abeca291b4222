//! Where the live view gets its data: a history source for the baseline and
//! a feed source for subsequent inserts.

pub mod http;
pub mod ws;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::row::ReadingRow;

pub use self::http::HttpHistory;
pub use self::ws::WsFeed;

/// Buffered feed rows between the socket reader and the session loop.
pub const FEED_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("history endpoint returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),
}

/// One-shot fetch of the most recent readings, newest first.
#[async_trait]
pub trait ReadingHistory: Send + Sync {
    async fn fetch_recent(&self, device_id: &str, limit: usize)
        -> Result<Vec<ReadingRow>, FetchError>;
}

/// Subscription to insert events for one device.
///
/// `subscribe` resolves once the server has accepted the subscription, so
/// every insert after that point is delivered.
#[async_trait]
pub trait ReadingFeed: Send + Sync {
    async fn subscribe(&self, device_id: &str) -> Result<FeedSubscription, FeedError>;
}

/// Receiving end of a feed subscription.
///
/// Rows arrive through a bounded channel from a reader task. Dropping the
/// subscription cancels the reader; [`FeedSubscription::close`] also waits
/// for it to finish.
#[derive(Debug)]
pub struct FeedSubscription {
    rows: mpsc::Receiver<ReadingRow>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    pub fn new(
        rows: mpsc::Receiver<ReadingRow>,
        cancel: CancellationToken,
        reader: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            rows,
            cancel,
            reader,
        }
    }

    /// Next row, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<ReadingRow> {
        self.rows.recv().await
    }

    /// Unsubscribe and wait for the reader to stop.
    pub async fn close(mut self) {
        self.cancel.cancel();
        self.rows.close();
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.await {
                tracing::debug!(error = %e, "Feed reader ended abnormally");
            }
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
