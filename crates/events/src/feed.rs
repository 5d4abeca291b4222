//! In-process change feed of inserted readings.
//!
//! The ingestion pipeline publishes every stored [`Reading`]; live-view
//! WebSocket connections subscribe with a device filter. The feed is shared
//! via `Arc<ChangeFeed>`; dropping the last handle closes every subscription.

use envmon_core::messages::MSG_TYPE_READING_INSERTED;
use envmon_db::models::reading::Reading;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// JSON frame sent to live-feed subscribers.
#[derive(Debug, Serialize)]
pub struct FeedMessage<'a> {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub row: &'a Reading,
}

impl<'a> FeedMessage<'a> {
    pub fn inserted(row: &'a Reading) -> Self {
        Self {
            msg_type: MSG_TYPE_READING_INSERTED,
            row,
        }
    }
}

/// Fan-out hub for stored readings.
pub struct ChangeFeed {
    sender: broadcast::Sender<Reading>,
}

impl ChangeFeed {
    /// Create a feed with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed readings are dropped and
    /// slow subscribers observe [`FeedRecvError::Lagged`].
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a stored reading to all current subscribers.
    pub fn publish(&self, reading: Reading) {
        // A SendError only means there are no subscribers.
        let _ = self.sender.send(reading);
    }

    /// Subscribe to inserts for a single device.
    pub fn subscribe(&self, device_id: impl Into<String>) -> DeviceSubscription {
        DeviceSubscription {
            device_id: device_id.into(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Why a subscription stopped yielding readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FeedRecvError {
    /// The subscriber fell behind and `n` readings were dropped.
    #[error("subscription lagged, {0} readings skipped")]
    Lagged(u64),
    /// The feed was dropped.
    #[error("change feed closed")]
    Closed,
}

/// A device-filtered view of the [`ChangeFeed`].
pub struct DeviceSubscription {
    device_id: String,
    receiver: broadcast::Receiver<Reading>,
}

impl DeviceSubscription {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Wait for the next reading for this device.
    ///
    /// Readings for other devices are skipped.
    pub async fn recv(&mut self) -> Result<Reading, FeedRecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(reading) if reading.device_id == self.device_id => return Ok(reading),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(FeedRecvError::Lagged(n))
                }
                Err(broadcast::error::RecvError::Closed) => return Err(FeedRecvError::Closed),
            }
        }
    }
}
