//! Change feed and outbound alert delivery.
//!
//! - [`ChangeFeed`]: in-process fan-out of newly stored readings, backed by
//!   `tokio::sync::broadcast`, with per-device subscriptions.
//! - [`delivery`]: the [`AlertNotifier`] seam and its Telegram implementation.

pub mod delivery;
pub mod feed;

pub use delivery::telegram::{TelegramConfig, TelegramNotifier};
pub use delivery::{AlertNotifier, NotifyOutcome};
pub use feed::{ChangeFeed, DeviceSubscription, FeedMessage, FeedRecvError};
