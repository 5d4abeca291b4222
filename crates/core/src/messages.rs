//! Live-feed WebSocket message types.
//!
//! Shared by the server, which emits these frames, and the watcher client,
//! which parses them.

/// Message type discriminator for a newly stored reading.
///
/// Frame shape: `{"type": "reading.inserted", "row": { ...reading... }}`.
pub const MSG_TYPE_READING_INSERTED: &str = "reading.inserted";
