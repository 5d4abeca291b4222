//! Device liveness derived from the newest entry.

use envmon_core::types::Timestamp;

use crate::reconciler::LiveSnapshot;
use crate::row::ReadingRow;

/// A device is online if its newest reading is younger than this.
pub const ONLINE_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub latest: Option<ReadingRow>,
    /// Whole seconds since `latest.created_at`, floored at zero.
    pub seconds_since_update: Option<i64>,
    pub online: bool,
    /// e.g. `"42 seconds ago"`; `None` without a reading.
    pub last_seen: Option<String>,
}

/// Derive status from the newest reading at `now`.
pub fn derive_status(latest: Option<&ReadingRow>, now: Timestamp) -> DeviceStatus {
    let seconds = latest.map(|row| now.signed_duration_since(row.created_at).num_seconds().max(0));
    DeviceStatus {
        latest: latest.cloned(),
        seconds_since_update: seconds,
        online: seconds.is_some_and(|s| s < ONLINE_WINDOW_SECS),
        last_seen: seconds.map(relative_time),
    }
}

impl LiveSnapshot {
    pub fn status(&self, now: Timestamp) -> DeviceStatus {
        derive_status(self.latest().map(|entry| &entry.row), now)
    }
}

/// Render an age in seconds as coarse relative text.
pub fn relative_time(seconds: i64) -> String {
    match seconds {
        s if s < 60 => format!("{s} seconds ago"),
        s if s < 3_600 => format!("{} minutes ago", s / 60),
        s if s < 86_400 => format!("{} hours ago", s / 3_600),
        s => format!("{} days ago", s / 86_400),
    }
}
