use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};

/// Default number of readings fetched as the baseline.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Default maximum number of entries held by the view.
pub const DEFAULT_CAPACITY: usize = 2000;

/// Watcher configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Base URL of the envmon API (default: `http://localhost:3000`).
    pub api_url: String,
    /// Device to observe (default: `esp32-01`).
    pub device_id: String,
    /// Readings fetched on (re-)initialization (default: `200`).
    pub history_limit: usize,
    /// Entries kept in the view (default: `2000`).
    pub capacity: usize,
    /// Offset applied when rendering entry times (default: UTC).
    pub display_offset: FixedOffset,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".into(),
            device_id: "esp32-01".into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            capacity: DEFAULT_CAPACITY,
            display_offset: utc(),
        }
    }
}

impl LiveConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                 |
    /// |-----------------------|-------------------------|
    /// | `ENVMON_API_URL`      | `http://localhost:3000` |
    /// | `ENVMON_DEVICE_ID`    | `esp32-01`              |
    /// | `HISTORY_LIMIT`       | `200`                   |
    /// | `LIVE_CAPACITY`       | `2000`                  |
    /// | `DISPLAY_UTC_OFFSET`  | `+00:00`                |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("ENVMON_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        let device_id = std::env::var("ENVMON_DEVICE_ID").unwrap_or(defaults.device_id);
        let history_limit = env_or("HISTORY_LIMIT", defaults.history_limit);
        let capacity = env_or("LIVE_CAPACITY", defaults.capacity);
        assert!(capacity > 0, "LIVE_CAPACITY must be positive");

        let display_offset = match std::env::var("DISPLAY_UTC_OFFSET") {
            Ok(raw) => raw
                .parse::<FixedOffset>()
                .unwrap_or_else(|e| panic!("DISPLAY_UTC_OFFSET must look like +07:00: {e}")),
            Err(_) => defaults.display_offset,
        };

        Self {
            api_url,
            device_id,
            history_limit,
            capacity,
            display_offset,
        }
    }

    /// WebSocket URL of the live feed for `device_id`.
    pub fn feed_url(&self) -> String {
        let ws_base = if let Some(rest) = self.api_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.api_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.api_url.clone()
        };
        format!("{ws_base}/api/v1/ws/readings")
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| {
                panic!("{name} must be a valid {}: {e}", std::any::type_name::<T>())
            }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_switches_scheme() {
        let mut config = LiveConfig::default();
        assert_eq!(config.feed_url(), "ws://localhost:3000/api/v1/ws/readings");

        config.api_url = "https://envmon.example.com".into();
        assert_eq!(config.feed_url(), "wss://envmon.example.com/api/v1/ws/readings");
    }
}
