use std::str::FromStr;

use envmon_core::auth::DeviceCredential;
use envmon_core::thresholds::{
    ThresholdConfig, DEFAULT_COOLDOWN_MINUTES, DEFAULT_HUM_THRESHOLD, DEFAULT_TEMP_THRESHOLD,
};
use envmon_events::TelegramConfig;

/// Server configuration loaded from environment variables.
///
/// Built once at startup and shared read-only through [`AppState`](crate::state::AppState).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Shared secret devices must present on `/ingest`.
    pub device_credential: DeviceCredential,
    /// Alert thresholds and cooldown.
    pub thresholds: ThresholdConfig,
    /// Notification channel; unset token or chat disables delivery.
    pub telegram: TelegramConfig,
    /// Upper bound on a single notification attempt, in seconds (default: `10`).
    pub notify_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `DEVICE_SECRET`        | required                   |
    /// | `TEMP_THRESHOLD`       | `40`                       |
    /// | `HUM_THRESHOLD`        | `90`                       |
    /// | `COOLDOWN_MINUTES`     | `10`                       |
    /// | `TELEGRAM_BOT_TOKEN`   | unset                      |
    /// | `TELEGRAM_CHAT_ID`     | unset                      |
    /// | `NOTIFY_TIMEOUT_SECS`  | `10`                       |
    ///
    /// Panics on missing or malformed values so misconfiguration fails fast.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);

        let secret = std::env::var("DEVICE_SECRET").expect("DEVICE_SECRET must be set");
        assert!(!secret.is_empty(), "DEVICE_SECRET must not be empty");
        let device_credential = DeviceCredential::new(&secret);

        let thresholds = ThresholdConfig {
            temp_threshold: env_or("TEMP_THRESHOLD", DEFAULT_TEMP_THRESHOLD),
            hum_threshold: env_or("HUM_THRESHOLD", DEFAULT_HUM_THRESHOLD),
            cooldown_minutes: env_or("COOLDOWN_MINUTES", DEFAULT_COOLDOWN_MINUTES),
        };
        if let Err(e) = thresholds.validate() {
            panic!("Invalid threshold configuration: {e}");
        }

        let telegram = TelegramConfig::new(
            std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
        );

        let notify_timeout_secs: u64 = env_or("NOTIFY_TIMEOUT_SECS", 10);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            device_credential,
            thresholds,
            telegram,
            notify_timeout_secs,
        }
    }
}

/// Parse an env var, falling back to `default` when unset.
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
