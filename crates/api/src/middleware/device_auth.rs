//! Shared-secret authentication extractor for device ingestion.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use envmon_core::auth::{select_credential, Presented, CREDENTIAL_HEADERS};
use envmon_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carried the configured device secret.
///
/// The credential is read from the first non-empty header among
/// `device-secret`, `x-device-secret` and `authorization`. Either the bare
/// secret or `Bearer <secret>` is accepted.
///
/// ```ignore
/// async fn ingest(_auth: DeviceAuth, body: Bytes) -> AppResult<Json<()>> { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DeviceAuth;

impl FromRequestParts<AppState> for DeviceAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let presented = select_credential(|name| {
            headers
                .get(name)
                .map(|v| v.to_str().map_or(Presented::Opaque, Presented::Text))
        });

        state
            .config
            .device_credential
            .verify(presented)
            .map_err(|err| {
                let header = CREDENTIAL_HEADERS
                    .iter()
                    .find(|h| headers.contains_key(**h))
                    .copied()
                    .unwrap_or("none");
                tracing::warn!(error = %err, header, "Rejected device credential");
                AppError::Core(CoreError::from(err))
            })?;

        Ok(DeviceAuth)
    }
}
