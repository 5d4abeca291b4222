//! Request extractors guarding device-facing endpoints.
//!
//! - [`device_auth::DeviceAuth`] -- Verifies the shared device secret.

pub mod device_auth;
