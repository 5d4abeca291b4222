//! Shared-secret authentication for device submissions.
//!
//! Field devices present a single process-wide secret in one of several
//! header slots. The HTTP layer supplies a header lookup; this module picks
//! the credential and compares it against the configured secret.

use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Header names checked for a device credential, highest priority first.
pub const CREDENTIAL_HEADERS: [&str; 3] = ["device-secret", "x-device-secret", "authorization"];

/// Prefix accepted in front of the secret (`Bearer <secret>`).
const BEARER_PREFIX: &str = "Bearer ";

/// Why a device credential was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// None of the recognized headers carried a value.
    #[error("Missing device credential")]
    Missing,
    /// A credential was presented but does not match the configured secret.
    #[error("Invalid device credential")]
    Invalid,
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        CoreError::Unauthorized(err.to_string())
    }
}

/// A credential header as presented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented<'a> {
    /// A readable value.
    Text(&'a str),
    /// A value with bytes outside visible ASCII. It can never match the
    /// secret, but it still occupies its header slot.
    Opaque,
}

/// Pick the credential from the first recognized header with a non-empty value.
///
/// `lookup` maps a lowercase header name to its value, if the header is present.
pub fn select_credential<'a, F>(lookup: F) -> Option<Presented<'a>>
where
    F: Fn(&str) -> Option<Presented<'a>>,
{
    CREDENTIAL_HEADERS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|presented| match presented {
            Presented::Text(value) => Presented::Text(value.trim()),
            Presented::Opaque => Presented::Opaque,
        })
        .find(|presented| *presented != Presented::Text(""))
}

/// The configured device secret, kept only as digests of its accepted forms.
#[derive(Clone)]
pub struct DeviceCredential {
    direct: [u8; 32],
    bearer: [u8; 32],
}

impl DeviceCredential {
    /// Build a credential from the raw shared secret.
    pub fn new(secret: &str) -> Self {
        Self {
            direct: digest(secret),
            bearer: digest(&format!("{BEARER_PREFIX}{secret}")),
        }
    }

    /// Check a presented credential.
    ///
    /// Accepts the secret itself or `Bearer <secret>`.
    pub fn verify(&self, presented: Option<Presented<'_>>) -> Result<(), AuthError> {
        let presented = match presented.ok_or(AuthError::Missing)? {
            Presented::Text(value) => value,
            Presented::Opaque => return Err(AuthError::Invalid),
        };
        let candidate = digest(presented);
        if candidate == self.direct || candidate == self.bearer {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

impl std::fmt::Debug for DeviceCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeviceCredential(<redacted>)")
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn headers<'a>(pairs: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        pairs.iter().copied().collect()
    }

    fn text<'a>(map: &HashMap<&'a str, &'a str>, name: &str) -> Option<Presented<'a>> {
        map.get(name).copied().map(Presented::Text)
    }

    #[test]
    fn accepts_raw_secret() {
        let cred = DeviceCredential::new("s3cret");
        assert_eq!(cred.verify(Some(Presented::Text("s3cret"))), Ok(()));
    }

    #[test]
    fn accepts_bearer_form() {
        let cred = DeviceCredential::new("s3cret");
        assert_eq!(cred.verify(Some(Presented::Text("Bearer s3cret"))), Ok(()));
    }

    #[test]
    fn rejects_missing_credential() {
        let cred = DeviceCredential::new("s3cret");
        assert_eq!(cred.verify(None), Err(AuthError::Missing));
    }

    #[test]
    fn rejects_wrong_secret() {
        let cred = DeviceCredential::new("s3cret");
        assert_eq!(cred.verify(Some(Presented::Text("guess"))), Err(AuthError::Invalid));
        assert_eq!(cred.verify(Some(Presented::Text("Bearer guess"))), Err(AuthError::Invalid));
        assert_eq!(cred.verify(Some(Presented::Text("Basic s3cret"))), Err(AuthError::Invalid));
    }

    #[test]
    fn primary_header_wins() {
        let map = headers(&[
            ("device-secret", "first"),
            ("x-device-secret", "second"),
            ("authorization", "Bearer third"),
        ]);
        assert_eq!(select_credential(|n| text(&map, n)), Some(Presented::Text("first")));
    }

    #[test]
    fn falls_through_empty_headers() {
        let map = headers(&[("device-secret", "  "), ("authorization", "Bearer tok")]);
        assert_eq!(
            select_credential(|n| text(&map, n)),
            Some(Presented::Text("Bearer tok"))
        );
    }

    #[test]
    fn opaque_primary_header_still_wins() {
        let lookup = |name: &str| match name {
            "device-secret" => Some(Presented::Opaque),
            "x-device-secret" => Some(Presented::Text("s3cret")),
            _ => None,
        };
        assert_eq!(select_credential(lookup), Some(Presented::Opaque));
    }

    #[test]
    fn opaque_credential_is_invalid() {
        let cred = DeviceCredential::new("s3cret");
        assert_eq!(cred.verify(Some(Presented::Opaque)), Err(AuthError::Invalid));
    }

    #[test]
    fn no_recognized_header_yields_none() {
        let map = headers(&[("x-api-key", "abc")]);
        assert_eq!(select_credential(|n| text(&map, n)), None);
    }

    #[test]
    fn debug_output_does_not_leak_secret() {
        let cred = DeviceCredential::new("s3cret");
        assert!(!format!("{cred:?}").contains("s3cret"));
    }

    #[test]
    fn auth_error_maps_to_unauthorized() {
        let core: CoreError = AuthError::Missing.into();
        assert!(matches!(core, CoreError::Unauthorized(_)));
    }
}
