//! Admin API-key verification for privileged endpoints.

use axum::http::HeaderMap;
use thiserror::Error;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing x-api-key header")]
    MissingKey,
    #[error("invalid API key")]
    InvalidKey,
    #[error("admin API key not configured")]
    Unconfigured,
}

/// Check the presented `x-api-key` header against the configured admin key.
///
/// With no key configured every request is rejected — the admin surface is
/// opt-in. Rejection happens before any state is touched.
pub fn require_admin(headers: &HeaderMap, configured: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = configured else {
        return Err(AuthError::Unconfigured);
    };
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingKey)?;
    if presented == expected {
        Ok(())
    } else {
        Err(AuthError::InvalidKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    #[test]
    fn matching_key_passes() {
        assert_eq!(
            require_admin(&headers_with_key("s3cret"), Some("s3cret")),
            Ok(())
        );
    }

    #[test]
    fn wrong_key_rejected() {
        assert_eq!(
            require_admin(&headers_with_key("nope"), Some("s3cret")),
            Err(AuthError::InvalidKey)
        );
    }

    #[test]
    fn missing_header_rejected() {
        assert_eq!(
            require_admin(&HeaderMap::new(), Some("s3cret")),
            Err(AuthError::MissingKey)
        );
    }

    #[test]
    fn unconfigured_key_rejects_everything() {
        assert_eq!(
            require_admin(&headers_with_key("anything"), None),
            Err(AuthError::Unconfigured)
        );
    }
}
