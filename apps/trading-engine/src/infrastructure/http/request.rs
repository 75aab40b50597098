//! HTTP request parsing.

use axum::body::Bytes;
use axum::http::HeaderMap;

use crate::domain::risk_management::ConfigOverrides;

/// Header carrying the admin secret for privileged calls.
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Admin secret from the request headers, if present and valid UTF-8.
#[must_use]
pub fn admin_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
}

/// Parse the optional `run` body. An empty body means no overrides.
pub fn parse_overrides(body: &Bytes) -> Result<ConfigOverrides, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ConfigOverrides::default());
    }
    serde_json::from_slice(body)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn empty_body_is_no_overrides() {
        assert_eq!(parse_overrides(&Bytes::new()).unwrap(), ConfigOverrides::default());
        assert_eq!(parse_overrides(&Bytes::from_static(b"  \n")).unwrap(), ConfigOverrides::default());
    }

    #[test]
    fn body_parses_camel_case_overrides() {
        let overrides = parse_overrides(&Bytes::from_static(br#"{"leverageCap": 3}"#)).unwrap();
        assert_eq!(overrides.leverage_cap, Some(3));
    }

    #[test]
    fn unknown_override_field_is_rejected() {
        assert!(parse_overrides(&Bytes::from_static(br#"{"leverage": 3}"#)).is_err());
    }

    #[test]
    fn secret_header_is_read() {
        let mut headers = HeaderMap::new();
        assert!(admin_secret(&headers).is_none());
        headers.insert(ADMIN_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert_eq!(admin_secret(&headers), Some("s3cret"));
    }
}
