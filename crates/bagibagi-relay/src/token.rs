//! Shared-secret verification of inbound webhooks.
//!
//! The caller token is looked up, in priority order, in the `X-Bagibagi-Token`
//! header, the `Authorization` header, and the `token` / `webhook_token` body
//! fields. A leading `Bearer ` is stripped from whichever source supplied it.

use actix_web::http::header::HeaderMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::TokenPolicy;
use crate::error::WebhookError;

pub const TOKEN_HEADER: &str = "x-bagibagi-token";
const BODY_TOKEN_FIELDS: &[&str] = &["token", "webhook_token"];

/// Outcome of the token check for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// No shared secret configured
    Disabled,
    Verified,
    Missing,
    Invalid,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Disabled => "disabled",
            TokenStatus::Verified => "verified",
            TokenStatus::Missing => "missing",
            TokenStatus::Invalid => "invalid",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, TokenStatus::Verified)
    }
}

/// Find the caller-supplied token, if any.
pub fn extract_token<'a>(headers: &'a HeaderMap, body: &'a Map<String, Value>) -> Option<&'a str> {
    let from_headers = [TOKEN_HEADER, "authorization"].into_iter().find_map(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    });

    let raw = from_headers.or_else(|| {
        BODY_TOKEN_FIELDS
            .iter()
            .find_map(|field| body.get(*field).and_then(Value::as_str))
            .filter(|v| !v.is_empty())
    })?;

    Some(strip_bearer(raw))
}

/// Remove a case-insensitive `Bearer` scheme prefix.
pub fn strip_bearer(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if bytes.len() > 6
        && bytes[..6].eq_ignore_ascii_case(b"bearer")
        && bytes[6].is_ascii_whitespace()
    {
        raw[6..].trim_start()
    } else {
        raw
    }
}

/// Constant-time comparison that leaks neither content nor length.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}

/// Compare the supplied token against the configured secret.
pub fn check_token(expected: Option<&str>, supplied: Option<&str>) -> TokenStatus {
    match (expected, supplied) {
        (None, _) => TokenStatus::Disabled,
        (Some(_), None) => TokenStatus::Missing,
        (Some(expected), Some(supplied)) => {
            if constant_time_eq(expected.as_bytes(), supplied.as_bytes()) {
                TokenStatus::Verified
            } else {
                TokenStatus::Invalid
            }
        }
    }
}

/// Apply the configured policy to a token status.
///
/// Advisory mode only logs; strict mode turns `Missing` into 401 and
/// `Invalid` into 403.
pub fn enforce(policy: TokenPolicy, status: TokenStatus) -> Result<TokenStatus, WebhookError> {
    match status {
        TokenStatus::Disabled => {
            tracing::info!("token check disabled (BAGIBAGI_TOKEN not set)");
            Ok(status)
        }
        TokenStatus::Verified => {
            tracing::info!("webhook token verified");
            Ok(status)
        }
        TokenStatus::Missing => match policy {
            TokenPolicy::Strict => {
                tracing::warn!(policy = %policy, "no token in request — rejecting");
                Err(WebhookError::TokenMissing)
            }
            TokenPolicy::Advisory => {
                tracing::warn!(policy = %policy, "no token in request — allowing without verification");
                Ok(status)
            }
        },
        TokenStatus::Invalid => match policy {
            TokenPolicy::Strict => {
                tracing::warn!(policy = %policy, "token provided but invalid — rejecting");
                Err(WebhookError::TokenInvalid)
            }
            TokenPolicy::Advisory => {
                tracing::warn!(policy = %policy, "token provided but invalid — allowing anyway");
                Ok(status)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_custom_header_wins() {
        let h = headers(&[("x-bagibagi-token", "abc"), ("authorization", "Bearer xyz")]);
        let b = body(json!({"token": "body"}));
        assert_eq!(extract_token(&h, &b), Some("abc"));
    }

    #[test]
    fn test_authorization_bearer_stripped() {
        let h = headers(&[("authorization", "bearer   xyz")]);
        assert_eq!(extract_token(&h, &Map::new()), Some("xyz"));

        let h = headers(&[("authorization", "xyz")]);
        assert_eq!(extract_token(&h, &Map::new()), Some("xyz"));
    }

    #[test]
    fn test_body_fields_in_order() {
        let b = body(json!({"webhook_token": "second", "token": "first"}));
        assert_eq!(extract_token(&HeaderMap::new(), &b), Some("first"));

        let b = body(json!({"webhook_token": "second"}));
        assert_eq!(extract_token(&HeaderMap::new(), &b), Some("second"));

        let b = body(json!({"token": 12345}));
        assert_eq!(extract_token(&HeaderMap::new(), &b), None);
    }

    #[test]
    fn test_strip_bearer_edge_cases() {
        assert_eq!(strip_bearer("Bearer"), "Bearer");
        assert_eq!(strip_bearer("Bearertoken"), "Bearertoken");
        assert_eq!(strip_bearer("BEARER\ttok"), "tok");
    }

    #[test]
    fn test_check_token_outcomes() {
        assert_eq!(check_token(None, Some("x")), TokenStatus::Disabled);
        assert_eq!(check_token(Some("s"), None), TokenStatus::Missing);
        assert_eq!(check_token(Some("s"), Some("s")), TokenStatus::Verified);
        assert_eq!(check_token(Some("s"), Some("t")), TokenStatus::Invalid);
    }

    #[test]
    fn test_strict_policy_rejects() {
        assert!(matches!(
            enforce(TokenPolicy::Strict, TokenStatus::Missing),
            Err(WebhookError::TokenMissing)
        ));
        assert!(matches!(
            enforce(TokenPolicy::Strict, TokenStatus::Invalid),
            Err(WebhookError::TokenInvalid)
        ));
        assert_eq!(
            enforce(TokenPolicy::Strict, TokenStatus::Verified).unwrap(),
            TokenStatus::Verified
        );
    }

    #[test]
    fn test_advisory_policy_allows() {
        assert_eq!(
            enforce(TokenPolicy::Advisory, TokenStatus::Missing).unwrap(),
            TokenStatus::Missing
        );
        assert_eq!(
            enforce(TokenPolicy::Advisory, TokenStatus::Invalid).unwrap(),
            TokenStatus::Invalid
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"much longer string"));
    }
}
