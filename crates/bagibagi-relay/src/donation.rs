//! Normalization of BagiBagi notifications into a [`DonationNotice`].
//!
//! The inbound body has no fixed schema, so each field walks an ordered list
//! of candidate keys and takes the first usable value.

use serde::Serialize;
use serde_json::{Map, Value};

pub const PLATFORM: &str = "bagibagi";
pub const ANONYMOUS_DONOR: &str = "Anonymous";

const DONOR_NAME_KEYS: &[&str] = &["supporter_name", "name", "donatur_name"];
const AMOUNT_KEYS: &[&str] = &["amount", "amount_raw"];
const MESSAGE_KEYS: &[&str] = &["support_message", "message"];

/// The normalized record relayed to MessagingService. Request-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationNotice {
    pub donor_name: String,
    pub amount: i64,
    pub message: String,
    /// Epoch milliseconds at processing time, not donation time
    pub timestamp: i64,
    pub platform: &'static str,
}

impl DonationNotice {
    /// Build a notice from the request body. `timestamp` is the only input
    /// not taken from the body.
    pub fn from_body(body: &Map<String, Value>, timestamp: i64) -> Self {
        Self {
            donor_name: first_text(body, DONOR_NAME_KEYS)
                .unwrap_or_else(|| ANONYMOUS_DONOR.to_string()),
            amount: first_amount(body, AMOUNT_KEYS).unwrap_or(0),
            message: first_text(body, MESSAGE_KEYS).unwrap_or_default(),
            timestamp,
            platform: PLATFORM,
        }
    }
}

/// Decode a raw request body into a key-value map.
///
/// Empty, non-JSON, and non-object bodies all yield an empty map.
pub fn parse_body(raw: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::debug!("request body is not a JSON object, treating as empty");
            Map::new()
        }
        Err(e) => {
            if !raw.is_empty() {
                tracing::debug!(error = %e, "request body is not valid JSON, treating as empty");
            }
            Map::new()
        }
    }
}

fn first_text(body: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match body.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_amount(body: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .find_map(|key| parse_amount(body.get(*key)?).filter(|amount| *amount != 0))
}

/// Integer value of a JSON field, or None when it holds no number.
///
/// Strings use prefix parsing: surrounding whitespace is ignored and the
/// leading run of digits (with an optional sign) is taken, so `"50.9"` is 50
/// and `"12 IDR"` is 12. Numbers are truncated toward zero.
pub fn parse_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
        }),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match *s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let mut value: i64 = 0;
    for b in digits[..end].bytes() {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    #[test]
    fn test_extracts_primary_fields() {
        let notice = DonationNotice::from_body(
            &body(json!({
                "supporter_name": "Alice",
                "amount": "50",
                "support_message": "Go team!"
            })),
            1_700_000_000_000,
        );
        assert_eq!(notice.donor_name, "Alice");
        assert_eq!(notice.amount, 50);
        assert_eq!(notice.message, "Go team!");
        assert_eq!(notice.timestamp, 1_700_000_000_000);
        assert_eq!(notice.platform, "bagibagi");
    }

    #[test]
    fn test_falls_back_through_candidate_keys() {
        let notice = DonationNotice::from_body(
            &body(json!({
                "supporter_name": "",
                "donatur_name": "Budi",
                "amount": "not a number",
                "amount_raw": 25000,
                "message": "semangat"
            })),
            0,
        );
        assert_eq!(notice.donor_name, "Budi");
        assert_eq!(notice.amount, 25000);
        assert_eq!(notice.message, "semangat");
    }

    #[test]
    fn test_name_takes_priority_over_donatur_name() {
        let notice =
            DonationNotice::from_body(&body(json!({"name": "Citra", "donatur_name": "Dewi"})), 0);
        assert_eq!(notice.donor_name, "Citra");
    }

    #[test]
    fn test_defaults_for_empty_body() {
        let notice = DonationNotice::from_body(&Map::new(), 42);
        assert_eq!(notice.donor_name, "Anonymous");
        assert_eq!(notice.amount, 0);
        assert_eq!(notice.message, "");
    }

    #[test]
    fn test_unusable_types_fall_back() {
        let notice = DonationNotice::from_body(
            &body(json!({
                "supporter_name": null,
                "name": true,
                "amount": {"value": 10},
                "support_message": ["hi"]
            })),
            0,
        );
        assert_eq!(notice.donor_name, "Anonymous");
        assert_eq!(notice.amount, 0);
        assert_eq!(notice.message, "");
    }

    #[test]
    fn test_zero_amount_falls_through_to_raw() {
        let notice =
            DonationNotice::from_body(&body(json!({"amount": "0", "amount_raw": "15000"})), 0);
        assert_eq!(notice.amount, 15000);
    }

    #[test]
    fn test_parse_amount_prefix_semantics() {
        assert_eq!(parse_amount(&json!("50")), Some(50));
        assert_eq!(parse_amount(&json!("  50.9")), Some(50));
        assert_eq!(parse_amount(&json!("12 IDR")), Some(12));
        assert_eq!(parse_amount(&json!("-7")), Some(-7));
        assert_eq!(parse_amount(&json!("+8")), Some(8));
        assert_eq!(parse_amount(&json!("abc")), None);
        assert_eq!(parse_amount(&json!("")), None);
        assert_eq!(parse_amount(&json!("-")), None);
        assert_eq!(parse_amount(&json!(99.99)), Some(99));
        assert_eq!(parse_amount(&json!(-3.5)), Some(-3));
        assert_eq!(parse_amount(&json!(false)), None);
        assert_eq!(
            parse_amount(&json!("99999999999999999999999")),
            Some(i64::MAX)
        );
    }

    #[test]
    fn test_extraction_is_pure_apart_from_timestamp() {
        let input = body(json!({"name": "Eka", "amount": "10", "message": "hi"}));
        let first = DonationNotice::from_body(&input, 1);
        let second = DonationNotice::from_body(&input, 2);
        assert_ne!(first, second);
        assert_eq!(
            DonationNotice {
                timestamp: 0,
                ..first
            },
            DonationNotice {
                timestamp: 0,
                ..second
            }
        );
    }

    #[test]
    fn test_serialized_field_order() {
        let notice = DonationNotice::from_body(
            &body(json!({"supporter_name": "Alice", "amount": "50", "support_message": "Go team!"})),
            1000,
        );
        assert_eq!(
            serde_json::to_string(&notice).unwrap(),
            r#"{"donor_name":"Alice","amount":50,"message":"Go team!","timestamp":1000,"platform":"bagibagi"}"#
        );
    }

    #[test]
    fn test_parse_body_tolerates_garbage() {
        assert!(parse_body(b"").is_empty());
        assert!(parse_body(b"not json").is_empty());
        assert!(parse_body(b"[1,2,3]").is_empty());
        assert_eq!(parse_body(br#"{"name":"x"}"#).len(), 1);
    }
}
