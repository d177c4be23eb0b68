/// Column codecs shared by the flow and group stores
///
/// Payload columns hold serialized JSON text. Reads must tolerate legacy rows
/// (NULL, empty text, doubly-encoded JSON, garbage) without failing the request.

use crate::error::StoreResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Stored timestamp layout (UTC, whole seconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decode a JSON payload column
///
/// `fallback` is returned for NULL, empty or unparseable text and for a stored
/// JSON `null`. A JSON string whose content is itself JSON is unwrapped once.
/// `context` names the column in the warning emitted on a parse failure.
pub fn decode_json(raw: Option<&str>, fallback: Value, context: &str) -> Value {
    let text = match raw {
        Some(text) if !text.trim().is_empty() => text,
        _ => return fallback,
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => fallback,
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Null) => fallback,
            Ok(nested) => nested,
            Err(_) => Value::String(inner),
        },
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("⚠️ Unparseable JSON in {} ({}), using empty default", context, e);
            fallback
        }
    }
}

/// Encode a payload value for storage
pub fn encode_json(value: &Value) -> StoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Encode an optional payload, keeping SQL NULL for `None`
pub fn encode_optional_json(value: Option<&Value>) -> StoreResult<Option<String>> {
    value.map(encode_json).transpose()
}

/// Current time in the stored layout
pub fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Normalize a client-supplied timestamp to the stored layout
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// plain dates and epoch milliseconds. Anything else (or nothing) becomes the
/// current time. Sub-second precision is truncated.
pub fn normalize_timestamp(raw: Option<&Value>) -> String {
    raw.and_then(parse_timestamp)
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(now_timestamp)
}

fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .filter(|ms| ms.is_finite())
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
                    return Some(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}
