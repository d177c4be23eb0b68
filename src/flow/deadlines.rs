/// Deadline rule sanitizer
///
/// Normalizes a client-supplied deadline specification into its stored shape.
/// Two input shapes are accepted:
/// - `{ "field": "<column>", "days": <n> }`
/// - legacy `{ "<any key>": <n>, ... }`
/// Entries failing their type/range check are dropped; nothing left means `None`.

use serde_json::{Map, Number, Value};

pub fn sanitize(raw: Option<&Value>) -> Option<Value> {
    let object = match raw {
        Some(Value::Object(object)) => object,
        _ => return None,
    };

    let mut clean = Map::new();

    if object.contains_key("field") || object.contains_key("days") {
        if let Some(Value::String(field)) = object.get("field") {
            let field = field.trim();
            if !field.is_empty() {
                clean.insert("field".to_string(), Value::String(field.to_string()));
            }
        }
        if let Some(days) = object.get("days").and_then(non_negative) {
            clean.insert("days".to_string(), days);
        }
    } else {
        for (key, value) in object {
            if let Some(days) = non_negative(value) {
                clean.insert(key.clone(), days);
            }
        }
    }

    if clean.is_empty() {
        None
    } else {
        Some(Value::Object(clean))
    }
}

/// Coerce to a finite number >= 0
fn non_negative(value: &Value) -> Option<Value> {
    let number = to_number(value)?;

    if !number.is_finite() || number < 0.0 {
        return None;
    }

    if number.fract() == 0.0 && number <= u64::MAX as f64 {
        Some(Value::Number(Number::from(number as u64)))
    } else {
        Number::from_f64(number).map(Value::Number)
    }
}

/// Loose numeric conversion
///
/// `null` and blank strings are 0, booleans are 0/1, strings may be decimal or
/// `0x`/`0o`/`0b` literals, single-element lists convert their element.
/// `None` means the value has no numeric reading.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        Value::Array(values) => match values.as_slice() {
            [] => Some(0.0),
            [single] => to_number(single),
            _ => None,
        },
        Value::Object(_) => None,
    }
}

fn parse_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(0.0);
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.starts_with('+') {
            return None;
        }
        return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
    }

    // Rust also accepts "inf"/"nan" spellings; those never pass the finite check
    s.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_shape_is_trimmed_and_coerced() {
        assert_eq!(
            sanitize(Some(&json!({"field": " due ", "days": "5"}))),
            Some(json!({"field": "due", "days": 5}))
        );
        assert_eq!(
            sanitize(Some(&json!({"field": "due", "days": 1.5}))),
            Some(json!({"field": "due", "days": 1.5}))
        );
    }

    #[test]
    fn new_shape_keeps_surviving_half() {
        assert_eq!(
            sanitize(Some(&json!({"field": "   ", "days": 3}))),
            Some(json!({"days": 3}))
        );
        assert_eq!(
            sanitize(Some(&json!({"field": "due", "days": -2}))),
            Some(json!({"field": "due"}))
        );
        assert_eq!(sanitize(Some(&json!({"field": 7, "days": "soon"}))), None);
    }

    #[test]
    fn legacy_shape_drops_invalid_entries() {
        assert_eq!(sanitize(Some(&json!({"a": -1, "b": 3}))), Some(json!({"b": 3})));
        assert_eq!(
            sanitize(Some(&json!({"review": "2", "x": [1, 2], "y": {"n": 1}}))),
            Some(json!({"review": 2}))
        );
        assert_eq!(sanitize(Some(&json!({"a": "nope"}))), None);
        assert_eq!(sanitize(Some(&json!({"a": "-0x10"}))), None);
        assert_eq!(sanitize(Some(&json!({"a": "0x+1"}))), None);
    }

    #[test]
    fn loose_values_coerce_like_numbers() {
        assert_eq!(sanitize(Some(&json!({"a": null}))), Some(json!({"a": 0})));
        assert_eq!(sanitize(Some(&json!({"a": ""}))), Some(json!({"a": 0})));
        assert_eq!(sanitize(Some(&json!({"a": "   "}))), Some(json!({"a": 0})));
        assert_eq!(sanitize(Some(&json!({"a": true}))), Some(json!({"a": 1})));
        assert_eq!(sanitize(Some(&json!({"a": false}))), Some(json!({"a": 0})));
        assert_eq!(sanitize(Some(&json!({"a": "0x10"}))), Some(json!({"a": 16})));
        assert_eq!(sanitize(Some(&json!({"a": "0o17"}))), Some(json!({"a": 15})));
        assert_eq!(sanitize(Some(&json!({"a": "0b101"}))), Some(json!({"a": 5})));
        assert_eq!(sanitize(Some(&json!({"a": " 2.5 "}))), Some(json!({"a": 2.5})));
        assert_eq!(sanitize(Some(&json!({"a": ["7"]}))), Some(json!({"a": 7})));
        assert_eq!(sanitize(Some(&json!({"a": []}))), Some(json!({"a": 0})));
        assert_eq!(sanitize(Some(&json!({"a": "Infinity"}))), None);
    }

    #[test]
    fn null_days_counts_as_zero() {
        assert_eq!(
            sanitize(Some(&json!({"field": "due", "days": null}))),
            Some(json!({"field": "due", "days": 0}))
        );
        assert_eq!(sanitize(Some(&json!({"days": ""}))), Some(json!({"days": 0})));
    }

    #[test]
    fn non_objects_and_empty_become_none() {
        assert_eq!(sanitize(Some(&json!({}))), None);
        assert_eq!(sanitize(Some(&Value::Null)), None);
        assert_eq!(sanitize(None), None);
        assert_eq!(sanitize(Some(&json!([1, 2]))), None);
        assert_eq!(sanitize(Some(&json!("3"))), None);
    }
}
