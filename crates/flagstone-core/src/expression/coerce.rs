//! Scalar coercion shared by expression nodes.
//!
//! Sibling SDKs lean on their host language's implicit conversions; the
//! rules are reproduced here as explicit functions so every node
//! coerces identically. Falsy values are `false`, `0`, NaN, `""`,
//! `null`, and a missing property; arrays and objects are truthy even
//! when empty.

use serde_json::Value;

use super::Evaluated;

/// Truthiness of an evaluated scalar.
pub fn is_truthy(value: &Evaluated) -> bool {
    match value {
        Evaluated::Undefined | Evaluated::Null => false,
        Evaluated::Bool(b) => *b,
        Evaluated::Number(n) => !n.is_nan() && *n != 0.0,
        Evaluated::String(s) => !s.is_empty(),
        Evaluated::Json(_) => true,
    }
}

/// Numeric coercion. Anything without a numeric reading yields `0`,
/// never NaN; a NaN input (e.g. `Time` of garbage) also lands on `0`.
pub fn to_number(value: &Evaluated) -> f64 {
    match value {
        Evaluated::Number(n) if !n.is_nan() => *n,
        Evaluated::Bool(true) => 1.0,
        Evaluated::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// String coercion. Containers stringify to compact JSON.
pub fn to_string(value: &Evaluated) -> String {
    match value {
        Evaluated::Undefined => "undefined".to_string(),
        Evaluated::Null => "null".to_string(),
        Evaluated::Bool(b) => b.to_string(),
        Evaluated::Number(n) => format_number(*n),
        Evaluated::String(s) => s.clone(),
        Evaluated::Json(v) => v.to_string(),
    }
}

/// Integer-valued floats print without a fractional part, matching the
/// wire format's string-encoded numbers (`"25"`, not `"25.0"`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Evaluated scalar back to a JSON value, for `Property` lookups and
/// `Constant` payloads. `Undefined` and NaN have no JSON spelling and
/// map to null.
pub fn to_json(value: &Evaluated) -> Value {
    match value {
        Evaluated::Undefined | Evaluated::Null => Value::Null,
        Evaluated::Bool(b) => Value::Bool(*b),
        Evaluated::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Evaluated::String(s) => Value::String(s.clone()),
        Evaluated::Json(v) => v.clone(),
    }
}
