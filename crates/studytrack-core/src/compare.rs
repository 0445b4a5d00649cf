//! Deep structural comparison of JSON values.
//!
//! Equality is defined over a canonical form: object keys are sorted,
//! integral floats collapse to integers, and everything else is compared
//! exactly. Sequences stay order-sensitive.

use serde_json::{Map, Number, Value};

/// Returns `true` if `actual` matches `expected` structurally.
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    canonicalize(actual) == canonicalize(expected)
}

/// Canonical serialized form, used for display and equality.
pub fn canonical_string(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Rebuild `value` with sorted object keys and normalized numbers.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, val) in entries {
                sorted.insert(key.clone(), canonicalize(val));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Number(n) => Value::Number(normalize_number(n)),
        other => other.clone(),
    }
}

fn normalize_number(n: &Number) -> Number {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            // 2^53: beyond this, integral floats no longer map to exact integers.
            if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                return Number::from(f as i64);
            }
        }
        return n.clone();
    }
    match n.as_i64() {
        Some(i) => Number::from(i),
        None => n.clone(),
    }
}
