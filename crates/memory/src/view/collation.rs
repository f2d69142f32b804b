//! View key collation
//!
//! Keys sort by type first, then by value within a type:
//!
//! ```text
//! null < false < true < numbers < strings < arrays < objects
//! ```
//!
//! Arrays compare element by element, a shorter prefix first. Objects compare
//! as their sorted `(key, value)` pairs. Strings compare by code point rather
//! than by a locale-aware collation.

use serde_json::Value;
use std::cmp::Ordering;

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over JSON values
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut left: Vec<(&String, &Value)> = x.iter().collect();
            let mut right: Vec<(&String, &Value)> = y.iter().collect();
            left.sort_by(|a, b| a.0.cmp(b.0));
            right.sort_by(|a, b| a.0.cmp(b.0));
            for ((lk, lv), (rk, rv)) in left.iter().zip(right.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            left.len().cmp(&right.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Collation over possibly-missing values; missing sorts before everything
pub fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare(a, b),
    }
}
