//! Type predicates and value ordering helpers
//!
//! The predicates mirror the classic `is_*` family over JSON values. The
//! ordering helper gives a total order across kinds so `sort_by`, `max_value`
//! and `min_value` behave deterministically on mixed data.

use serde_json::Value;
use std::cmp::Ordering;

/// Kinds of JSON value, used by validators and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

pub fn kind_name(value: &Value) -> &'static str {
    ValueKind::of(value).name()
}

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

pub fn is_number(value: &Value) -> bool {
    value.is_number()
}

pub fn is_array(value: &Value) -> bool {
    value.is_array()
}

pub fn is_object(value: &Value) -> bool {
    value.is_object()
}

pub fn is_boolean(value: &Value) -> bool {
    value.is_boolean()
}

pub fn is_null(value: &Value) -> bool {
    value.is_null()
}

/// JSON numbers cannot hold NaN or infinities, so every number is finite
pub fn is_finite(value: &Value) -> bool {
    value.as_f64().is_some_and(f64::is_finite)
}

/// True for anything that is not a number
pub fn is_nan(value: &Value) -> bool {
    !value.is_number()
}

/// Empty strings, arrays and objects, and `null`
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Deep structural equality. Integers and floats compare by numeric value.
pub fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| is_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| is_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Total order over values: null < boolean < number < string < array < object
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.total_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()),
        _ => ValueKind::of(left).cmp(&ValueKind::of(right)),
    }
}

/// String form used when a value becomes a map key or template output
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
