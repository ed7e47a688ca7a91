//! Object (mapping) helpers

use crate::Result;
use crate::core::callable::Iteratee;
use crate::error::UtilsError;
use crate::utils::types::{is_equal, kind_name, to_display_string};
use serde_json::{Map, Value};

fn as_object<'a>(function: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        UtilsError::TypeMismatch {
            function: function.to_string(),
            expected: "object".to_string(),
            actual: kind_name(value).to_string(),
        }
        .into()
    })
}

pub fn keys(value: &Value) -> Result<Value> {
    let map = as_object("keys", value)?;
    Ok(Value::Array(
        map.keys().map(|k| Value::String(k.clone())).collect(),
    ))
}

pub fn values(value: &Value) -> Result<Value> {
    let map = as_object("values", value)?;
    Ok(Value::Array(map.values().cloned().collect()))
}

/// `[[key, value], ...]`
pub fn pairs(value: &Value) -> Result<Value> {
    let map = as_object("pairs", value)?;
    Ok(Value::Array(
        map.iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
            .collect(),
    ))
}

/// Swap keys and values; values are stringified to become keys
pub fn invert(value: &Value) -> Result<Value> {
    let map = as_object("invert", value)?;
    Ok(Value::Object(
        map.iter()
            .map(|(k, v)| (to_display_string(v), Value::String(k.clone())))
            .collect(),
    ))
}

pub fn pick(value: &Value, wanted: &[String]) -> Result<Value> {
    let map = as_object("pick", value)?;
    Ok(Value::Object(
        map.iter()
            .filter(|(k, _)| wanted.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    ))
}

pub fn omit(value: &Value, unwanted: &[String]) -> Result<Value> {
    let map = as_object("omit", value)?;
    Ok(Value::Object(
        map.iter()
            .filter(|(k, _)| !unwanted.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    ))
}

/// Resolve a dotted path (`user.address.city`, `items.0`). Misses yield `default`.
pub fn get(value: &Value, path: &str, default: Value) -> Value {
    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(found) => current = found,
            None => return default,
        }
    }
    current.clone()
}

pub fn has(value: &Value, path: &str) -> bool {
    let mut current = value;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(found) => current = found,
            None => return false,
        }
    }
    true
}

/// Fill keys that are missing or `null` from each source in turn
pub fn defaults(value: &Value, sources: &[Value]) -> Result<Value> {
    let mut out = as_object("defaults", value)?.clone();
    for source in sources {
        for (k, v) in as_object("defaults", source)? {
            let slot = out.entry(k.clone()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = v.clone();
            }
        }
    }
    Ok(Value::Object(out))
}

/// Shallow assign: later sources overwrite earlier keys
pub fn extend(value: &Value, sources: &[Value]) -> Result<Value> {
    let mut out = as_object("extend", value)?.clone();
    for source in sources {
        for (k, v) in as_object("extend", source)? {
            out.insert(k.clone(), v.clone());
        }
    }
    Ok(Value::Object(out))
}

/// Deep merge: nested objects merge recursively, anything else is replaced
pub fn merge(value: &Value, sources: &[Value]) -> Result<Value> {
    fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>) {
        for (k, v) in source {
            match (target.get_mut(k), v) {
                (Some(Value::Object(existing)), Value::Object(incoming)) => {
                    merge_into(existing, incoming);
                }
                _ => {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
    }

    let mut out = as_object("merge", value)?.clone();
    for source in sources {
        merge_into(&mut out, as_object("merge", source)?);
    }
    Ok(Value::Object(out))
}

/// Independent copy of `value`; later mutation of one never shows in the other
pub fn deep_copy(value: &Value) -> Value {
    value.clone()
}

/// Every key in `attrs` is present in `value` with a deeply equal value
pub fn is_match(value: &Value, attrs: &Map<String, Value>) -> bool {
    match value {
        Value::Object(map) => attrs
            .iter()
            .all(|(k, expected)| map.get(k).is_some_and(|actual| is_equal(actual, expected))),
        _ => attrs.is_empty(),
    }
}

pub fn map_values(value: &Value, iteratee: &Iteratee) -> Result<Value> {
    let map = as_object("map_values", value)?;
    let mut out = Map::new();
    for (k, v) in map {
        out.insert(k.clone(), iteratee.apply(v)?);
    }
    Ok(Value::Object(out))
}
