//! Collection helpers over JSON arrays.
//!
//! Every function takes the collection first, like the chain wrapper binds it.
//! Objects are accepted wherever iterating "the values" makes sense
//! (`map`, `filter`, `group_by`, ...). Errors from user callables propagate
//! unchanged; find-style functions signal a miss with `null` or `-1`.

use crate::Result;
use crate::core::callable::{Callable, Iteratee};
use crate::error::{AppError, UtilsError};
use crate::utils::object;
use crate::utils::{MAX_GENERATED_LEN, too_long};
use crate::utils::types::{compare_values, is_equal, is_truthy, kind_name, to_display_string};
use rand::seq::SliceRandom;
use serde_json::{Map, Value, json};

fn type_mismatch(function: &str, expected: &str, value: &Value) -> UtilsError {
    UtilsError::TypeMismatch {
        function: function.to_string(),
        expected: expected.to_string(),
        actual: kind_name(value).to_string(),
    }
}

/// Borrow the array behind `value`
pub(crate) fn as_array<'a>(function: &str, value: &'a Value) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| type_mismatch(function, "array", value).into())
}

/// Elements of an array, or values of an object
fn elements<'a>(function: &str, value: &'a Value) -> Result<Vec<&'a Value>> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(map) => Ok(map.values().collect()),
        other => Err(type_mismatch(function, "array or object", other).into()),
    }
}

pub fn map(collection: &Value, iteratee: &Iteratee) -> Result<Value> {
    let mapped = elements("map", collection)?
        .into_iter()
        .map(|item| iteratee.apply(item))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(mapped))
}

pub fn filter(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    let mut kept = Vec::new();
    for item in elements("filter", collection)? {
        if is_truthy(&predicate.apply(item)?) {
            kept.push(item.clone());
        }
    }
    Ok(Value::Array(kept))
}

pub fn reject(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    let mut kept = Vec::new();
    for item in elements("reject", collection)? {
        if !is_truthy(&predicate.apply(item)?) {
            kept.push(item.clone());
        }
    }
    Ok(Value::Array(kept))
}

fn fold<'a>(
    function: &str,
    mut items: impl Iterator<Item = &'a Value>,
    reducer: &Callable,
    initial: Option<Value>,
) -> Result<Value> {
    let mut acc = match initial {
        Some(value) => value,
        None => match items.next() {
            Some(first) => first.clone(),
            None => {
                return Err(UtilsError::InvalidValue {
                    message: format!("{} of empty collection with no initial value", function),
                }
                .into());
            }
        },
    };
    for item in items {
        acc = reducer.call(&[acc, item.clone()])?;
    }
    Ok(acc)
}

/// Left fold. Without `initial`, the first element seeds the accumulator.
pub fn reduce(collection: &Value, reducer: &Callable, initial: Option<Value>) -> Result<Value> {
    let items = elements("reduce", collection)?;
    fold("reduce", items.into_iter(), reducer, initial)
}

pub fn reduce_right(
    collection: &Value,
    reducer: &Callable,
    initial: Option<Value>,
) -> Result<Value> {
    let items = elements("reduce_right", collection)?;
    fold("reduce_right", items.into_iter().rev(), reducer, initial)
}

/// First element passing the predicate, or `null`
pub fn find(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    for item in elements("find", collection)? {
        if is_truthy(&predicate.apply(item)?) {
            return Ok(item.clone());
        }
    }
    Ok(Value::Null)
}

pub fn find_last(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    for item in elements("find_last", collection)?.into_iter().rev() {
        if is_truthy(&predicate.apply(item)?) {
            return Ok(item.clone());
        }
    }
    Ok(Value::Null)
}

/// Index of the first element passing the predicate, or `-1`
pub fn find_index(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    for (index, item) in as_array("find_index", collection)?.iter().enumerate() {
        if is_truthy(&predicate.apply(item)?) {
            return Ok(json!(index));
        }
    }
    Ok(json!(-1))
}

pub fn some(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    for item in elements("some", collection)? {
        if is_truthy(&predicate.apply(item)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

pub fn every(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    for item in elements("every", collection)? {
        if !is_truthy(&predicate.apply(item)?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn contains(collection: &Value, target: &Value) -> Result<Value> {
    let found = elements("contains", collection)?
        .into_iter()
        .any(|item| is_equal(item, target));
    Ok(Value::Bool(found))
}

/// Drop duplicates, keeping the first occurrence
pub fn uniq(collection: &Value) -> Result<Value> {
    let mut seen: Vec<Value> = Vec::new();
    for item in as_array("uniq", collection)? {
        if !seen.iter().any(|s| is_equal(s, item)) {
            seen.push(item.clone());
        }
    }
    Ok(Value::Array(seen))
}

/// `n == 1` returns the element itself (`null` when empty), otherwise an array
pub fn first(collection: &Value, n: usize) -> Result<Value> {
    let items = as_array("first", collection)?;
    if n == 1 {
        return Ok(items.first().cloned().unwrap_or(Value::Null));
    }
    Ok(Value::Array(items.iter().take(n).cloned().collect()))
}

pub fn last(collection: &Value, n: usize) -> Result<Value> {
    let items = as_array("last", collection)?;
    if n == 1 {
        return Ok(items.last().cloned().unwrap_or(Value::Null));
    }
    let start = items.len().saturating_sub(n);
    Ok(Value::Array(items[start..].to_vec()))
}

/// Everything but the last `n` elements
pub fn initial(collection: &Value, n: usize) -> Result<Value> {
    let items = as_array("initial", collection)?;
    let end = items.len().saturating_sub(n);
    Ok(Value::Array(items[..end].to_vec()))
}

/// Everything but the first `n` elements
pub fn rest(collection: &Value, n: usize) -> Result<Value> {
    let items = as_array("rest", collection)?;
    Ok(Value::Array(items.iter().skip(n).cloned().collect()))
}

pub fn compact(collection: &Value) -> Result<Value> {
    let items = as_array("compact", collection)?;
    Ok(Value::Array(
        items.iter().filter(|v| is_truthy(v)).cloned().collect(),
    ))
}

pub fn without(collection: &Value, values: &[Value]) -> Result<Value> {
    let items = as_array("without", collection)?;
    Ok(Value::Array(
        items
            .iter()
            .filter(|item| !values.iter().any(|v| is_equal(v, item)))
            .cloned()
            .collect(),
    ))
}

pub fn pluck(collection: &Value, key: &str) -> Result<Value> {
    let items = elements("pluck", collection)?;
    Ok(Value::Array(
        items
            .into_iter()
            .map(|item| object::get(item, key, Value::Null))
            .collect(),
    ))
}

/// Flatten nested arrays `depth` levels deep; `None` flattens completely
pub fn flatten(collection: &Value, depth: Option<usize>) -> Result<Value> {
    fn walk(items: &[Value], depth: Option<usize>, out: &mut Vec<Value>) {
        for item in items {
            match item {
                Value::Array(inner) if depth != Some(0) => {
                    walk(inner, depth.map(|d| d - 1), out);
                }
                other => out.push(other.clone()),
            }
        }
    }
    let mut out = Vec::new();
    walk(as_array("flatten", collection)?, depth, &mut out);
    Ok(Value::Array(out))
}

pub fn chunk(collection: &Value, size: usize) -> Result<Value> {
    if size == 0 {
        return Err(UtilsError::InvalidValue {
            message: "chunk size must be greater than 0".to_string(),
        }
        .into());
    }
    let items = as_array("chunk", collection)?;
    Ok(Value::Array(
        items
            .chunks(size)
            .map(|c| Value::Array(c.to_vec()))
            .collect(),
    ))
}

/// `[passing, failing]`
pub fn partition(collection: &Value, predicate: &Iteratee) -> Result<Value> {
    let mut pass = Vec::new();
    let mut fail = Vec::new();
    for item in elements("partition", collection)? {
        if is_truthy(&predicate.apply(item)?) {
            pass.push(item.clone());
        } else {
            fail.push(item.clone());
        }
    }
    Ok(json!([pass, fail]))
}

pub fn group_by(collection: &Value, iteratee: &Iteratee) -> Result<Value> {
    let mut groups = Map::new();
    for item in elements("group_by", collection)? {
        let key = to_display_string(&iteratee.apply(item)?);
        let bucket = groups
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(members) = bucket {
            members.push(item.clone());
        }
    }
    Ok(Value::Object(groups))
}

pub fn count_by(collection: &Value, iteratee: &Iteratee) -> Result<Value> {
    let mut counts = Map::new();
    for item in elements("count_by", collection)? {
        let key = to_display_string(&iteratee.apply(item)?);
        let count = counts.get(&key).and_then(Value::as_u64).unwrap_or(0);
        counts.insert(key, json!(count + 1));
    }
    Ok(Value::Object(counts))
}

/// Later items win when two share a key
pub fn index_by(collection: &Value, iteratee: &Iteratee) -> Result<Value> {
    let mut index = Map::new();
    for item in elements("index_by", collection)? {
        let key = to_display_string(&iteratee.apply(item)?);
        index.insert(key, item.clone());
    }
    Ok(Value::Object(index))
}

/// Stable sort by the iteratee's result
pub fn sort_by(collection: &Value, iteratee: &Iteratee) -> Result<Value> {
    let mut keyed = elements("sort_by", collection)?
        .into_iter()
        .map(|item| Ok((iteratee.apply(item)?, item.clone())))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort_by(|(a, _), (b, _)| compare_values(a, b));
    Ok(Value::Array(keyed.into_iter().map(|(_, item)| item).collect()))
}

/// Pair up elements by position, truncating to the shortest array
pub fn zip(arrays: &[Value]) -> Result<Value> {
    let arrays = arrays
        .iter()
        .map(|a| as_array("zip", a))
        .collect::<Result<Vec<_>>>()?;
    let shortest = arrays.iter().map(|a| a.len()).min().unwrap_or(0);
    Ok(Value::Array(
        (0..shortest)
            .map(|i| Value::Array(arrays.iter().map(|a| a[i].clone()).collect()))
            .collect(),
    ))
}

pub fn unzip(collection: &Value) -> Result<Value> {
    let rows = as_array("unzip", collection)?;
    zip(rows)
}

pub fn difference(collection: &Value, others: &[Value]) -> Result<Value> {
    let mut excluded = Vec::new();
    for other in others {
        excluded.extend(as_array("difference", other)?.iter().cloned());
    }
    without(collection, &excluded)
}

pub fn union(arrays: &[Value]) -> Result<Value> {
    let mut merged = Vec::new();
    for array in arrays {
        merged.extend(as_array("union", array)?.iter().cloned());
    }
    uniq(&Value::Array(merged))
}

pub fn intersection(arrays: &[Value]) -> Result<Value> {
    let Some((head, tail)) = arrays.split_first() else {
        return Ok(Value::Array(Vec::new()));
    };
    let tail = tail
        .iter()
        .map(|a| as_array("intersection", a))
        .collect::<Result<Vec<_>>>()?;
    let common = as_array("intersection", &uniq(head)?)?
        .iter()
        .filter(|item| tail.iter().all(|other| other.iter().any(|o| is_equal(o, item))))
        .cloned()
        .collect();
    Ok(Value::Array(common))
}

pub fn last_index_of(collection: &Value, target: &Value) -> Result<Value> {
    let items = as_array("last_index_of", collection)?;
    Ok(items
        .iter()
        .rposition(|item| is_equal(item, target))
        .map_or(json!(-1), |i| json!(i)))
}

/// `range(stop)` or `range(start, stop, step)`; `step` may be negative but not zero
pub fn range(start: i64, stop: Option<i64>, step: i64) -> Result<Vec<i64>> {
    if step == 0 {
        return Err(UtilsError::InvalidValue {
            message: "range step must not be zero".to_string(),
        }
        .into());
    }
    let (start, stop) = match stop {
        Some(stop) => (start, stop),
        None => (0, start),
    };
    let mut out = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        if out.len() == MAX_GENERATED_LEN {
            return Err(too_long("range"));
        }
        out.push(current);
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(out)
}

fn extreme(
    function: &str,
    collection: &Value,
    iteratee: &Iteratee,
    wanted: std::cmp::Ordering,
) -> Result<Value> {
    let mut best: Option<(Value, &Value)> = None;
    for item in elements(function, collection)? {
        let key = iteratee.apply(item)?;
        let replace = match &best {
            None => true,
            Some((best_key, _)) => compare_values(&key, best_key) == wanted,
        };
        if replace {
            best = Some((key, item));
        }
    }
    Ok(best.map_or(Value::Null, |(_, item)| item.clone()))
}

pub fn max_value(collection: &Value, iteratee: &Iteratee) -> Result<Value> {
    extreme("max_value", collection, iteratee, std::cmp::Ordering::Greater)
}

pub fn min_value(collection: &Value, iteratee: &Iteratee) -> Result<Value> {
    extreme("min_value", collection, iteratee, std::cmp::Ordering::Less)
}

/// Element count for arrays and objects, character count for strings
pub fn size(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        Value::Null => 0,
        Value::Bool(_) | Value::Number(_) => 1,
    }
}

pub fn shuffle(collection: &Value) -> Result<Value> {
    let mut items = as_array("shuffle", collection)?.clone();
    items.shuffle(&mut rand::thread_rng());
    Ok(Value::Array(items))
}

/// `n == 1` returns one random element (`null` when empty), otherwise up to `n` distinct picks
pub fn sample(collection: &Value, n: usize) -> Result<Value> {
    let items = as_array("sample", collection)?;
    let mut rng = rand::thread_rng();
    if n == 1 {
        return Ok(items.choose(&mut rng).cloned().unwrap_or(Value::Null));
    }
    Ok(Value::Array(
        items.choose_multiple(&mut rng, n).cloned().collect(),
    ))
}

/// Median of the union of two sorted slices in O(log(min(m, n))).
///
/// Returns `None` when both slices are empty.
pub fn find_median_sorted_arrays(nums1: &[f64], nums2: &[f64]) -> Option<f64> {
    let (short, long) = if nums1.len() <= nums2.len() {
        (nums1, nums2)
    } else {
        (nums2, nums1)
    };
    let (m, n) = (short.len(), long.len());
    let total = m + n;
    if total == 0 {
        return None;
    }
    let half = total.div_ceil(2);

    let (mut lo, mut hi) = (0usize, m);
    while lo <= hi {
        let cut1 = (lo + hi) / 2;
        let cut2 = half - cut1;

        let left1 = if cut1 == 0 { f64::NEG_INFINITY } else { short[cut1 - 1] };
        let right1 = if cut1 == m { f64::INFINITY } else { short[cut1] };
        let left2 = if cut2 == 0 { f64::NEG_INFINITY } else { long[cut2 - 1] };
        let right2 = if cut2 == n { f64::INFINITY } else { long[cut2] };

        if left1 <= right2 && left2 <= right1 {
            let left_max = left1.max(left2);
            if total % 2 == 1 {
                return Some(left_max);
            }
            return Some((left_max + right1.min(right2)) / 2.0);
        } else if left1 > right2 {
            hi = cut1 - 1;
        } else {
            lo = cut1 + 1;
        }
    }
    None
}

/// Numeric view of a JSON array, for the median helper
pub fn as_f64_vec(function: &str, value: &Value) -> Result<Vec<f64>> {
    as_array(function, value)?
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| AppError::from(type_mismatch(function, "array of numbers", item)))
        })
        .collect()
}
