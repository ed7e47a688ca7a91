use crate::Result;
use crate::core::callable::Callable;
use crate::error::UtilsError;
use crate::utils::{MAX_GENERATED_LEN, too_long};
use rand::Rng;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

pub fn identity(value: &Value) -> Value {
    value.clone()
}

/// Call `func` with each index in `0..n`, collecting the results
pub fn times(n: usize, func: &Callable) -> Result<Value> {
    if n > MAX_GENERATED_LEN {
        return Err(too_long("times"));
    }
    let results = (0..n)
        .map(|i| func.call1(&json!(i)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(results))
}

/// A callable that ignores its arguments and returns `value`
pub fn constant(value: Value) -> Callable {
    Callable::new(move |_| Ok(value.clone())).named("constant")
}

/// Current Unix time in milliseconds
pub fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Uniform integer in `min..=max`
pub fn random(min: i64, max: i64) -> Result<i64> {
    if min > max {
        return Err(UtilsError::InvalidValue {
            message: format!("random range is empty: {} > {}", min, max),
        }
        .into());
    }
    Ok(rand::thread_rng().gen_range(min..=max))
}

/// Source of process-unique identifiers.
///
/// Each generator owns its counter; two generators hand out overlapping ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `prefix` followed by the next counter value, starting at 1
    pub fn unique_id(&self, prefix: &str) -> String {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{}", prefix, id)
    }

    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
