use crate::Result;
use crate::core::callable::Callable;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
}

type MemoFn<K, V> = dyn Fn(&Memoized<K, V>, &K) -> V + Send + Sync;

/// Unbounded memoizer for a typed function.
///
/// Clones share one cache. The cache lock is released before the wrapped
/// function runs, so recursive calls through the memo never deadlock; two
/// threads racing on the same cold key may both compute, and the first
/// stored value wins.
pub struct Memoized<K, V> {
    storage: Arc<RwLock<HashMap<K, V>>>,
    func: Arc<MemoFn<K, V>>,
    counters: Arc<Counters>,
}

impl<K, V> Clone for Memoized<K, V> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            func: Arc::clone(&self.func),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<K, V> fmt::Debug for Memoized<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("misses", &self.counters.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl<K, V> Memoized<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        Self::recursive(move |_, key| func(key))
    }

    /// Memoize a function that receives the memo itself for recursive calls
    pub fn recursive<F>(func: F) -> Self
    where
        F: Fn(&Memoized<K, V>, &K) -> V + Send + Sync + 'static,
    {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            func: Arc::new(func),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Cached value for `key`, computing and storing it on a miss
    pub fn call(&self, key: &K) -> V {
        if let Some(value) = self.lookup(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let value = (self.func)(self, key);

        match self.storage.write() {
            Ok(mut storage) => storage.entry(key.clone()).or_insert(value).clone(),
            Err(_) => value,
        }
    }

    fn lookup(&self, key: &K) -> Option<V> {
        self.storage.read().ok()?.get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.storage
            .read()
            .map(|storage| storage.contains_key(key))
            .unwrap_or(false)
    }

    pub fn cache_len(&self) -> usize {
        self.storage.read().map(|storage| storage.len()).unwrap_or(0)
    }

    /// Number of times the wrapped function actually ran
    pub fn misses(&self) -> usize {
        self.counters.misses.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            entries: self.cache_len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.misses(),
        }
    }
}

type KeywordFn = dyn Fn(&[Value], &Map<String, Value>) -> Result<Value> + Send + Sync;

/// Memoizer for dynamic functions taking positional and keyword arguments.
///
/// Arguments of any shape, arrays and objects included, are folded into a
/// canonical JSON key: positional order matters, keyword order does not.
/// Failed calls are not cached.
#[derive(Clone)]
pub struct MemoizedCallable {
    storage: Arc<RwLock<HashMap<String, Value>>>,
    func: Arc<KeywordFn>,
    counters: Arc<Counters>,
}

impl fmt::Debug for MemoizedCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedCallable")
            .field("entries", &self.cache_len())
            .finish()
    }
}

impl MemoizedCallable {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value], &Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            func: Arc::new(func),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Memoize a positional-only callable
    pub fn from_callable(callable: Callable) -> Self {
        Self::new(move |args, _| callable.call(args))
    }

    pub fn call(&self, args: &[Value], kwargs: &Map<String, Value>) -> Result<Value> {
        let key = cache_key(args, kwargs);
        if let Some(value) = self.storage.read().ok().and_then(|s| s.get(&key).cloned()) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Memo miss for key {}", key);
        let value = (self.func)(args, kwargs)?;

        match self.storage.write() {
            Ok(mut storage) => Ok(storage.entry(key).or_insert(value).clone()),
            Err(_) => Ok(value),
        }
    }

    pub fn call_positional(&self, args: &[Value]) -> Result<Value> {
        self.call(args, &Map::new())
    }

    /// Positional view usable anywhere a `Callable` is expected
    pub fn as_callable(&self) -> Callable {
        let memo = self.clone();
        Callable::new(move |args| memo.call_positional(args)).named("memoized")
    }

    pub fn cache_len(&self) -> usize {
        self.storage.read().map(|storage| storage.len()).unwrap_or(0)
    }

    pub fn misses(&self) -> usize {
        self.counters.misses.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> MemoStats {
        MemoStats {
            entries: self.cache_len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.misses(),
        }
    }
}

/// `[positional, [[key, value], ...]]` with keyword pairs and nested object keys sorted
fn cache_key(args: &[Value], kwargs: &Map<String, Value>) -> String {
    let mut out = String::from("[[");
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_canonical(arg, &mut out);
    }
    out.push_str("],[");

    let mut pairs: Vec<_> = kwargs.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    for (i, (k, v)) in pairs.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('[');
        write_canonical(&Value::String(k.clone()), &mut out);
        out.push(',');
        write_canonical(v, &mut out);
        out.push(']');
    }
    out.push_str("]]");
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UtilsError;
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_memoized_calls_function_once_per_key() {
        let memo = Memoized::new(|n: &u64| n * 2);
        for _ in 0..5 {
            assert_eq!(memo.call(&21), 42);
        }
        assert_eq!(memo.misses(), 1);
        assert_eq!(memo.stats(), MemoStats { entries: 1, hits: 4, misses: 1 });
    }

    #[test]
    fn test_recursive_fibonacci() {
        let fib = Memoized::recursive(|memo: &Memoized<u64, u64>, n: &u64| {
            if *n < 2 { *n } else { memo.call(&(n - 1)) + memo.call(&(n - 2)) }
        });
        assert_eq!(fib.call(&90), 2_880_067_194_370_816_120);
        // one miss per distinct n in 0..=90
        assert_eq!(fib.misses(), 91);
        assert_eq!(fib.cache_len(), 91);
    }

    #[test]
    fn test_clones_share_cache_across_threads() {
        let memo = Memoized::new(|s: &String| s.len());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let memo = memo.clone();
                thread::spawn(move || memo.call(&"hello".to_string()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 5);
        }
        assert_eq!(memo.cache_len(), 1);
        assert!(memo.contains_key(&"hello".to_string()));
    }

    #[test]
    fn test_keyword_order_does_not_affect_key() {
        let memo = MemoizedCallable::new(|args, kwargs| {
            Ok(json!({"args": args, "kw": kwargs.len()}))
        });
        let a = json!({"x": 1, "y": 2}).as_object().unwrap().clone();
        let mut b = Map::new();
        b.insert("y".into(), json!(2));
        b.insert("x".into(), json!(1));

        memo.call(&[json!(1)], &a).unwrap();
        memo.call(&[json!(1)], &b).unwrap();
        assert_eq!(memo.misses(), 1);

        memo.call(&[json!(2)], &a).unwrap();
        assert_eq!(memo.misses(), 2);
    }

    #[test]
    fn test_structural_arguments_are_cached() {
        let memo = MemoizedCallable::from_callable(Callable::new(|args| {
            Ok(json!(args[0].as_array().map_or(0, Vec::len)))
        }));
        assert_eq!(memo.call_positional(&[json!([1, 2, 3])]).unwrap(), json!(3));
        assert_eq!(memo.call_positional(&[json!([1, 2, 3])]).unwrap(), json!(3));
        assert_eq!(memo.call_positional(&[json!([3, 2, 1])]).unwrap(), json!(3));
        assert_eq!(memo.misses(), 2);
        assert_eq!(memo.as_callable().call(&[json!([1, 2, 3])]).unwrap(), json!(3));
        assert_eq!(memo.misses(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let memo = MemoizedCallable::new(|_, _| {
            Err(UtilsError::Callback { message: "nope".into() }.into())
        });
        assert!(memo.call_positional(&[json!(1)]).is_err());
        assert!(memo.call_positional(&[json!(1)]).is_err());
        assert_eq!(memo.misses(), 2);
        assert_eq!(memo.cache_len(), 0);
    }

    #[test]
    fn test_cache_key_is_canonical() {
        let kw = json!({"b": [1, {"z": 1, "a": 2}], "a": null});
        assert_eq!(
            cache_key(&[json!("s"), json!(1.5)], kw.as_object().unwrap()),
            r#"[["s",1.5],[["a",null],["b",[1,{"a":2,"z":1}]]]]"#
        );
    }
}
