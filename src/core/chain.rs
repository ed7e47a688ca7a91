use crate::Result;
use crate::core::callable::{Arg, Callable, Iteratee};
use crate::core::registry::Registry;
use serde_json::{Value, json};
use std::sync::Arc;

/// Fluent wrapper around a held value.
///
/// Every step dispatches through the registry and returns a new `Chain`
/// holding the result; the receiver is never modified. Unknown names and
/// argument mismatches surface as `ChainError`s.
#[derive(Debug, Clone)]
pub struct Chain {
    value: Value,
    registry: Arc<Registry>,
}

impl Chain {
    /// Wrap `value` over the shared builtin registry
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_registry(value, Registry::shared())
    }

    pub fn with_registry(value: impl Into<Value>, registry: Arc<Registry>) -> Self {
        Self {
            value: value.into(),
            registry,
        }
    }

    /// Dispatch `name` by string with the held value bound first
    pub fn invoke(&self, name: &str, args: &[Arg]) -> Result<Chain> {
        let value = self.registry.call(name, &self.value, args)?;
        Ok(self.wrap(value))
    }

    /// Unwrap the held value
    pub fn value(self) -> Value {
        self.value
    }

    pub fn value_ref(&self) -> &Value {
        &self.value
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    fn wrap(&self, value: Value) -> Chain {
        Chain {
            value,
            registry: Arc::clone(&self.registry),
        }
    }

    fn with_iteratee(&self, name: &str, iteratee: Iteratee) -> Result<Chain> {
        let arg = match iteratee {
            Iteratee::Identity => Arg::Value(Value::Null),
            Iteratee::Property(key) => Arg::Value(Value::String(key)),
            Iteratee::Matches(attrs) => Arg::Value(Value::Object(attrs)),
            Iteratee::Func(callable) => Arg::Callable(callable),
        };
        self.invoke(name, &[arg])
    }

    pub fn map(&self, iteratee: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("map", iteratee.into())
    }

    pub fn filter(&self, predicate: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("filter", predicate.into())
    }

    pub fn reject(&self, predicate: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("reject", predicate.into())
    }

    pub fn find(&self, predicate: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("find", predicate.into())
    }

    pub fn sort_by(&self, iteratee: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("sort_by", iteratee.into())
    }

    pub fn group_by(&self, iteratee: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("group_by", iteratee.into())
    }

    pub fn count_by(&self, iteratee: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("count_by", iteratee.into())
    }

    pub fn index_by(&self, iteratee: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("index_by", iteratee.into())
    }

    pub fn partition(&self, predicate: impl Into<Iteratee>) -> Result<Chain> {
        self.with_iteratee("partition", predicate.into())
    }

    pub fn reduce(&self, reducer: Callable, initial: Option<Value>) -> Result<Chain> {
        let mut args = vec![Arg::Callable(reducer)];
        args.extend(initial.map(Arg::Value));
        self.invoke("reduce", &args)
    }

    /// Call `interceptor` with the held value and keep the value unchanged
    pub fn tap(&self, interceptor: Callable) -> Result<Chain> {
        self.invoke("tap", &[Arg::Callable(interceptor)])
    }

    pub fn uniq(&self) -> Result<Chain> {
        self.invoke("uniq", &[])
    }

    pub fn compact(&self) -> Result<Chain> {
        self.invoke("compact", &[])
    }

    pub fn flatten(&self) -> Result<Chain> {
        self.invoke("flatten", &[])
    }

    pub fn first(&self) -> Result<Chain> {
        self.invoke("first", &[])
    }

    pub fn last(&self) -> Result<Chain> {
        self.invoke("last", &[])
    }

    pub fn take(&self, n: usize) -> Result<Chain> {
        self.invoke("first", &[json!(n).into()])
    }

    pub fn initial(&self) -> Result<Chain> {
        self.invoke("initial", &[])
    }

    pub fn rest(&self) -> Result<Chain> {
        self.invoke("rest", &[])
    }

    pub fn pluck(&self, key: &str) -> Result<Chain> {
        self.invoke("pluck", &[json!(key).into()])
    }

    pub fn chunk(&self, size: usize) -> Result<Chain> {
        self.invoke("chunk", &[json!(size).into()])
    }

    pub fn without(&self, values: &[Value]) -> Result<Chain> {
        let args: Vec<Arg> = values.iter().cloned().map(Arg::Value).collect();
        self.invoke("without", &args)
    }

    pub fn keys(&self) -> Result<Chain> {
        self.invoke("keys", &[])
    }

    pub fn values(&self) -> Result<Chain> {
        self.invoke("values", &[])
    }

    pub fn pick(&self, keys: &[&str]) -> Result<Chain> {
        self.invoke("pick", &[json!(keys).into()])
    }

    pub fn omit(&self, keys: &[&str]) -> Result<Chain> {
        self.invoke("omit", &[json!(keys).into()])
    }
}
