use crate::Result;
use crate::error::ChainError;
use crate::utils::object;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

type DynFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Shared, thread-safe dynamic function over JSON values.
///
/// Errors returned by the inner function are handed back to the caller untouched.
#[derive(Clone)]
pub struct Callable {
    name: Option<Arc<str>>,
    inner: Arc<DynFn>,
}

impl Callable {
    /// Wrap a function taking the full argument slice
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: None,
            inner: Arc::new(func),
        }
    }

    /// Wrap a one-argument function. Missing arguments are passed as `null`.
    pub fn unary<F>(func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(move |args| func(args.first().unwrap_or(&Value::Null)))
    }

    /// Wrap a two-argument function, used by reducers (`acc`, `item`)
    pub fn binary<F>(func: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(move |args| {
            func(
                args.first().unwrap_or(&Value::Null),
                args.get(1).unwrap_or(&Value::Null),
            )
        })
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.inner)(args)
    }

    pub fn call1(&self, arg: &Value) -> Result<Value> {
        (self.inner)(std::slice::from_ref(arg))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Callable({})", name),
            None => write!(f, "Callable(<anonymous>)"),
        }
    }
}

/// An argument passed through the dispatch table
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    Callable(Callable),
}

impl Arg {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) => Some(value),
            Arg::Callable(_) => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Arg::Callable(callable) => Some(callable),
            Arg::Value(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Value(value) => crate::utils::types::kind_name(value),
            Arg::Callable(_) => "function",
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<Callable> for Arg {
    fn from(callable: Callable) -> Self {
        Arg::Callable(callable)
    }
}

/// Underscore-style iteratee shorthand.
///
/// A callable is used as-is, a string looks up that property, an object
/// matches every listed key, and `null` is the identity.
#[derive(Debug, Clone)]
pub enum Iteratee {
    Identity,
    Property(String),
    Matches(Map<String, Value>),
    Func(Callable),
}

impl Iteratee {
    pub fn from_arg(function: &str, position: usize, arg: Option<&Arg>) -> Result<Self> {
        match arg {
            None | Some(Arg::Value(Value::Null)) => Ok(Iteratee::Identity),
            Some(Arg::Callable(callable)) => Ok(Iteratee::Func(callable.clone())),
            Some(Arg::Value(Value::String(key))) => Ok(Iteratee::Property(key.clone())),
            Some(Arg::Value(Value::Object(attrs))) => Ok(Iteratee::Matches(attrs.clone())),
            Some(other) => Err(ChainError::InvalidArgument {
                function: function.to_string(),
                position,
                message: format!(
                    "expected a function, property name or matcher object, got {}",
                    other.kind()
                ),
            }
            .into()),
        }
    }

    pub fn apply(&self, item: &Value) -> Result<Value> {
        match self {
            Iteratee::Identity => Ok(item.clone()),
            Iteratee::Property(key) => Ok(object::get(item, key, Value::Null)),
            Iteratee::Matches(attrs) => Ok(Value::Bool(object::is_match(item, attrs))),
            Iteratee::Func(callable) => callable.call1(item),
        }
    }
}

impl From<Callable> for Iteratee {
    fn from(callable: Callable) -> Self {
        Iteratee::Func(callable)
    }
}
