use crate::Result;
use crate::core::builtins;
use crate::core::callable::{Arg, Callable};
use crate::error::ChainError;
use crate::utils::misc::IdGenerator;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Signature of every dispatchable operation: held value first, then the call's arguments
pub type OperationFn = Arc<dyn Fn(&Value, &[Arg]) -> Result<Value> + Send + Sync>;

/// Accepted argument counts, not counting the held value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "{}..={}", min, max),
            Arity::AtLeast(min) => write!(f, "{}+", min),
        }
    }
}

/// A named entry of the dispatch table
#[derive(Clone)]
pub struct Operation {
    name: String,
    arity: Arity,
    summary: String,
    func: OperationFn,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Check the argument count, then run the operation
    pub fn call(&self, held: &Value, args: &[Arg]) -> Result<Value> {
        if !self.arity.accepts(args.len()) {
            return Err(ChainError::ArityMismatch {
                function: self.name.clone(),
                expected: self.arity.to_string(),
                actual: args.len(),
            }
            .into());
        }
        (self.func)(held, args)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

static BUILTIN: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::builtin()));

/// Name-to-function dispatch table.
///
/// New entries become callable through every `Chain` built on this registry,
/// without touching the wrapper.
#[derive(Clone, Default)]
pub struct Registry {
    operations: BTreeMap<String, Operation>,
}

impl Registry {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding every builtin utility
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtins::install(&mut registry);
        registry
    }

    /// Shared immutable builtin table used by `Chain::new`
    pub fn shared() -> Arc<Registry> {
        Arc::clone(&BUILTIN)
    }

    /// Add or replace an operation
    pub fn register<F>(&mut self, name: &str, arity: Arity, summary: &str, func: F) -> &mut Self
    where
        F: Fn(&Value, &[Arg]) -> Result<Value> + Send + Sync + 'static,
    {
        if self.operations.contains_key(name) {
            log::debug!("Replacing registered operation '{}'", name);
        }
        self.operations.insert(
            name.to_string(),
            Operation {
                name: name.to_string(),
                arity,
                summary: summary.to_string(),
                func: Arc::new(func),
            },
        );
        self
    }

    /// Register plain callables; the held value is passed as their first argument.
    ///
    /// Mixed-in functions only accept value arguments.
    pub fn mixin<I>(&mut self, functions: I) -> &mut Self
    where
        I: IntoIterator<Item = (String, Callable)>,
    {
        for (name, callable) in functions {
            let fn_name = name.clone();
            self.register(&name, Arity::AtLeast(0), "mixin", move |held, args| {
                let mut values = Vec::with_capacity(args.len() + 1);
                values.push(held.clone());
                for (position, arg) in args.iter().enumerate() {
                    match arg {
                        Arg::Value(value) => values.push(value.clone()),
                        Arg::Callable(_) => {
                            return Err(ChainError::InvalidArgument {
                                function: fn_name.clone(),
                                position,
                                message: "mixins take value arguments only".to_string(),
                            }
                            .into());
                        }
                    }
                }
                callable.call(&values)
            });
        }
        self
    }

    /// Register `unique_id`, backed by the given generator
    pub fn with_id_generator(&mut self, ids: Arc<IdGenerator>) -> &mut Self {
        self.register(
            "unique_id",
            Arity::Exact(0),
            "Next id from the registry's generator, prefixed by the held string",
            move |held, _| {
                let prefix = held.as_str().unwrap_or_default();
                Ok(json!(ids.unique_id(prefix)))
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Registered names in order
    pub fn names(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Resolve `name` and call it with `held` bound as the first argument
    pub fn call(&self, name: &str, held: &Value, args: &[Arg]) -> Result<Value> {
        let operation = self.get(name).ok_or_else(|| ChainError::UnknownFunction {
            name: name.to_string(),
        })?;
        log::debug!("Dispatching '{}' with {} argument(s)", name, args.len());
        operation.call(held, args)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.operations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Exact(1).accepts(1));
        assert!(!Arity::Exact(1).accepts(0));
        assert!(Arity::Range(0, 2).accepts(2));
        assert!(!Arity::Range(0, 2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(5));
        assert_eq!(Arity::Range(1, 2).to_string(), "1..=2");
    }

    #[test]
    fn test_builtin_table_is_populated() {
        let registry = Registry::builtin();
        for name in ["map", "filter", "reduce", "group_by", "first", "compress", "template"] {
            assert!(registry.contains(name), "missing builtin '{}'", name);
        }
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_call_unknown_and_arity() {
        let registry = Registry::builtin();
        let err = registry.call("nope", &json!([]), &[]).unwrap_err();
        assert!(matches!(
            err,
            AppError::Chain(ChainError::UnknownFunction { ref name }) if name == "nope"
        ));

        let err = registry.call("map", &json!([1]), &[]).unwrap_err();
        assert!(matches!(err, AppError::Chain(ChainError::ArityMismatch { .. })));
    }

    #[test]
    fn test_register_and_replace() {
        let mut registry = Registry::new();
        registry.register("answer", Arity::Exact(0), "first", |_, _| Ok(json!(41)));
        registry.register("answer", Arity::Exact(0), "second", |_, _| Ok(json!(42)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("answer").unwrap().summary(), "second");
        assert_eq!(registry.call("answer", &Value::Null, &[]).unwrap(), json!(42));
    }

    #[test]
    fn test_mixin_binds_held_value_first() {
        let mut registry = Registry::new();
        registry.mixin([(
            "custom_method".to_string(),
            Callable::new(|args| Ok(json!(args[0].as_i64().unwrap() * args.len() as i64))),
        )]);
        assert_eq!(
            registry
                .call("custom_method", &json!(5), &[json!("x").into()])
                .unwrap(),
            json!(10)
        );
        let callable_arg: Arg = Callable::unary(|v| Ok(v.clone())).into();
        assert!(registry.call("custom_method", &json!(5), &[callable_arg]).is_err());
    }

    #[test]
    fn test_id_generator_is_registry_owned() {
        let ids = Arc::new(IdGenerator::new());
        let mut registry = Registry::new();
        registry.with_id_generator(Arc::clone(&ids));
        assert_eq!(registry.call("unique_id", &json!("user_"), &[]).unwrap(), json!("user_1"));
        assert_eq!(registry.call("unique_id", &Value::Null, &[]).unwrap(), json!("2"));
        assert_eq!(ids.issued(), 2);
        assert!(!Registry::builtin().contains("unique_id"));
    }
}
