//! Call-count and composition wrappers over `Callable`.

use crate::Result;
use crate::core::callable::Callable;
use crate::utils::types::is_truthy;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Run `func` on the first call only; later calls return `null`.
///
/// The flag is set before `func` runs, so concurrent and reentrant calls
/// return `null` immediately instead of waiting for the first call.
pub fn once(func: Callable) -> Callable {
    let called = AtomicBool::new(false);
    Callable::new(move |args| {
        if called.swap(true, Ordering::SeqCst) {
            return Ok(Value::Null);
        }
        func.call(args)
    })
    .named("once")
}

/// Run `func` on the first `n - 1` calls; from the nth call on, return `null`
pub fn before(n: usize, func: Callable) -> Callable {
    let count = AtomicUsize::new(0);
    Callable::new(move |args| {
        let call = count.fetch_add(1, Ordering::SeqCst) + 1;
        if call < n { func.call(args) } else { Ok(Value::Null) }
    })
    .named("before")
}

/// Return `null` until the nth call, then run `func` on every call
pub fn after(n: usize, func: Callable) -> Callable {
    let count = AtomicUsize::new(0);
    Callable::new(move |args| {
        let call = count.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= n.max(1) { func.call(args) } else { Ok(Value::Null) }
    })
    .named("after")
}

pub fn negate(predicate: Callable) -> Callable {
    Callable::new(move |args| Ok(Value::Bool(!is_truthy(&predicate.call(args)?))))
        .named("negate")
}

/// Prepend `bound` to the arguments of every call
pub fn partial(func: Callable, bound: Vec<Value>) -> Callable {
    Callable::new(move |args| {
        let mut all = Vec::with_capacity(bound.len() + args.len());
        all.extend_from_slice(&bound);
        all.extend_from_slice(args);
        func.call(&all)
    })
    .named("partial")
}

/// Call `wrapper` with `value` first, followed by the call's own arguments
pub fn wrap(value: Value, wrapper: Callable) -> Callable {
    partial(wrapper, vec![value]).named("wrap")
}

/// Call `func` with its arguments reversed
pub fn flip(func: Callable) -> Callable {
    Callable::new(move |args| {
        let reversed: Vec<Value> = args.iter().rev().cloned().collect();
        func.call(&reversed)
    })
    .named("flip")
}

/// Right-to-left composition: `compose([f, g])(x) == f(g(x))`
pub fn compose(funcs: Vec<Callable>) -> Callable {
    let mut funcs = funcs;
    funcs.reverse();
    flow(funcs).named("compose")
}

/// Left-to-right composition; the first function receives every argument
pub fn flow(funcs: Vec<Callable>) -> Callable {
    let funcs: Arc<[Callable]> = funcs.into();
    Callable::new(move |args| {
        let Some((first, rest)) = funcs.split_first() else {
            return Ok(args.first().cloned().unwrap_or(Value::Null));
        };
        rest.iter()
            .try_fold(first.call(args)?, |acc, func| func.call1(&acc))
    })
    .named("flow")
}

/// Sleep `wait` on the tokio timer, then call `func`
pub async fn delay(wait: Duration, func: &Callable, args: &[Value]) -> Result<Value> {
    tokio::time::sleep(wait).await;
    func.call(args)
}

/// Run `func` on the tokio runtime once the current task yields.
///
/// Must be called from within a runtime.
pub fn defer(func: Callable, args: Vec<Value>) -> JoinHandle<Result<Value>> {
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        func.call(&args)
    })
}
