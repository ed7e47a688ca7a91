//! Dispatch layer: dynamic callables, the name-to-function registry and the
//! fluent `Chain` wrapper built on top of it.

pub mod builtins;
pub mod callable;
pub mod chain;
pub mod registry;

pub use callable::{Arg, Callable, Iteratee};
pub use chain::Chain;
pub use registry::{Arity, Operation, Registry};
