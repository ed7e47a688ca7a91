//! Function primitives: memoization, timing gates and call combinators.
//!
//! Time-based primitives take a `Clock` (throttle) or run on the tokio
//! runtime they were created in (debounce, delay).

pub mod clock;
pub mod combinators;
pub mod debounce;
pub mod memoize;
pub mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use combinators::{after, before, compose, defer, delay, flip, flow, negate, once, partial, wrap};
pub use debounce::Debounced;
pub use memoize::{MemoStats, Memoized, MemoizedCallable};
pub use throttle::Throttled;
