pub use error::AppError;

/// Main architecture layers (dependency flow: CLI → Core → Utils)
pub mod cli; // Command-line interface
pub mod core; // Chain wrapper and dispatch table
pub mod storage; // Configuration persistence

/// Primitives usable on their own
pub mod function; // Memoize, throttle, debounce and combinators
pub mod security; // Validation, rate limiting and audit logging
pub mod template; // Safe template rendering

/// Support modules (used across layers)
pub mod display; // Output formatting
pub mod error; // Error handling
pub mod utils; // Shared utilities and helpers

pub use crate::core::{Arg, Callable, Chain, Iteratee, Registry};

pub type Result<T> = std::result::Result<T, AppError>;
