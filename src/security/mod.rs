//! Security helpers: call-rate gating, audit logging and input checks.

pub mod audit;
pub mod rate_limiter;
pub mod validation;

pub use audit::{AuditEntry, AuditLogger, read_entries};
pub use rate_limiter::{RateLimiter, RatePermit};
pub use validation::{sanitize_string, validate_callable, validate_type};
