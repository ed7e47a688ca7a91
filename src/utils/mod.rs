//! Utils module - the static utility functions
//!
//! Every function here is usable on its own; `core::registry` binds them into
//! the dispatch table that the chain wrapper resolves names against.

use crate::error::{AppError, UtilsError};

/// Largest string or array a generating utility may produce
pub const MAX_GENERATED_LEN: usize = 16 * 1024 * 1024;

pub(crate) fn too_long(function: &str) -> AppError {
    UtilsError::InvalidValue {
        message: format!("{} output exceeds {} elements", function, MAX_GENERATED_LEN),
    }
    .into()
}

/// Collection helpers over arrays (and object values)
pub mod array;

/// Run-length string codec
pub mod compress;

/// Logger setup and verbose console output
pub mod logging;

/// Identity, counters, clocks and randomness
pub mod misc;

/// Mapping helpers and dotted-path lookup
pub mod object;

/// Case conversion, width-aware padding and HTML escaping
pub mod string;

/// Type predicates, truthiness and value ordering
pub mod types;
