//! Storage layer for unicore
//!
//! TOML configuration under the OS config directory.

use crate::error::StorageError;

pub mod config;

type Result<T> = std::result::Result<T, StorageError>;
