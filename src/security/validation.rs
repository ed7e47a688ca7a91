//! Input validation and sanitization
//!
//! Validators return the checked input so they compose inline:
//! `let name = sanitize_string(&raw, Some(64), Some("a-zA-Z "))?;`

use crate::Result;
use crate::core::callable::{Arg, Callable};
use crate::error::SecurityError;
use crate::utils::types::{ValueKind, kind_name};
use regex::Regex;
use serde_json::Value;

/// Return `value` if its kind is one of `expected`
pub fn validate_type<'a>(value: &'a Value, expected: &[ValueKind], param: &str) -> Result<&'a Value> {
    let actual = ValueKind::of(value);
    if expected.contains(&actual) {
        return Ok(value);
    }

    let expected = expected
        .iter()
        .map(ValueKind::name)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(SecurityError::InputValidation {
        param: param.to_string(),
        message: format!("expected {}, got {}", expected, actual.name()),
    }
    .into())
}

/// Return the callable inside `arg`, or fail when a plain value was passed
pub fn validate_callable<'a>(arg: &'a Arg, param: &str) -> Result<&'a Callable> {
    match arg {
        Arg::Callable(callable) => Ok(callable),
        Arg::Value(value) => Err(SecurityError::InputValidation {
            param: param.to_string(),
            message: format!("must be callable, got {}", kind_name(value)),
        }
        .into()),
    }
}

/// Trim `value`, then enforce a maximum length in characters and an optional
/// character class body (`allowed_chars` such as `a-zA-Z0-9_`).
pub fn sanitize_string(value: &Value, max_length: Option<usize>, allowed_chars: Option<&str>) -> Result<String> {
    let text = value.as_str().ok_or_else(|| SecurityError::Sanitization {
        message: format!("value must be a string, got {}", kind_name(value)),
    })?;
    let trimmed = text.trim();

    if let Some(max_length) = max_length.filter(|&max| max > 0) {
        if trimmed.chars().count() > max_length {
            return Err(SecurityError::Sanitization {
                message: format!("string exceeds maximum length of {}", max_length),
            }
            .into());
        }
    }

    if let Some(allowed) = allowed_chars.filter(|a| !a.is_empty()) {
        let pattern = Regex::new(&format!("^[{}]*$", allowed)).map_err(|e| SecurityError::Sanitization {
            message: format!("invalid allowed character class '{}': {}", allowed, e),
        })?;
        if !pattern.is_match(trimmed) {
            return Err(SecurityError::Sanitization {
                message: "string contains invalid characters".to_string(),
            }
            .into());
        }
    }

    Ok(trimmed.to_string())
}
