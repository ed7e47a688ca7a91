//! Run-length string codec.
//!
//! `compress("aaabbc") == "3a2b1c"`. Runs longer than nine characters are
//! split (`"a" * 12` encodes as `"9a3a"`) so every emitted count is a single
//! digit. `decompress` accepts multi-digit counts as well.
//!
//! Round-tripping is exact for text without ASCII digits; a digit in the
//! input is indistinguishable from a count once encoded.

use crate::Result;
use crate::error::UtilsError;
use crate::utils::{MAX_GENERATED_LEN, too_long};

const MAX_RUN: usize = 9;

pub fn compress(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        let mut count = 1;
        while count < MAX_RUN && chars.peek() == Some(&ch) {
            chars.next();
            count += 1;
        }
        out.push_str(&count.to_string());
        out.push(ch);
    }
    out
}

/// Expand `<count><char>` runs. A trailing count with no character is an error.
pub fn decompress(encoded: &str) -> Result<String> {
    let mut out = String::new();
    let mut produced: usize = 0;
    let mut count: Option<usize> = None;

    for ch in encoded.chars() {
        if let Some(digit) = ch.to_digit(10) {
            let next = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|c| c.checked_add(digit as usize))
                .ok_or_else(|| UtilsError::InvalidValue {
                    message: "run length overflows".to_string(),
                })?;
            count = Some(next);
        } else {
            let run = count.take().unwrap_or(0);
            produced = produced
                .checked_add(run)
                .filter(|&total| total <= MAX_GENERATED_LEN)
                .ok_or_else(|| too_long("decompress"))?;
            out.extend(std::iter::repeat_n(ch, run));
        }
    }

    if count.is_some() {
        return Err(UtilsError::InvalidValue {
            message: format!("dangling run length at end of '{}'", encoded),
        }
        .into());
    }
    Ok(out)
}
