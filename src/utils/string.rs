use crate::Result;
use crate::utils::{MAX_GENERATED_LEN, too_long};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Split into words on punctuation, whitespace, case changes and digit runs.
///
/// `"tooLegit2Quit"` gives `["too", "Legit", "2", "Quit"]`, and acronyms stay
/// whole: `"XMLHttpRequest"` gives `["XML", "Http", "Request"]`.
pub fn words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && ch.is_uppercase())
                || (prev.is_numeric() != ch.is_numeric())
                || (prev.is_uppercase()
                    && ch.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
                out.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Upper-case the first character, lower-case the rest
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str().to_lowercase()),
        None => String::new(),
    }
}

pub fn camel_case(text: &str) -> String {
    let parts = words(&text.replace('\'', ""));
    let mut out = String::new();
    for (i, word) in parts.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

pub fn snake_case(text: &str) -> String {
    separator_case(text, "_")
}

pub fn kebab_case(text: &str) -> String {
    separator_case(text, "-")
}

fn separator_case(text: &str, separator: &str) -> String {
    words(&text.replace('\'', ""))
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Capitalize every space-separated word
pub fn title_case(text: &str) -> String {
    text.split(' ').map(capitalize).collect::<Vec<_>>().join(" ")
}

pub fn swap_case(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            if c.is_uppercase() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                c.to_uppercase().collect::<Vec<_>>()
            }
        })
        .collect()
}

pub fn reverse(text: &str) -> String {
    text.chars().rev().collect()
}

/// `text` repeated `count` times, refused past `MAX_GENERATED_LEN` bytes
pub fn repeat(text: &str, count: usize) -> Result<String> {
    text.len()
        .checked_mul(count)
        .filter(|&total| total <= MAX_GENERATED_LEN)
        .ok_or_else(|| too_long("repeat"))?;
    Ok(text.repeat(count))
}

/// Truncate to `max_width` display columns including `omission`
pub fn truncate(text: &str, max_width: usize, omission: &str) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let omission_width = omission.width();
    if max_width <= omission_width {
        return omission.chars().take(max_width).collect();
    }

    let target_width = max_width - omission_width;
    let mut result = String::new();
    let mut current_width = 0;

    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if current_width + ch_width > target_width {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }

    result.push_str(omission);
    result
}

/// Right-pad with spaces to `width` display columns
pub fn pad_end(text: &str, width: usize) -> String {
    let text_width = text.width();
    if text_width >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - text_width))
    }
}

pub fn pad_start(text: &str, width: usize) -> String {
    let text_width = text.width();
    if text_width >= width {
        text.to_string()
    } else {
        format!("{}{}", " ".repeat(width - text_width), text)
    }
}

/// Center within `width` columns; odd padding goes to the right
pub fn pad(text: &str, width: usize) -> String {
    let text_width = text.width();
    if text_width >= width {
        return text.to_string();
    }

    let padding = width - text_width;
    let left_padding = padding / 2;
    let right_padding = padding - left_padding;

    format!(
        "{}{}{}",
        " ".repeat(left_padding),
        text,
        " ".repeat(right_padding)
    )
}

/// Lower-case, ASCII-only, hyphen-separated
pub fn slugify(text: &str) -> String {
    words(text)
        .iter()
        .map(|w| {
            w.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

const HTML_ESCAPES: [(char, &str); 6] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#x27;"),
    ('`', "&#x60;"),
];

/// HTML-escape ampersands, angle brackets, quotes and backticks
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match HTML_ESCAPES.iter().find(|(c, _)| *c == ch) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(ch),
        }
    }
    out
}

pub fn unescape(text: &str) -> String {
    let mut out = text.to_string();
    // `&amp;` last so "&amp;lt;" decodes to "&lt;" rather than "<"
    for (ch, entity) in HTML_ESCAPES.iter().rev() {
        out = out.replace(entity, &ch.to_string());
    }
    out.replace("&#39;", "'")
}
