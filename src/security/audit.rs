use crate::Result;
use crate::error::StorageError;
use crate::storage::config::AuditConfig;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SEPARATOR: &str = " | ";

/// One parsed audit log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub message: String,
}

/// Append-only audit log.
///
/// Each entry is one line, `<RFC 3339 timestamp> | <EVENT_TYPE> | <message>`,
/// written and flushed under a mutex so concurrent writers never interleave.
#[derive(Debug)]
pub struct AuditLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLogger {
    /// Open `path` for appending, creating it and its parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let io_error = |source| StorageError::FileIo {
            path: path.to_string_lossy().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self> {
        Self::open(&config.log_file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush it
    pub fn log(&self, event_type: &str, message: &str) -> Result<AuditEntry> {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event_type: normalize_event_type(event_type),
            message: message.to_string(),
        };
        let line = format!(
            "{}{}{}{}{}\n",
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            SEPARATOR,
            entry.event_type,
            SEPARATOR,
            escape(&entry.message)
        );

        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| StorageError::FileIo {
                path: self.path.to_string_lossy().to_string(),
                source,
            })?;

        log::debug!("Audit entry written: {}", entry.event_type);
        Ok(entry)
    }
}

/// Parse every entry of an audit log file
pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| StorageError::FileIo {
        path: path.to_string_lossy().to_string(),
        source,
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(line).ok_or_else(|| StorageError::MalformedAuditEntry { line: i + 1 }.into()))
        .collect()
}

fn parse_line(line: &str) -> Option<AuditEntry> {
    let mut parts = line.splitn(3, SEPARATOR);
    let timestamp = DateTime::parse_from_rfc3339(parts.next()?).ok()?;
    let event_type = parts.next()?.to_string();
    let message = unescape(parts.next()?);
    Some(AuditEntry {
        timestamp: timestamp.with_timezone(&Utc),
        event_type,
        message,
    })
}

/// Upper-case, with separators and whitespace folded to `_`
fn normalize_event_type(event_type: &str) -> String {
    event_type
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() || c == '|' { '_' } else { c })
        .collect::<String>()
        .to_uppercase()
}

fn escape(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for c in message.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '|' => out.push_str("\\|"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
