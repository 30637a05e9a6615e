//! Pipeline log and notification broadcasting.
//!
//! Every import, export and restore reports its progress and its outcome
//! through a process-wide broadcast channel. Top-level success and error
//! entries double as the dashboard's transient notifications; detail lines
//! (skipped rows, removed records) are nested with an indent. Every entry is
//! also mirrored to stderr so stdout stays free for exported data.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tokio::sync::broadcast;

/// Entries a slow subscriber may fall behind before it starts losing them
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn marker(self) -> &'static str {
        match self {
            LogLevel::Info => "  ",
            LogLevel::Success => "✓",
            LogLevel::Warning => "⚠️",
            LogLevel::Error => "❌",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level for detail lines (skipped rows etc.)
    #[serde(default)]
    pub indent: u8,
    pub logged_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            logged_at: Utc::now(),
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Whether the entry is an operation outcome worth a toast.
    pub fn is_notification(&self) -> bool {
        self.indent == 0 && matches!(self.level, LogLevel::Success | LogLevel::Error)
    }
}

/// Process-wide broadcaster used by the `log_*` helpers
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Mirror an entry to stderr and hand it to every subscriber.
    pub fn log(&self, entry: LogEntry) {
        eprintln!(
            "{}   {} {}",
            "   ".repeat(entry.indent as usize),
            entry.level.marker(),
            entry.message
        );

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_warning_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg).with_indent(indent));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

/// Broadcast the error of a failed operation, then pass the result through.
///
/// ```rust,ignore
/// log_failure("Task import", import(store, text))
/// ```
pub fn log_failure<T, E: Display>(operation: &str, result: Result<T, E>) -> Result<T, E> {
    if let Err(e) = &result {
        log_error(format!("{} failed: {}", operation, e));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_subscriber_receives_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::new(LogLevel::Success, "Imported 3 tasks"));
        broadcaster.log(LogEntry::new(LogLevel::Warning, "Row 4 skipped").with_indent(1));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, LogLevel::Success);
        assert_eq!(first.message, "Imported 3 tasks");
        assert!(first.is_notification());

        let second = rx.try_recv().unwrap();
        assert_eq!(second.indent, 1);
        assert!(!second.is_notification());
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let json = serde_json::to_value(LogEntry::new(LogLevel::Warning, "2 rows skipped")).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["indent"], 0);
        assert!(json["loggedAt"].is_string());
    }

    #[test]
    fn test_log_failure_broadcasts_error() {
        let mut rx = LOG_BROADCASTER.subscribe();

        let ok: Result<u8, String> = log_failure("Noop", Ok(1));
        assert_eq!(ok, Ok(1));
        let err: Result<u8, String> = log_failure("Disk sync", Err("quota exceeded".to_string()));
        assert!(err.is_err());

        let mut errors = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(entry) if entry.level == LogLevel::Error => errors.push(entry.message),
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(errors.contains(&"Disk sync failed: quota exceeded".to_string()));
        assert!(!errors.iter().any(|m| m.starts_with("Noop")));
    }
}
