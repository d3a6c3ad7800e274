//! Log entry structure

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;

/// A single rendered log record.
///
/// Entries are immutable once built: the logger creates one per `log` call,
/// clones it into every chain, and the dispatcher drops it after delivery.
/// The message is carried verbatim; text destinations render it through
/// [`escaped_message`](Self::escaped_message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    level: LogLevel,
    message: String,
    timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            level,
            message: message.as_ref().to_owned(),
            timestamp: Utc::now(),
        }
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// The message exactly as it was logged
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Message for line-oriented text output
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences so
    /// one entry always renders as exactly one line, which keeps a logged
    /// value from forging extra log lines.
    pub fn escaped_message(&self) -> Cow<'_, str> {
        if !self.message.contains(['\n', '\r', '\t']) {
            return Cow::Borrowed(&self.message);
        }
        Cow::Owned(
            self.message
                .replace('\n', "\\n")
                .replace('\r', "\\r")
                .replace('\t', "\\t"),
        )
    }
}
