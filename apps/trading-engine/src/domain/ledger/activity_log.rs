//! Activity log entries surfaced through `getLogs`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{Symbol, Timestamp};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Normal progress.
    Info,
    /// Degraded but handled.
    Warn,
    /// Failed operation.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// One activity log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    /// When it happened.
    pub timestamp: Timestamp,
    /// Severity.
    pub level: LogLevel,
    /// Human readable message.
    pub message: String,
    /// Symbol context, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
}

impl ActivityLogEntry {
    /// New entry stamped `timestamp`.
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        level: LogLevel,
        message: impl Into<String>,
        symbol: Option<Symbol>,
    ) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            symbol,
        }
    }
}
