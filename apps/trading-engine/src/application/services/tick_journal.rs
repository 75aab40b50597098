//! Per-tick activity journal.
//!
//! Every entry is emitted as a `tracing` event immediately and buffered for
//! the activity log, which the orchestrator flushes once at tick end.

use parking_lot::Mutex;

use crate::domain::ledger::{ActivityLogEntry, LogLevel};
use crate::domain::shared::{Symbol, Timestamp};

/// Buffer of activity log entries for one tick.
#[derive(Debug, Default)]
pub struct TickJournal {
    entries: Mutex<Vec<ActivityLogEntry>>,
}

impl TickJournal {
    /// Empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an INFO entry.
    pub fn info(&self, message: impl Into<String>, symbol: Option<&Symbol>) {
        self.record(LogLevel::Info, message.into(), symbol);
    }

    /// Record a WARN entry.
    pub fn warn(&self, message: impl Into<String>, symbol: Option<&Symbol>) {
        self.record(LogLevel::Warn, message.into(), symbol);
    }

    /// Record an ERROR entry.
    pub fn error(&self, message: impl Into<String>, symbol: Option<&Symbol>) {
        self.record(LogLevel::Error, message.into(), symbol);
    }

    fn record(&self, level: LogLevel, message: String, symbol: Option<&Symbol>) {
        let sym = symbol.map_or("", Symbol::as_str);
        match level {
            LogLevel::Info => tracing::info!(symbol = sym, "{message}"),
            LogLevel::Warn => tracing::warn!(symbol = sym, "{message}"),
            LogLevel::Error => tracing::error!(symbol = sym, "{message}"),
        }
        self.entries.lock().push(ActivityLogEntry::new(
            Timestamp::now(),
            level,
            message,
            symbol.cloned(),
        ));
    }

    /// Take all buffered entries.
    pub fn drain(&self) -> Vec<ActivityLogEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Number of buffered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
