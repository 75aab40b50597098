//! Ledger Bounded Context
//!
//! Value types persisted by the trade ledger: bounded histories, equity
//! samples, runtime state and activity log entries.

pub mod activity_log;
pub mod bounded_history;
pub mod equity;
pub mod runtime_state;

pub use activity_log::{ActivityLogEntry, LogLevel};
pub use bounded_history::BoundedHistory;
pub use equity::{AppendOutcome, EquityAnchor, EquitySample, append_sample, days_between, merge_series};
pub use runtime_state::RuntimeState;
