//! Runtime state mutated by every tick.

use serde::{Deserialize, Serialize};

use crate::domain::shared::Timestamp;

/// Singleton runtime record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeState {
    /// Start time of the last completed tick.
    pub last_tick_at: Option<Timestamp>,
    /// Error from the last tick, cleared on success.
    pub last_error: Option<String>,
    /// Oracle provider used on the last consult.
    pub last_provider: Option<String>,
    /// Oracle model used on the last consult.
    pub last_model: Option<String>,
    /// Time of the last submitted order; drives the cooldown.
    pub last_order_at: Option<Timestamp>,
    /// Last emitted signal ("LONG BTCUSDT", "FLAT", ...).
    pub last_signal: Option<String>,
    /// Completed ticks.
    pub tick_count: u64,
}

impl RuntimeState {
    /// Seconds until another order may be sent; zero when allowed.
    #[must_use]
    pub fn cooldown_remaining(&self, now: Timestamp, cooldown_secs: u64) -> i64 {
        let Some(last) = self.last_order_at else {
            return 0;
        };
        let cooldown = i64::try_from(cooldown_secs).unwrap_or(i64::MAX);
        (cooldown - now.seconds_since(last)).max(0)
    }

    /// Record an order submission.
    pub fn record_order(&mut self, at: Timestamp) {
        self.last_order_at = Some(at);
    }
}
