//! Narrator dedup record and emission policy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Timestamp;

/// Narrator rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorPolicy {
    /// Emit at least this often even when nothing changed.
    pub force_emit_interval_minutes: u32,
    /// Equity move that counts as a change.
    pub equity_threshold_usd: Decimal,
    /// Recent fingerprints remembered.
    pub hash_history: usize,
}

impl Default for NarratorPolicy {
    fn default() -> Self {
        Self {
            force_emit_interval_minutes: 15,
            equity_threshold_usd: Decimal::ONE,
            hash_history: 10,
        }
    }
}

/// Persisted narrator record (`status:last`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NarratorRecord {
    /// Recent fingerprints, oldest first.
    pub recent_hashes: Vec<String>,
    /// Last emission time.
    pub last_emitted_at: Option<Timestamp>,
    /// Equity at the last emission.
    pub last_equity: Option<Decimal>,
}

impl NarratorRecord {
    /// Decide whether a summary should be emitted.
    ///
    /// Suppressed only when the fingerprint was seen recently, equity moved
    /// no more than the threshold and the force interval has not elapsed.
    #[must_use]
    pub fn should_emit(
        &self,
        fingerprint: &str,
        equity: Decimal,
        now: Timestamp,
        policy: &NarratorPolicy,
    ) -> bool {
        let seen = self.recent_hashes.iter().any(|h| h == fingerprint);
        let equity_quiet = self
            .last_equity
            .is_some_and(|last| (equity - last).abs() <= policy.equity_threshold_usd);
        let within_interval = self.last_emitted_at.is_some_and(|last| {
            now.seconds_since(last) < i64::from(policy.force_emit_interval_minutes) * 60
        });

        !(seen && equity_quiet && within_interval)
    }

    /// Record an emission.
    pub fn record_emission(
        &mut self,
        fingerprint: String,
        equity: Decimal,
        now: Timestamp,
        policy: &NarratorPolicy,
    ) {
        self.recent_hashes.retain(|h| *h != fingerprint);
        self.recent_hashes.push(fingerprint);
        let keep = policy.hash_history.max(1);
        if self.recent_hashes.len() > keep {
            let excess = self.recent_hashes.len() - keep;
            self.recent_hashes.drain(..excess);
        }
        self.last_emitted_at = Some(now);
        self.last_equity = Some(equity);
    }
}
