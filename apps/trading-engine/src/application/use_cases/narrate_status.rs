//! Narrate Status Use Case
//!
//! Emits a status summary to the activity log on quiet ticks, suppressing
//! repeats until equity moves or the force interval elapses.

use std::sync::Arc;

use crate::application::ports::{StateStorePort, StoreError};
use crate::application::services::{TickJournal, TradeLedger};
use crate::domain::market::MarketSnapshot;
use crate::domain::narration::{NarratorPolicy, StatusSummary};
use crate::domain::shared::Timestamp;

/// Use case for deduplicated status summaries.
pub struct NarrateStatusUseCase<S: StateStorePort> {
    ledger: Arc<TradeLedger<S>>,
    policy: NarratorPolicy,
}

impl<S: StateStorePort> NarrateStatusUseCase<S> {
    /// Create a new NarrateStatusUseCase.
    pub const fn new(ledger: Arc<TradeLedger<S>>, policy: NarratorPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Execute the use case. Returns the summary when one was emitted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the ledger cannot be read or written.
    pub async fn execute(
        &self,
        signal: &str,
        snapshot: &MarketSnapshot,
        now: Timestamp,
        journal: &TickJournal,
    ) -> Result<Option<StatusSummary>, StoreError> {
        let positions = self.ledger.open_positions().await?;
        let summary = StatusSummary::build(signal, positions.values(), snapshot.equity, |s| {
            snapshot.price(s)
        });
        let fingerprint = summary.fingerprint();

        let mut record = self.ledger.narrator_record().await?;
        if !record.should_emit(&fingerprint, summary.equity, now, &self.policy) {
            tracing::debug!(fingerprint = %fingerprint, "Status unchanged, summary suppressed");
            return Ok(None);
        }

        journal.info(summary.message(), None);
        record.record_emission(fingerprint, summary.equity, now, &self.policy);
        self.ledger.save_narrator_record(&record).await?;
        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::LedgerCapacities;
    use crate::domain::position_lifecycle::position::tests::long_position;
    use crate::domain::shared::Symbol;
    use crate::infrastructure::persistence::InMemoryStateStore;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn t(minutes: i64) -> Timestamp {
        Timestamp::parse("2026-01-19T12:00:00Z")
            .unwrap()
            .plus(chrono::Duration::minutes(minutes))
    }

    fn snapshot(equity: Decimal) -> MarketSnapshot {
        let btc = Symbol::new("BTCUSDT");
        MarketSnapshot {
            as_of: t(0),
            equity,
            positions: vec![],
            universe: vec![btc.clone()],
            prices: BTreeMap::from([(btc, Some(dec!(97)))]),
            change_24h: BTreeMap::new(),
            indicators: BTreeMap::new(),
        }
    }

    fn use_case() -> (Arc<TradeLedger<InMemoryStateStore>>, NarrateStatusUseCase<InMemoryStateStore>) {
        let ledger = Arc::new(TradeLedger::new(
            Arc::new(InMemoryStateStore::new()),
            LedgerCapacities::default(),
        ));
        let use_case = NarrateStatusUseCase::new(Arc::clone(&ledger), NarratorPolicy::default());
        (ledger, use_case)
    }

    #[tokio::test]
    async fn repeats_are_suppressed_until_forced() {
        let (ledger, use_case) = use_case();
        let mut position = long_position("BTCUSDT", dec!(100), dec!(1));
        position.stop_loss_price = Some(dec!(95));
        ledger.upsert_position(position).await.unwrap();
        let journal = TickJournal::new();

        let first = use_case.execute("FLAT", &snapshot(dec!(997)), t(0), &journal).await.unwrap();
        let summary = first.unwrap();
        assert_eq!(summary.open_positions, 1);
        assert_eq!(summary.unrealized_pnl, dec!(-3));
        assert_eq!(journal.len(), 1);

        let repeat = use_case.execute("FLAT", &snapshot(dec!(997.5)), t(5), &journal).await.unwrap();
        assert!(repeat.is_none());
        assert_eq!(journal.len(), 1);

        let forced = use_case.execute("FLAT", &snapshot(dec!(997.5)), t(15), &journal).await.unwrap();
        assert!(forced.is_some());
        assert_eq!(ledger.narrator_record().await.unwrap().last_emitted_at, Some(t(15)));
    }

    #[tokio::test]
    async fn equity_move_beyond_threshold_emits() {
        let (_ledger, use_case) = use_case();
        let journal = TickJournal::new();

        use_case.execute("FLAT", &snapshot(dec!(1000)), t(0), &journal).await.unwrap();
        let moved = use_case.execute("FLAT", &snapshot(dec!(1002)), t(1), &journal).await.unwrap();
        assert!(moved.is_some());
        assert_eq!(journal.len(), 2);
    }
}
