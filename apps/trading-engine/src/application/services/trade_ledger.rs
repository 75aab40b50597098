//! Trade Ledger & Equity Store
//!
//! Typed access to the persisted engine state on top of [`StateStorePort`].
//!
//! # Key layout
//!
//! | Key | Document |
//! |-----|----------|
//! | `config` | [`TradingConfig`] |
//! | `runtime` | [`RuntimeState`] |
//! | `positions:open` | symbol → [`OpenPosition`] |
//! | `trades:closed` | bounded [`ClosedTrade`] list, oldest first |
//! | `equity:rolling` | bounded [`EquitySample`] list |
//! | `equity:day:YYYY-MM-DD` | samples for one UTC day |
//! | `equity:anchor` | optional [`EquityAnchor`] |
//! | `logs` | bounded [`ActivityLogEntry`] list |
//! | `status:last` | [`NarratorRecord`] |

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{StateStorePort, StoreError};
use crate::domain::ledger::{
    ActivityLogEntry, AppendOutcome, BoundedHistory, EquityAnchor, EquitySample, RuntimeState,
    append_sample, days_between, merge_series,
};
use crate::domain::narration::NarratorRecord;
use crate::domain::position_lifecycle::{ClosedTrade, OpenPosition};
use crate::domain::risk_management::TradingConfig;
use crate::domain::shared::Symbol;

/// Store key for the trading config.
pub const CONFIG_KEY: &str = "config";
/// Store key for runtime state.
pub const RUNTIME_KEY: &str = "runtime";
/// Store key for the open-position map.
pub const OPEN_POSITIONS_KEY: &str = "positions:open";
/// Store key for closed trades.
pub const CLOSED_TRADES_KEY: &str = "trades:closed";
/// Store key for the rolling equity buffer.
pub const EQUITY_ROLLING_KEY: &str = "equity:rolling";
/// Store key for the equity anchor.
pub const EQUITY_ANCHOR_KEY: &str = "equity:anchor";
/// Store key for the activity log.
pub const LOGS_KEY: &str = "logs";
/// Store key for the narrator record.
pub const NARRATOR_KEY: &str = "status:last";

/// Store key of the equity archive partition for `day`.
#[must_use]
pub fn equity_day_key(day: NaiveDate) -> String {
    format!("equity:day:{}", day.format("%Y-%m-%d"))
}

/// History capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCapacities {
    /// Closed trades kept.
    pub closed_trades: usize,
    /// Rolling equity samples kept.
    pub equity: usize,
    /// Activity log entries kept.
    pub logs: usize,
}

impl Default for LedgerCapacities {
    fn default() -> Self {
        Self {
            closed_trades: 200,
            equity: 1440,
            logs: 500,
        }
    }
}

/// Typed ledger over a key/value store.
pub struct TradeLedger<S: StateStorePort> {
    store: Arc<S>,
    capacities: LedgerCapacities,
}

impl<S: StateStorePort> TradeLedger<S> {
    /// Create a ledger.
    #[must_use]
    pub const fn new(store: Arc<S>, capacities: LedgerCapacities) -> Self {
        Self { store, capacities }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.put(key, value).await
    }

    // ---------------------------------------------------------------------
    // Config & runtime
    // ---------------------------------------------------------------------

    /// Load the trading config, writing defaults on first run.
    pub async fn load_config(&self) -> Result<TradingConfig, StoreError> {
        if let Some(config) = self.read(CONFIG_KEY).await? {
            return Ok(config);
        }
        let config = TradingConfig::default();
        self.write(CONFIG_KEY, &config).await?;
        tracing::info!("Wrote default trading config");
        Ok(config)
    }

    /// Overwrite the trading config.
    pub async fn save_config(&self, config: &TradingConfig) -> Result<(), StoreError> {
        self.write(CONFIG_KEY, config).await
    }

    /// Load runtime state (default when absent).
    pub async fn load_runtime(&self) -> Result<RuntimeState, StoreError> {
        Ok(self.read(RUNTIME_KEY).await?.unwrap_or_default())
    }

    /// Overwrite runtime state.
    pub async fn save_runtime(&self, runtime: &RuntimeState) -> Result<(), StoreError> {
        self.write(RUNTIME_KEY, runtime).await
    }

    // ---------------------------------------------------------------------
    // Positions & trades
    // ---------------------------------------------------------------------

    /// Open positions keyed by symbol.
    pub async fn open_positions(&self) -> Result<BTreeMap<Symbol, OpenPosition>, StoreError> {
        Ok(self.read(OPEN_POSITIONS_KEY).await?.unwrap_or_default())
    }

    /// Insert or replace the position for its symbol.
    pub async fn upsert_position(&self, position: OpenPosition) -> Result<(), StoreError> {
        let mut positions = self.open_positions().await?;
        positions.insert(position.symbol.clone(), position);
        self.write(OPEN_POSITIONS_KEY, &positions).await
    }

    /// Closed trades, oldest first.
    pub async fn closed_trades(&self) -> Result<Vec<ClosedTrade>, StoreError> {
        let trades: Vec<ClosedTrade> = self.read(CLOSED_TRADES_KEY).await?.unwrap_or_default();
        Ok(BoundedHistory::from_vec(trades, self.capacities.closed_trades).into_vec())
    }

    /// Record a confirmed close: append the trade, then drop the open position.
    ///
    /// A trade for the same symbol and open time is appended only once.
    pub async fn record_close(&self, trade: &ClosedTrade) -> Result<(), StoreError> {
        let existing: Vec<ClosedTrade> = self.read(CLOSED_TRADES_KEY).await?.unwrap_or_default();
        let duplicate = existing.iter().any(|t| {
            t.position.symbol == trade.position.symbol
                && t.position.opened_at == trade.position.opened_at
        });
        if !duplicate {
            let mut history = BoundedHistory::from_vec(existing, self.capacities.closed_trades);
            history.push(trade.clone());
            self.write(CLOSED_TRADES_KEY, &history.into_vec()).await?;
        }

        let mut positions = self.open_positions().await?;
        if positions.remove(&trade.position.symbol).is_some() {
            self.write(OPEN_POSITIONS_KEY, &positions).await?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Equity
    // ---------------------------------------------------------------------

    /// Rolling equity samples, oldest first.
    pub async fn rolling_equity(&self) -> Result<Vec<EquitySample>, StoreError> {
        Ok(self.read(EQUITY_ROLLING_KEY).await?.unwrap_or_default())
    }

    /// Append a sample to the rolling buffer and its UTC-day partition.
    ///
    /// Samples older than the newest stored sample are rejected.
    pub async fn record_equity(&self, sample: EquitySample) -> Result<AppendOutcome, StoreError> {
        let mut rolling = BoundedHistory::from_vec(self.rolling_equity().await?, self.capacities.equity);
        let outcome = append_sample(&mut rolling, sample);
        if outcome == AppendOutcome::RejectedStale {
            tracing::warn!(timestamp = %sample.timestamp, "Rejected stale equity sample");
            return Ok(outcome);
        }
        self.write(EQUITY_ROLLING_KEY, &rolling.into_vec()).await?;

        let day_key = equity_day_key(sample.timestamp.utc_date());
        let day: Vec<EquitySample> = self.read(&day_key).await?.unwrap_or_default();
        let mut partition = BoundedHistory::from_vec(day, usize::MAX);
        append_sample(&mut partition, sample);
        self.write(&day_key, &partition.into_vec()).await?;
        Ok(outcome)
    }

    /// Equity anchor, if set.
    pub async fn equity_anchor(&self) -> Result<Option<EquityAnchor>, StoreError> {
        self.read(EQUITY_ANCHOR_KEY).await
    }

    /// Equity series for display.
    ///
    /// Without an anchor this is the rolling buffer. With one, archive
    /// partitions from the anchor day to `today` are merged in and samples
    /// before the anchor are dropped.
    pub async fn equity_series(&self, today: NaiveDate) -> Result<Vec<EquitySample>, StoreError> {
        let rolling = self.rolling_equity().await?;
        let Some(anchor) = self.equity_anchor().await? else {
            return Ok(rolling);
        };

        let mut partitions = Vec::new();
        for day in days_between(anchor.timestamp.utc_date(), today) {
            if let Some(samples) = self.read::<Vec<EquitySample>>(&equity_day_key(day)).await? {
                partitions.push(samples);
            }
        }
        Ok(merge_series(partitions, &rolling, Some(&anchor)))
    }

    // ---------------------------------------------------------------------
    // Logs & narrator
    // ---------------------------------------------------------------------

    /// Activity log, oldest first.
    pub async fn logs(&self) -> Result<Vec<ActivityLogEntry>, StoreError> {
        Ok(self.read(LOGS_KEY).await?.unwrap_or_default())
    }

    /// Append entries to the bounded activity log.
    pub async fn append_logs(&self, entries: Vec<ActivityLogEntry>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut log = BoundedHistory::from_vec(self.logs().await?, self.capacities.logs);
        log.extend(entries);
        self.write(LOGS_KEY, &log.into_vec()).await
    }

    /// Narrator record (default when absent).
    pub async fn narrator_record(&self) -> Result<NarratorRecord, StoreError> {
        Ok(self.read(NARRATOR_KEY).await?.unwrap_or_default())
    }

    /// Overwrite the narrator record.
    pub async fn save_narrator_record(&self, record: &NarratorRecord) -> Result<(), StoreError> {
        self.write(NARRATOR_KEY, record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::LogLevel;
    use crate::domain::position_lifecycle::position::tests::long_position;
    use crate::domain::position_lifecycle::{ExitFill, ExitReason};
    use crate::domain::shared::Timestamp;
    use crate::infrastructure::persistence::InMemoryStateStore;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ledger(capacities: LedgerCapacities) -> (Arc<InMemoryStateStore>, TradeLedger<InMemoryStateStore>) {
        let store = Arc::new(InMemoryStateStore::new());
        (Arc::clone(&store), TradeLedger::new(store, capacities))
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[tokio::test]
    async fn load_config_writes_defaults_once() {
        let (store, ledger) = ledger(LedgerCapacities::default());
        let config = ledger.load_config().await.unwrap();

        assert_eq!(config, TradingConfig::default());
        assert!(store.get(CONFIG_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn record_close_moves_position_to_history_once() {
        let (_, ledger) = ledger(LedgerCapacities::default());
        let position = long_position("BTCUSDT", dec!(100), dec!(2));
        ledger.upsert_position(position.clone()).await.unwrap();

        let trade = position.close(ExitFill {
            price: dec!(94),
            quantity: dec!(2),
            reported_entry_price: None,
            closed_at: ts("2026-01-19T12:05:00Z"),
            reason: ExitReason::StopLoss,
        });
        ledger.record_close(&trade).await.unwrap();
        ledger.record_close(&trade).await.unwrap();

        assert!(ledger.open_positions().await.unwrap().is_empty());
        let closed = ledger.closed_trades().await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].realized_pnl, dec!(-12));
    }

    #[tokio::test]
    async fn closed_trades_are_bounded() {
        let (_, ledger) = ledger(LedgerCapacities {
            closed_trades: 2,
            ..LedgerCapacities::default()
        });
        for minute in 0..3 {
            let mut position = long_position("ETHUSDT", dec!(10), dec!(1));
            position.opened_at = ts("2026-01-19T12:00:00Z").plus(chrono::Duration::minutes(minute));
            let closed_at = position.opened_at;
            let trade = position.close(ExitFill {
                price: dec!(11),
                quantity: dec!(1),
                reported_entry_price: None,
                closed_at,
                reason: ExitReason::TakeProfit,
            });
            ledger.record_close(&trade).await.unwrap();
        }
        let closed = ledger.closed_trades().await.unwrap();
        assert_eq!(closed.len(), 2);
        assert_eq!(closed[0].position.opened_at, ts("2026-01-19T12:01:00Z"));
    }

    #[tokio::test]
    async fn record_equity_writes_rolling_and_day_partition() {
        let (store, ledger) = ledger(LedgerCapacities::default());
        let sample = EquitySample {
            timestamp: ts("2026-01-19T12:00:00Z"),
            equity: dec!(1000),
        };
        assert_eq!(ledger.record_equity(sample).await.unwrap(), AppendOutcome::Appended);

        let stale = EquitySample {
            timestamp: ts("2026-01-19T11:00:00Z"),
            equity: dec!(1),
        };
        assert_eq!(
            ledger.record_equity(stale).await.unwrap(),
            AppendOutcome::RejectedStale
        );

        assert_eq!(ledger.rolling_equity().await.unwrap(), vec![sample]);
        let day = store.get("equity:day:2026-01-19").await.unwrap().unwrap();
        assert_eq!(day.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn equity_series_merges_archive_from_anchor() {
        let (store, ledger) = ledger(LedgerCapacities {
            equity: 1,
            ..LedgerCapacities::default()
        });
        for (t, v) in [
            ("2026-01-18T10:00:00Z", dec!(90)),
            ("2026-01-18T20:00:00Z", dec!(95)),
            ("2026-01-19T08:00:00Z", dec!(99)),
        ] {
            ledger
                .record_equity(EquitySample {
                    timestamp: ts(t),
                    equity: v,
                })
                .await
                .unwrap();
        }
        // Rolling buffer holds one sample; without an anchor that is all we see.
        let today = ts("2026-01-19T09:00:00Z").utc_date();
        assert_eq!(ledger.equity_series(today).await.unwrap().len(), 1);

        store.insert(
            EQUITY_ANCHOR_KEY,
            json!({"timestamp": "2026-01-18T12:00:00Z", "value": "92"}),
        );
        let series = ledger.equity_series(today).await.unwrap();
        let values: Vec<_> = series.iter().map(|s| s.equity).collect();
        assert_eq!(values, vec![dec!(95), dec!(99)]);
    }

    #[tokio::test]
    async fn logs_are_bounded() {
        let (_, ledger) = ledger(LedgerCapacities {
            logs: 3,
            ..LedgerCapacities::default()
        });
        let entries: Vec<_> = (0..5)
            .map(|i| ActivityLogEntry::new(Timestamp::now(), LogLevel::Info, format!("m{i}"), None))
            .collect();
        ledger.append_logs(entries).await.unwrap();

        let logs = ledger.logs().await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "m2");
    }
}
