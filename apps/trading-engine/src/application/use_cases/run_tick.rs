//! Run Tick Use Case
//!
//! One invocation of the trading loop:
//!
//! 1. Load config and runtime state
//! 2. Read the account and aggregate market state
//! 3. Enforce exits on every open position
//! 4. When RUNNING: consult the oracle, apply the plan, narrate on FLAT
//!    (entries are refused while the runtime record is unreadable, since the
//!    order cooldown lives there)
//! 5. Always: sample equity, persist runtime state, flush the activity log
//!
//! Ticks are single-flight. An overlapping call returns immediately without
//! touching the exchange or the ledger.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;

use super::aggregate_market::AggregateMarketUseCase;
use super::consult_oracle::{Consultation, ConsultOracleUseCase};
use super::manage_positions::{ManagePositionsError, ManagePositionsUseCase, PlanOutcome};
use super::narrate_status::NarrateStatusUseCase;
use crate::application::dto::{StatusDto, TickResultDto};
use crate::application::ports::{DecisionOraclePort, ExchangePort, StateStorePort, StoreError};
use crate::application::services::{TickJournal, TradeLedger};
use crate::domain::EngineTuning;
use crate::domain::ledger::{AppendOutcome, EquitySample, RuntimeState};
use crate::domain::risk_management::TradingConfig;
use crate::domain::shared::Timestamp;

/// Failure of the tick sequence itself. Provider failures never end up here.
#[derive(Debug, Error)]
pub enum TickError {
    /// Ledger read or write failed.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Position management failed.
    #[error(transparent)]
    Positions(#[from] ManagePositionsError),
}

/// What the sequence got through before finishing or failing.
#[derive(Default)]
struct TickProgress {
    entries_blocked: bool,
    config: Option<TradingConfig>,
    pre_trade_equity: Option<Decimal>,
    consultation: Option<Consultation>,
}

/// Use case running one tick.
pub struct RunTickUseCase<E: ExchangePort, O: DecisionOraclePort, S: StateStorePort> {
    exchange: Arc<E>,
    ledger: Arc<TradeLedger<S>>,
    aggregate: AggregateMarketUseCase<E>,
    consult: ConsultOracleUseCase<O>,
    positions: ManagePositionsUseCase<E, S>,
    narrator: NarrateStatusUseCase<S>,
    in_flight: Mutex<()>,
}

impl<E: ExchangePort, O: DecisionOraclePort, S: StateStorePort> RunTickUseCase<E, O, S> {
    /// Create a new RunTickUseCase.
    pub fn new(exchange: Arc<E>, oracle: Arc<O>, ledger: Arc<TradeLedger<S>>, tuning: &EngineTuning) -> Self {
        Self {
            aggregate: AggregateMarketUseCase::new(
                Arc::clone(&exchange),
                tuning.candle_interval,
                tuning.candle_limit,
            ),
            consult: ConsultOracleUseCase::new(oracle, Duration::from_secs(tuning.oracle_timeout_secs)),
            positions: ManagePositionsUseCase::new(Arc::clone(&exchange), Arc::clone(&ledger), tuning.clone()),
            narrator: NarrateStatusUseCase::new(Arc::clone(&ledger), tuning.narrator),
            exchange,
            ledger,
            in_flight: Mutex::new(()),
        }
    }

    /// Run a tick now.
    pub async fn execute(&self) -> TickResultDto {
        self.execute_at(Timestamp::now()).await
    }

    /// Run a tick stamped `now`.
    pub async fn execute_at(&self, now: Timestamp) -> TickResultDto {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!("Tick skipped, previous tick still running");
            crate::observability::record_tick("overlap", 0.0);
            return TickResultDto::in_progress();
        };

        let started = Instant::now();
        let journal = TickJournal::new();
        let (mut runtime, runtime_loaded) = match self.ledger.load_runtime().await {
            Ok(runtime) => (runtime, true),
            Err(e) => {
                journal.error(format!("runtime state unavailable: {e}"), None);
                (RuntimeState::default(), false)
            }
        };

        let mut progress = TickProgress {
            entries_blocked: !runtime_loaded,
            ..TickProgress::default()
        };
        let result = self.run_sequence(now, &journal, &mut runtime, &mut progress).await;

        // Runs whatever the sequence did.
        let open_positions = self.sample_equity(now, progress.pre_trade_equity, &journal).await;

        runtime.last_tick_at = Some(now);
        runtime.tick_count += 1;
        let (ok, meta) = match &result {
            Ok(meta) => {
                runtime.last_error = None;
                (true, meta.clone())
            }
            Err(e) => {
                journal.error(format!("tick failed: {e}"), None);
                runtime.last_error = Some(e.to_string());
                (false, e.to_string())
            }
        };
        if let Some(consultation) = &progress.consultation {
            runtime.last_provider = Some(consultation.provenance.provider.clone());
            runtime.last_model = Some(consultation.provenance.model.clone());
            runtime.last_signal = Some(consultation.plan.signal());
        }

        if runtime_loaded {
            if let Err(e) = self.ledger.save_runtime(&runtime).await {
                tracing::error!(error = %e, "Failed to persist runtime state");
            }
        }
        if let Err(e) = self.ledger.append_logs(journal.drain()).await {
            tracing::error!(error = %e, "Failed to flush activity log");
        }

        let elapsed = started.elapsed().as_secs_f64();
        crate::observability::record_tick(if ok { "ok" } else { "error" }, elapsed);
        tracing::info!(
            tick = runtime.tick_count,
            ok,
            open_positions,
            elapsed_secs = elapsed,
            "Tick complete"
        );

        TickResultDto {
            ok,
            meta,
            status: progress.config.map(|config| StatusDto { config, runtime }),
            decision: progress.consultation.map(|c| c.plan),
        }
    }

    async fn run_sequence(
        &self,
        now: Timestamp,
        journal: &TickJournal,
        runtime: &mut RuntimeState,
        progress: &mut TickProgress,
    ) -> Result<String, TickError> {
        let config = self.ledger.load_config().await?;
        progress.config = Some(config.clone());

        let equity = match self.exchange.account_snapshot().await {
            Ok(account) => {
                progress.pre_trade_equity = Some(account.equity);
                account.equity
            }
            Err(e) => {
                journal.error(format!("account unavailable, entries disabled: {e}"), None);
                Decimal::ZERO
            }
        };

        let open = self.ledger.open_positions().await?;
        let snapshot = self
            .aggregate
            .execute(&config.universe, equity, open.values(), now, journal)
            .await;

        let closed = self
            .positions
            .enforce_exits(&config, &snapshot, now, runtime, journal)
            .await?;

        if !config.is_running() {
            return Ok(format!("{}: {} exits", config.status, closed.len()));
        }

        let consultation = self.consult.execute(&snapshot, &config, journal).await;
        let signal = consultation.plan.signal();
        let outcome = if progress.entries_blocked && !consultation.plan.is_flat() {
            journal.warn("entry skipped: runtime state unavailable", None);
            PlanOutcome::Skipped {
                reason: "runtime state unavailable".to_string(),
            }
        } else {
            self.positions
                .apply_plan(&consultation, &config, &snapshot, now, runtime, journal)
                .await?
        };
        let is_flat = consultation.plan.is_flat();
        progress.consultation = Some(consultation);

        if is_flat {
            self.narrator.execute(&signal, &snapshot, now, journal).await?;
        }

        Ok(match outcome {
            PlanOutcome::NoAction => signal,
            PlanOutcome::Held { .. } => format!("{signal}: held"),
            PlanOutcome::Opened { flipped: Some(_), .. } => format!("{signal}: flipped"),
            PlanOutcome::Opened { .. } => format!("{signal}: opened"),
            PlanOutcome::Skipped { reason } => format!("{signal}: skipped ({reason})"),
            PlanOutcome::Failed { reason } => format!("{signal}: failed ({reason})"),
        })
    }

    /// Record equity from a fresh account read, falling back to the
    /// pre-trade reading. Returns the open position count for logging.
    async fn sample_equity(&self, now: Timestamp, fallback: Option<Decimal>, journal: &TickJournal) -> usize {
        let equity = match self.exchange.account_snapshot().await {
            Ok(account) => Some(account.equity),
            Err(e) => {
                tracing::warn!(error = %e, "Fresh account read failed, using pre-trade equity");
                fallback
            }
        };
        let open_positions = self.ledger.open_positions().await.map_or(0, |p| p.len());

        let Some(equity) = equity else {
            journal.warn("no equity reading, sample skipped", None);
            return open_positions;
        };
        crate::observability::set_account_state(equity, open_positions);

        match self.ledger.record_equity(EquitySample { timestamp: now, equity }).await {
            Ok(AppendOutcome::RejectedStale) => {
                journal.warn(format!("equity sample at {now} older than the series, dropped"), None);
            }
            Ok(_) => {}
            Err(e) => journal.error(format!("equity sample not stored: {e}"), None),
        }
        open_positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::OracleError;
    use crate::application::services::{LedgerCapacities, RUNTIME_KEY};
    use crate::domain::order_execution::RetryPolicy;
    use crate::domain::risk_management::EngineStatus;
    use crate::domain::shared::Symbol;
    use crate::infrastructure::exchange::PaperExchange;
    use crate::infrastructure::oracle::ScriptedOracle;
    use crate::infrastructure::persistence::InMemoryStateStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        exchange: Arc<PaperExchange>,
        oracle: Arc<ScriptedOracle>,
        store: Arc<InMemoryStateStore>,
        ledger: Arc<TradeLedger<InMemoryStateStore>>,
        tick: RunTickUseCase<PaperExchange, ScriptedOracle, InMemoryStateStore>,
    }

    async fn fixture(oracle: ScriptedOracle, status: EngineStatus) -> Fixture {
        let exchange = Arc::new(PaperExchange::new(dec!(1000)));
        exchange.set_price("BTCUSDT", dec!(100));
        let oracle = Arc::new(oracle);
        let store = Arc::new(InMemoryStateStore::new());
        let ledger = Arc::new(TradeLedger::new(Arc::clone(&store), LedgerCapacities::default()));
        ledger
            .save_config(&TradingConfig {
                universe: vec![Symbol::new("BTCUSDT")],
                max_risk_per_trade_usd: dec!(1500),
                max_exposure_usd: dec!(10000),
                status,
                ..TradingConfig::default()
            })
            .await
            .unwrap();
        let tuning = EngineTuning {
            open_retry: RetryPolicy::new(2, 0),
            close_retry: RetryPolicy::new(2, 0),
            candle_limit: 30,
            ..EngineTuning::default()
        };
        let tick = RunTickUseCase::new(Arc::clone(&exchange), Arc::clone(&oracle), Arc::clone(&ledger), &tuning);
        Fixture {
            exchange,
            oracle,
            store,
            ledger,
            tick,
        }
    }

    fn t0() -> Timestamp {
        Timestamp::parse("2026-01-19T12:00:00Z").unwrap()
    }

    #[tokio::test]
    async fn running_tick_opens_sized_position_and_samples_equity() {
        let f = fixture(ScriptedOracle::new(), EngineStatus::Running).await;
        f.oracle.push_reply(r#"{"action":"LONG","symbol":"BTCUSDT","stopLossPrice":95}"#);

        let result = f.tick.execute_at(t0()).await;

        assert!(result.ok, "{}", result.meta);
        assert_eq!(result.meta, "LONG BTCUSDT: opened");
        let open = f.ledger.open_positions().await.unwrap();
        assert_eq!(open[&Symbol::new("BTCUSDT")].entry_notional, dec!(500));

        let status = result.status.unwrap();
        assert_eq!(status.runtime.tick_count, 1);
        assert_eq!(status.runtime.last_signal.as_deref(), Some("LONG BTCUSDT"));
        assert_eq!(status.runtime.last_provider.as_deref(), Some("scripted"));
        assert_eq!(f.ledger.rolling_equity().await.unwrap().len(), 1);
        assert!(!f.ledger.logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oracle_failure_still_samples_equity() {
        let f = fixture(ScriptedOracle::new(), EngineStatus::Running).await;
        f.oracle.push_error(OracleError::NotConfigured {
            message: "missing key".to_string(),
        });

        let result = f.tick.execute_at(t0()).await;

        assert!(result.ok);
        assert!(result.decision.unwrap().is_flat());
        let equity = f.ledger.rolling_equity().await.unwrap();
        assert_eq!(equity[0].equity, dec!(1000));
        assert!(f.exchange.orders().is_empty());
    }

    #[tokio::test]
    async fn stopped_engine_skips_oracle_but_samples_equity() {
        let f = fixture(ScriptedOracle::new(), EngineStatus::Stopped).await;

        let result = f.tick.execute_at(t0()).await;

        assert!(result.ok);
        assert!(result.decision.is_none());
        assert!(f.oracle.requests().is_empty());
        assert_eq!(f.ledger.rolling_equity().await.unwrap().len(), 1);
        assert_eq!(f.ledger.load_runtime().await.unwrap().tick_count, 1);
    }

    #[tokio::test]
    async fn account_outage_falls_back_and_refuses_entries() {
        let f = fixture(ScriptedOracle::new(), EngineStatus::Running).await;
        f.exchange.set_account_unavailable(true);
        f.oracle.push_reply(r#"{"action":"LONG","symbol":"BTCUSDT"}"#);

        let result = f.tick.execute_at(t0()).await;

        assert!(result.ok);
        assert!(result.meta.contains("skipped"));
        assert!(f.exchange.orders().is_empty());
        assert!(f.ledger.rolling_equity().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_runtime_blocks_entries_but_keeps_ticking() {
        let f = fixture(ScriptedOracle::new(), EngineStatus::Running).await;
        f.store.put(RUNTIME_KEY, serde_json::json!("corrupt")).await.unwrap();

        f.oracle.push_reply(r#"{"action":"LONG","symbol":"BTCUSDT"}"#);
        let first = f.tick.execute_at(t0()).await;
        f.oracle.push_reply(r#"{"action":"SHORT","symbol":"BTCUSDT"}"#);
        let second = f.tick.execute_at(t0().plus(chrono::Duration::seconds(10))).await;

        assert!(first.ok);
        assert_eq!(first.meta, "LONG BTCUSDT: skipped (runtime state unavailable)");
        assert!(second.meta.starts_with("SHORT BTCUSDT: skipped"), "{}", second.meta);
        assert!(f.exchange.orders().is_empty());
        assert!(f.ledger.open_positions().await.unwrap().is_empty());
        assert_eq!(f.ledger.rolling_equity().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unreadable_runtime_still_enforces_exits() {
        let f = fixture(ScriptedOracle::new(), EngineStatus::Running).await;
        f.oracle.push_reply(r#"{"action":"LONG","symbol":"BTCUSDT","stopLossPrice":95}"#);
        f.tick.execute_at(t0()).await;
        f.store.put(RUNTIME_KEY, serde_json::json!("corrupt")).await.unwrap();

        f.exchange.set_price("BTCUSDT", dec!(90));
        f.oracle.push_reply(r#"{"action":"FLAT"}"#);
        f.tick.execute_at(t0().plus(chrono::Duration::minutes(2))).await;

        assert!(f.ledger.open_positions().await.unwrap().is_empty());
        assert_eq!(f.ledger.closed_trades().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_tick_is_rejected() {
        let oracle = ScriptedOracle::new().with_latency(Duration::from_secs(5));
        let f = fixture(oracle, EngineStatus::Running).await;

        let (first, second) = tokio::join!(f.tick.execute_at(t0()), f.tick.execute_at(t0()));

        assert!(first.ok);
        assert_eq!(second, TickResultDto::in_progress());
        assert_eq!(f.oracle.requests().len(), 1);
        assert_eq!(f.ledger.load_runtime().await.unwrap().tick_count, 1);
    }
}
