//! Manage Positions Use Case
//!
//! Drives each symbol through FLAT -> OPEN -> CLOSING -> FLAT:
//!
//! - exits are enforced on every tick, whether or not the engine is running
//! - plans are applied only when RUNNING and after the risk guards pass
//! - a flip closes the old leg through the real close path before opening
//!
//! The ledger is written only after the exchange confirms a terminal state.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::application::ports::{ExchangePort, StateStorePort, StoreError};
use crate::application::services::{
    CloseOutcome, ExecutionError, OrderGateway, TickJournal, TradeLedger,
};
use crate::application::use_cases::Consultation;
use crate::domain::EngineTuning;
use crate::domain::decision::EntryPlan;
use crate::domain::ledger::RuntimeState;
use crate::domain::market::MarketSnapshot;
use crate::domain::position_lifecycle::slippage::{carry_into_entry, mark_exit_at_reference};
use crate::domain::position_lifecycle::{
    ClosedTrade, ExitFill, ExitReason, LifecycleState, OpenPosition, SlippageAttribution,
    evaluate_exit,
};
use crate::domain::risk_management::{
    RiskGovernor, RiskRejection, TradingConfig, check_daily_loss,
};
use crate::domain::shared::{DomainError, Symbol, Timestamp};

/// Position management errors. Exchange failures never surface here; they
/// are logged and the attempt is abandoned.
#[derive(Debug, Error)]
pub enum ManagePositionsError {
    /// Ledger read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Lifecycle transition outside the state machine.
    #[error("{0}")]
    Lifecycle(#[from] DomainError),
}

/// What happened to the tick's plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum PlanOutcome {
    /// FLAT plan, nothing to do.
    NoAction,
    /// A position on the same side already exists.
    Held {
        /// Symbol held.
        symbol: Symbol,
    },
    /// Entry refused before any order was sent.
    Skipped {
        /// Reason.
        reason: String,
    },
    /// A new position was opened.
    Opened {
        /// The recorded position.
        position: OpenPosition,
        /// Old leg closed by a flip, if any.
        flipped: Option<ClosedTrade>,
    },
    /// Orders were attempted but no position was recorded.
    Failed {
        /// Reason.
        reason: String,
    },
}

/// Use case for exit enforcement and plan execution.
pub struct ManagePositionsUseCase<E: ExchangePort, S: StateStorePort> {
    exchange: Arc<E>,
    gateway: OrderGateway<E>,
    ledger: Arc<TradeLedger<S>>,
    tuning: EngineTuning,
}

impl<E: ExchangePort, S: StateStorePort> ManagePositionsUseCase<E, S> {
    /// Create a new ManagePositionsUseCase.
    pub fn new(exchange: Arc<E>, ledger: Arc<TradeLedger<S>>, tuning: EngineTuning) -> Self {
        let gateway = OrderGateway::new(Arc::clone(&exchange), tuning.open_retry, tuning.close_retry);
        Self {
            exchange,
            gateway,
            ledger,
            tuning,
        }
    }

    // =========================================================================
    // Exits
    // =========================================================================

    /// Enforce exits on every recorded position.
    ///
    /// Positions the exchange no longer holds are recorded as EXCHANGE_FLAT.
    /// Otherwise the first breached trigger (stop-loss, take-profit after min
    /// hold, hard dollar loss) drives the position to flat.
    pub async fn enforce_exits(
        &self,
        config: &TradingConfig,
        snapshot: &MarketSnapshot,
        now: Timestamp,
        runtime: &mut RuntimeState,
        journal: &TickJournal,
    ) -> Result<Vec<ClosedTrade>, ManagePositionsError> {
        let positions = self.ledger.open_positions().await?;
        if positions.is_empty() {
            return Ok(Vec::new());
        }

        let live_symbols = match self.exchange.live_positions().await {
            Ok(live) => Some(
                live.into_iter()
                    .filter(|p| !p.is_flat())
                    .map(|p| p.symbol)
                    .collect::<Vec<_>>(),
            ),
            Err(e) => {
                journal.warn(format!("position reconciliation skipped: {e}"), None);
                None
            }
        };

        let mut closed = Vec::new();
        for (symbol, position) in positions {
            let Some(price) = snapshot.price(&symbol) else {
                journal.warn("no price, exits not evaluated", Some(&symbol));
                continue;
            };

            let externally_flat = live_symbols.as_ref().is_some_and(|live| !live.contains(&symbol));
            if externally_flat {
                let exit = Self::exchange_flat_exit(price, now);
                closed.push(self.record_close(position, exit, journal).await?);
                continue;
            }

            let Some(reason) = evaluate_exit(&position, price, now, config.max_loss_per_trade_usd)
            else {
                continue;
            };
            journal.info(format!("{reason} triggered at {price}"), Some(&symbol));

            if let Some(exit) = self.drive_to_flat(&position, reason, price, now, runtime, journal).await? {
                closed.push(self.record_close(position, exit, journal).await?);
            }
        }
        Ok(closed)
    }

    const fn exchange_flat_exit(price: Decimal, now: Timestamp) -> ExitFill {
        ExitFill {
            price,
            quantity: Decimal::ZERO,
            reported_entry_price: None,
            closed_at: now,
            reason: ExitReason::ExchangeFlat,
        }
    }

    /// Close through the gateway. `None` when the close was not confirmed;
    /// the position then stays open and is retried next tick.
    async fn drive_to_flat(
        &self,
        position: &OpenPosition,
        reason: ExitReason,
        price: Decimal,
        now: Timestamp,
        runtime: &mut RuntimeState,
        journal: &TickJournal,
    ) -> Result<Option<ExitFill>, ManagePositionsError> {
        let symbol = &position.symbol;
        let state = LifecycleState::Open.transition(LifecycleState::Closing)?;

        match self.gateway.close_to_flat(symbol, price).await {
            Ok(CloseOutcome::AlreadyFlat) => {
                state.transition(LifecycleState::Flat)?;
                journal.warn("exchange already flat, recording at last price", Some(symbol));
                Ok(Some(Self::exchange_flat_exit(price, now)))
            }
            Ok(CloseOutcome::Closed(fill)) => {
                state.transition(LifecycleState::Flat)?;
                runtime.record_order(now);
                Ok(Some(ExitFill {
                    price: fill.exit_price,
                    quantity: fill.quantity,
                    reported_entry_price: fill.reported_entry_price,
                    closed_at: now,
                    reason,
                }))
            }
            Err(e) => {
                state.transition(LifecycleState::Open)?;
                if matches!(e, ExecutionError::CloseNotConfirmed { .. }) {
                    runtime.record_order(now);
                }
                journal.error(format!("close failed, position kept: {e}"), Some(symbol));
                Ok(None)
            }
        }
    }

    async fn record_close(
        &self,
        position: OpenPosition,
        exit: ExitFill,
        journal: &TickJournal,
    ) -> Result<ClosedTrade, ManagePositionsError> {
        let trade = position.close(exit);
        self.ledger.record_close(&trade).await?;
        crate::observability::record_trade_closed(&trade.exit_reason.to_string(), trade.realized_pnl);
        journal.info(
            format!(
                "closed {} {} @ {} ({}), realized P&L {}",
                trade.position.side,
                trade.position.quantity,
                trade.exit_price,
                trade.exit_reason,
                trade.realized_pnl.round_dp(2)
            ),
            Some(&trade.position.symbol),
        );
        Ok(trade)
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Apply the tick's plan.
    pub async fn apply_plan(
        &self,
        consultation: &Consultation,
        config: &TradingConfig,
        snapshot: &MarketSnapshot,
        now: Timestamp,
        runtime: &mut RuntimeState,
        journal: &TickJournal,
    ) -> Result<PlanOutcome, ManagePositionsError> {
        let Some((side, entry)) = consultation.plan.entry() else {
            return Ok(PlanOutcome::NoAction);
        };
        let symbol = &entry.symbol;

        if !config.is_running() {
            return Ok(Self::skip("engine stopped", Some(symbol), journal));
        }
        let Some(price) = snapshot.price(symbol) else {
            return Ok(Self::skip("no price for plan symbol", Some(symbol), journal));
        };

        let positions = self.ledger.open_positions().await?;
        let existing = positions.get(symbol);
        if existing.is_some_and(|p| p.side == side) {
            journal.info(format!("holding {side}, plan agrees"), Some(symbol));
            return Ok(PlanOutcome::Held {
                symbol: symbol.clone(),
            });
        }

        let size_usd = match self
            .check_entry(config, snapshot.equity, &positions, existing.map(|p| &p.symbol), entry, runtime, now)
            .await?
        {
            Ok(size) => size,
            Err(rejection) => {
                crate::observability::record_risk_rejection(rejection_label(&rejection));
                return Ok(Self::skip(&rejection.to_string(), Some(symbol), journal));
            }
        };

        // Flip: the old leg must reach flat through the exchange first.
        let mut carried_slippage = Decimal::ZERO;
        let mut flipped = None;
        if let Some(old) = existing {
            let Some(exit) = self.drive_to_flat(old, ExitReason::Flip, price, now, runtime, journal).await?
            else {
                return Ok(PlanOutcome::Failed {
                    reason: format!("flip abandoned: {symbol} close not confirmed"),
                });
            };
            let exit = match self.tuning.slippage_attribution {
                SlippageAttribution::ClosedLeg => exit,
                SlippageAttribution::OpenedLeg if exit.reason == ExitReason::Flip => {
                    let (marked, slippage) = mark_exit_at_reference(old.side, exit, price);
                    carried_slippage = slippage;
                    marked
                }
                SlippageAttribution::OpenedLeg => exit,
            };
            flipped = Some(self.record_close(old.clone(), exit, journal).await?);
        }

        self.prepare_symbol(symbol, config, journal).await;

        let fill = match self.gateway.open_position(symbol, side, size_usd, price).await {
            Ok(fill) => fill,
            Err(e) => {
                if matches!(e, ExecutionError::OpenNotConfirmed { .. }) {
                    runtime.record_order(now);
                }
                journal.error(format!("open failed: {e}"), Some(symbol));
                return Ok(PlanOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        };
        LifecycleState::Flat.transition(LifecycleState::Open)?;
        runtime.record_order(now);

        let position = OpenPosition {
            symbol: symbol.clone(),
            side,
            quantity: fill.quantity,
            entry_price: fill.entry_price,
            entry_notional: fill.entry_price * fill.quantity,
            opened_at: now,
            stop_loss_price: entry.stop_loss_price,
            take_profit_price: entry.take_profit_price,
            min_hold_minutes: entry
                .min_hold_minutes
                .unwrap_or(self.tuning.default_min_hold_minutes),
            thesis: entry.thesis.clone(),
            provenance: consultation.provenance.clone(),
            entry_adjustment_usd: Decimal::ZERO,
        };
        let position = carry_into_entry(position, carried_slippage);
        self.ledger.upsert_position(position.clone()).await?;

        journal.info(
            format!(
                "opened {side} {} @ {} (${} requested){}",
                position.quantity,
                position.entry_price.round_dp(4),
                size_usd,
                if fill.partial { ", partial fill" } else { "" }
            ),
            Some(symbol),
        );
        Ok(PlanOutcome::Opened { position, flipped })
    }

    /// Entry guards and sizing. The outer `Result` is a ledger failure, the
    /// inner one a risk refusal.
    #[allow(clippy::too_many_arguments)]
    async fn check_entry(
        &self,
        config: &TradingConfig,
        equity: Decimal,
        positions: &BTreeMap<Symbol, OpenPosition>,
        replacing: Option<&Symbol>,
        entry: &EntryPlan,
        runtime: &RuntimeState,
        now: Timestamp,
    ) -> Result<Result<Decimal, RiskRejection>, ManagePositionsError> {
        let remaining_secs = runtime.cooldown_remaining(now, self.tuning.order_cooldown_secs);
        if remaining_secs > 0 {
            return Ok(Err(RiskRejection::Cooldown { remaining_secs }));
        }

        let closed = self.ledger.closed_trades().await?;
        if let Err(rejection) = self.tuning.loss_streak.check(&closed, now) {
            return Ok(Err(rejection));
        }
        if let Err(rejection) = check_daily_loss(&closed, now, config.max_daily_loss_usd) {
            return Ok(Err(rejection));
        }

        let governor = RiskGovernor::new(
            config,
            self.tuning.target_equity_fraction,
            self.tuning.min_order_notional_usd,
        );
        Ok(governor.size_order(
            entry.size_usd.unwrap_or(Decimal::ZERO),
            equity,
            positions.values(),
            replacing,
        ))
    }

    /// Apply leverage and margin mode. Failures are logged and ignored.
    async fn prepare_symbol(&self, symbol: &Symbol, config: &TradingConfig, journal: &TickJournal) {
        if let Err(e) = self.exchange.set_leverage(symbol, config.leverage_cap).await {
            journal.warn(format!("set leverage {}x failed: {e}", config.leverage_cap), Some(symbol));
        }
        if let Err(e) = self.exchange.set_margin_mode(symbol, config.margin_mode).await {
            journal.warn(format!("set margin mode {} failed: {e}", config.margin_mode), Some(symbol));
        }
    }

    fn skip(reason: &str, symbol: Option<&Symbol>, journal: &TickJournal) -> PlanOutcome {
        journal.warn(format!("entry skipped: {reason}"), symbol);
        PlanOutcome::Skipped {
            reason: reason.to_string(),
        }
    }
}

const fn rejection_label(rejection: &RiskRejection) -> &'static str {
    match rejection {
        RiskRejection::BelowMinNotional { .. } => "min_notional",
        RiskRejection::DailyLossLimit { .. } => "daily_loss",
        RiskRejection::LossStreak { .. } => "loss_streak",
        RiskRejection::Cooldown { .. } => "cooldown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::RetryPolicy;
    use crate::domain::decision::TradePlan;
    use crate::domain::position_lifecycle::{PositionSide, Provenance};
    use crate::domain::position_lifecycle::position::tests::long_position;
    use crate::domain::risk_management::EngineStatus;
    use crate::infrastructure::exchange::{FillBehavior, PaperExchange};
    use crate::infrastructure::persistence::InMemoryStateStore;
    use crate::application::services::LedgerCapacities;
    use rust_decimal_macros::dec;

    struct Fixture {
        exchange: Arc<PaperExchange>,
        ledger: Arc<TradeLedger<InMemoryStateStore>>,
        use_case: ManagePositionsUseCase<PaperExchange, InMemoryStateStore>,
    }

    fn fixture(tuning: EngineTuning) -> Fixture {
        let exchange = Arc::new(PaperExchange::new(dec!(1000)));
        exchange.set_price("BTCUSDT", dec!(100));
        let ledger = Arc::new(TradeLedger::new(
            Arc::new(InMemoryStateStore::new()),
            LedgerCapacities::default(),
        ));
        let use_case = ManagePositionsUseCase::new(Arc::clone(&exchange), Arc::clone(&ledger), tuning);
        Fixture {
            exchange,
            ledger,
            use_case,
        }
    }

    fn tuning() -> EngineTuning {
        EngineTuning {
            open_retry: RetryPolicy::new(2, 0),
            close_retry: RetryPolicy::new(8, 0),
            ..EngineTuning::default()
        }
    }

    fn btc() -> Symbol {
        Symbol::new("BTCUSDT")
    }

    fn t(minutes: i64) -> Timestamp {
        Timestamp::parse("2026-01-19T12:00:00Z")
            .unwrap()
            .plus(chrono::Duration::minutes(minutes))
    }

    fn snapshot(price: Decimal, equity: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            as_of: t(0),
            equity,
            positions: vec![],
            universe: vec![btc()],
            prices: BTreeMap::from([(btc(), Some(price))]),
            change_24h: BTreeMap::new(),
            indicators: BTreeMap::new(),
        }
    }

    fn running() -> TradingConfig {
        TradingConfig {
            universe: vec![btc()],
            max_risk_per_trade_usd: dec!(1500),
            max_exposure_usd: dec!(10000),
            status: EngineStatus::Running,
            ..TradingConfig::default()
        }
    }

    fn consultation(raw: &str) -> Consultation {
        Consultation {
            plan: TradePlan::parse(raw, &[btc()], |_| Some(dec!(100))).unwrap(),
            provenance: Provenance {
                provider: "scripted".to_string(),
                model: "m".to_string(),
            },
        }
    }

    async fn seed_long(f: &Fixture, entry: Decimal, qty: Decimal, stop: Option<Decimal>, min_hold: u32) {
        let mut position = long_position("BTCUSDT", entry, qty);
        position.stop_loss_price = stop;
        position.min_hold_minutes = min_hold;
        f.ledger.upsert_position(position).await.unwrap();
        f.exchange.set_position("BTCUSDT", qty, entry);
    }

    #[tokio::test]
    async fn stop_loss_closes_before_min_hold_with_realized_loss() {
        let f = fixture(tuning());
        seed_long(&f, dec!(100), dec!(2), Some(dec!(95)), 30).await;
        f.exchange.set_price("BTCUSDT", dec!(94));
        let mut runtime = RuntimeState::default();
        let journal = TickJournal::new();

        let closed = f
            .use_case
            .enforce_exits(&running(), &snapshot(dec!(94), dec!(988)), t(5), &mut runtime, &journal)
            .await
            .unwrap();

        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].exit_reason, ExitReason::StopLoss);
        assert_eq!(closed[0].realized_pnl, dec!(-12));
        assert!(f.ledger.open_positions().await.unwrap().is_empty());
        assert_eq!(f.ledger.closed_trades().await.unwrap().len(), 1);
        assert_eq!(runtime.last_order_at, Some(t(5)));
    }

    #[tokio::test]
    async fn exhausted_close_keeps_position_and_records_nothing() {
        let f = fixture(tuning());
        seed_long(&f, dec!(100), dec!(2), Some(dec!(95)), 0).await;
        f.exchange.set_price("BTCUSDT", dec!(94));
        f.exchange.set_fill_behavior(FillBehavior::Never);
        let mut runtime = RuntimeState::default();
        let journal = TickJournal::new();

        let closed = f
            .use_case
            .enforce_exits(&running(), &snapshot(dec!(94), dec!(988)), t(5), &mut runtime, &journal)
            .await
            .unwrap();

        assert!(closed.is_empty());
        assert_eq!(f.ledger.open_positions().await.unwrap().len(), 1);
        assert!(f.ledger.closed_trades().await.unwrap().is_empty());
        assert!(journal.drain().iter().any(|e| e.message.contains("close failed")));
    }

    #[tokio::test]
    async fn position_gone_from_exchange_is_recorded_exchange_flat() {
        let f = fixture(tuning());
        seed_long(&f, dec!(100), dec!(2), None, 0).await;
        f.exchange.set_position("BTCUSDT", Decimal::ZERO, Decimal::ZERO);
        let mut runtime = RuntimeState::default();

        let closed = f
            .use_case
            .enforce_exits(&running(), &snapshot(dec!(103), dec!(1000)), t(5), &mut runtime, &TickJournal::new())
            .await
            .unwrap();

        assert_eq!(closed[0].exit_reason, ExitReason::ExchangeFlat);
        assert_eq!(closed[0].exit_price, dec!(103));
        assert_eq!(closed[0].realized_pnl, dec!(6));
        assert!(f.exchange.orders().is_empty());
        assert_eq!(runtime.last_order_at, None);
    }

    #[tokio::test]
    async fn take_profit_waits_for_min_hold() {
        let f = fixture(tuning());
        seed_long(&f, dec!(100), dec!(1), None, 10).await;
        let mut position = f.ledger.open_positions().await.unwrap().remove(&btc()).unwrap();
        position.take_profit_price = Some(dec!(105));
        f.ledger.upsert_position(position).await.unwrap();
        f.exchange.set_price("BTCUSDT", dec!(106));
        let mut runtime = RuntimeState::default();

        let early = f
            .use_case
            .enforce_exits(&running(), &snapshot(dec!(106), dec!(1006)), t(5), &mut runtime, &TickJournal::new())
            .await
            .unwrap();
        assert!(early.is_empty());

        let late = f
            .use_case
            .enforce_exits(&running(), &snapshot(dec!(106), dec!(1006)), t(10), &mut runtime, &TickJournal::new())
            .await
            .unwrap();
        assert_eq!(late[0].exit_reason, ExitReason::TakeProfit);
    }

    #[tokio::test]
    async fn long_plan_opens_position_sized_by_equity_fraction() {
        let f = fixture(tuning());
        let mut runtime = RuntimeState::default();

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"LONG","symbol":"BTCUSDT","stopLossPrice":95,"minHoldMinutes":5}"#),
                &running(),
                &snapshot(dec!(100), dec!(1000)),
                t(0),
                &mut runtime,
                &TickJournal::new(),
            )
            .await
            .unwrap();

        let PlanOutcome::Opened { position, flipped } = outcome else {
            panic!("expected an open, got {outcome:?}");
        };
        assert!(flipped.is_none());
        assert_eq!(position.quantity, dec!(5));
        assert_eq!(position.entry_notional, dec!(500));
        assert_eq!(position.stop_loss_price, Some(dec!(95)));
        assert_eq!(position.min_hold_minutes, 5);
        assert_eq!(position.provenance.provider, "scripted");
        assert_eq!(f.exchange.leverage("BTCUSDT"), Some(5));
        assert_eq!(runtime.last_order_at, Some(t(0)));
        assert_eq!(f.ledger.open_positions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_side_plan_holds_without_orders() {
        let f = fixture(tuning());
        seed_long(&f, dec!(100), dec!(1), None, 0).await;

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"LONG","symbol":"BTCUSDT"}"#),
                &running(),
                &snapshot(dec!(100), dec!(1000)),
                t(0),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, PlanOutcome::Held { symbol: btc() });
        assert!(f.exchange.orders().is_empty());
    }

    #[tokio::test]
    async fn opposite_plan_flips_through_real_close() {
        let f = fixture(tuning());
        seed_long(&f, dec!(90), dec!(1), None, 0).await;

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"SHORT","symbol":"BTCUSDT","sizeUsd":200}"#),
                &running(),
                &snapshot(dec!(100), dec!(1000)),
                t(0),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();

        let PlanOutcome::Opened { position, flipped } = outcome else {
            panic!("expected a flip, got {outcome:?}");
        };
        let flipped = flipped.unwrap();
        assert_eq!(flipped.exit_reason, ExitReason::Flip);
        assert_eq!(flipped.realized_pnl, dec!(10));
        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.quantity, dec!(2));

        let orders = f.exchange.orders();
        assert_eq!(orders.len(), 2);
        assert!(orders[0].reduce_only());
        assert!(!orders[1].reduce_only());
    }

    #[tokio::test]
    async fn failed_flip_close_abandons_open() {
        let f = fixture(tuning());
        seed_long(&f, dec!(90), dec!(1), None, 0).await;
        f.exchange.set_fill_behavior(FillBehavior::Never);

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"SHORT","symbol":"BTCUSDT"}"#),
                &running(),
                &snapshot(dec!(100), dec!(1000)),
                t(0),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, PlanOutcome::Failed { .. }));
        assert_eq!(f.exchange.orders().len(), 1);
        let open = f.ledger.open_positions().await.unwrap();
        assert_eq!(open[&btc()].side, PositionSide::Long);
    }

    #[tokio::test]
    async fn cooldown_blocks_entry() {
        let f = fixture(tuning());
        let mut runtime = RuntimeState {
            last_order_at: Some(t(0)),
            ..RuntimeState::default()
        };

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"LONG","symbol":"BTCUSDT"}"#),
                &running(),
                &snapshot(dec!(100), dec!(1000)),
                t(0).plus(chrono::Duration::seconds(30)),
                &mut runtime,
                &TickJournal::new(),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, PlanOutcome::Skipped { ref reason } if reason.contains("cooldown")));
        assert!(f.exchange.orders().is_empty());
    }

    #[tokio::test]
    async fn stopped_engine_never_opens() {
        let f = fixture(tuning());
        let config = TradingConfig {
            status: EngineStatus::Stopped,
            ..running()
        };

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"LONG","symbol":"BTCUSDT"}"#),
                &config,
                &snapshot(dec!(100), dec!(1000)),
                t(0),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, PlanOutcome::Skipped { .. }));
        assert!(f.exchange.orders().is_empty());
    }

    #[tokio::test]
    async fn below_min_notional_is_never_sent() {
        let f = fixture(tuning());

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"LONG","symbol":"BTCUSDT"}"#),
                &running(),
                &snapshot(dec!(100), dec!(15)),
                t(0),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, PlanOutcome::Skipped { .. }));
        assert!(f.exchange.orders().is_empty());
    }

    #[tokio::test]
    async fn opened_leg_attribution_moves_flip_slippage_into_new_entry() {
        let f = fixture(EngineTuning {
            slippage_attribution: SlippageAttribution::OpenedLeg,
            ..tuning()
        });
        seed_long(&f, dec!(90), dec!(1), None, 0).await;
        // Exchange fills the close at 99 while the plan priced it at 100.
        f.exchange.set_price("BTCUSDT", dec!(99));

        let outcome = f
            .use_case
            .apply_plan(
                &consultation(r#"{"action":"SHORT","symbol":"BTCUSDT","sizeUsd":198}"#),
                &running(),
                &snapshot(dec!(100), dec!(1000)),
                t(0),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();

        let PlanOutcome::Opened { position, flipped } = outcome else {
            panic!("expected a flip, got {outcome:?}");
        };
        let flipped = flipped.unwrap();
        assert_eq!(flipped.exit_price, dec!(100));
        assert_eq!(flipped.realized_pnl, dec!(10));
        // One dollar of slippage on the close lowers the short's entry.
        assert_eq!(position.quantity, dec!(1.98));
        assert!(position.entry_price < dec!(99));
        assert_eq!(position.entry_adjustment_usd, dec!(-1));
    }

    #[tokio::test]
    async fn carried_flip_slippage_is_realized_when_new_leg_closes() {
        let f = fixture(EngineTuning {
            slippage_attribution: SlippageAttribution::OpenedLeg,
            ..tuning()
        });
        seed_long(&f, dec!(90), dec!(1), None, 0).await;
        f.exchange.set_price("BTCUSDT", dec!(99));

        f.use_case
            .apply_plan(
                &consultation(r#"{"action":"SHORT","symbol":"BTCUSDT","sizeUsd":198}"#),
                &running(),
                &snapshot(dec!(100), dec!(1000)),
                t(1),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();

        // Flip back at an unchanged 99: the short itself broke even on the
        // exchange, so only the carried dollar of slippage is realized.
        f.use_case
            .apply_plan(
                &consultation(r#"{"action":"LONG","symbol":"BTCUSDT","sizeUsd":99}"#),
                &running(),
                &snapshot(dec!(99), dec!(1000)),
                t(5),
                &mut RuntimeState::default(),
                &TickJournal::new(),
            )
            .await
            .unwrap();

        let closed = f.ledger.closed_trades().await.unwrap();
        assert_eq!(closed.len(), 2);
        assert_eq!(closed[0].realized_pnl, dec!(10));
        assert_eq!(closed[1].position.side, PositionSide::Short);
        assert_eq!(closed[1].realized_pnl.round_dp(8), dec!(-1));
        let total: Decimal = closed.iter().map(|t| t.realized_pnl).sum();
        // Long 1 from 90 closed at 99 on the exchange.
        assert_eq!(total.round_dp(8), dec!(9));
    }
}
