//! Paper exchange.
//!
//! In-process simulation of a perpetual futures account. Orders fill at the
//! current price according to a [`FillBehavior`]; reductions realize P&L into
//! equity. Used for dry runs and as the exchange double in tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use crate::application::ports::{AccountSnapshot, ExchangeError, ExchangePort, LivePosition, OrderAck};
use crate::domain::market::{Candle, CandleInterval};
use crate::domain::order_execution::{LotSizeRules, OrderRequest, OrderSide};
use crate::domain::risk_management::MarginMode;
use crate::domain::shared::{Symbol, Timestamp};

/// How submitted orders fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillBehavior {
    /// Fill the full quantity on submission.
    #[default]
    Immediate,
    /// Fill this fraction of the quantity (quantized to the step) on submission.
    Partial(Decimal),
    /// Acknowledge but never fill.
    Never,
}

#[derive(Debug)]
struct PaperState {
    wallet_balance: Decimal,
    prices: BTreeMap<Symbol, Decimal>,
    changes: BTreeMap<Symbol, f64>,
    candles: BTreeMap<Symbol, Vec<Candle>>,
    rules: BTreeMap<Symbol, LotSizeRules>,
    positions: BTreeMap<Symbol, LivePosition>,
    scripted_amounts: BTreeMap<Symbol, VecDeque<Decimal>>,
    failing_symbols: BTreeSet<Symbol>,
    account_unavailable: bool,
    fill: FillBehavior,
    orders: Vec<OrderRequest>,
    leverage: BTreeMap<Symbol, u32>,
    margin: BTreeMap<Symbol, MarginMode>,
    next_order_id: u64,
}

/// Simulated exchange account.
#[derive(Debug)]
pub struct PaperExchange {
    state: Mutex<PaperState>,
    default_rules: LotSizeRules,
}

impl PaperExchange {
    /// New account holding `wallet_balance` USD.
    #[must_use]
    pub fn new(wallet_balance: Decimal) -> Self {
        Self {
            state: Mutex::new(PaperState {
                wallet_balance,
                prices: BTreeMap::new(),
                changes: BTreeMap::new(),
                candles: BTreeMap::new(),
                rules: BTreeMap::new(),
                positions: BTreeMap::new(),
                scripted_amounts: BTreeMap::new(),
                failing_symbols: BTreeSet::new(),
                account_unavailable: false,
                fill: FillBehavior::Immediate,
                orders: Vec::new(),
                leverage: BTreeMap::new(),
                margin: BTreeMap::new(),
                next_order_id: 1,
            }),
            default_rules: LotSizeRules {
                step_size: dec!(0.001),
                min_qty: dec!(0.001),
                min_notional: dec!(5),
            },
        }
    }

    /// Set the last price of a symbol.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.state.lock().prices.insert(Symbol::new(symbol), price);
    }

    /// Set the 24h change of a symbol.
    pub fn set_change_24h(&self, symbol: &str, pct: f64) {
        self.state.lock().changes.insert(Symbol::new(symbol), pct);
    }

    /// Replace the candle history of a symbol.
    pub fn set_candles(&self, symbol: &str, candles: Vec<Candle>) {
        self.state.lock().candles.insert(Symbol::new(symbol), candles);
    }

    /// Override lot-size rules for a symbol.
    pub fn set_rules(&self, symbol: &str, rules: LotSizeRules) {
        self.state.lock().rules.insert(Symbol::new(symbol), rules);
    }

    /// Change how subsequent orders fill.
    pub fn set_fill_behavior(&self, fill: FillBehavior) {
        self.state.lock().fill = fill;
    }

    /// Make market data calls for `symbol` fail.
    pub fn fail_market_data(&self, symbol: &str) {
        self.state.lock().failing_symbols.insert(Symbol::new(symbol));
    }

    /// Make account reads fail.
    pub fn set_account_unavailable(&self, unavailable: bool) {
        self.state.lock().account_unavailable = unavailable;
    }

    /// Seed a live position.
    pub fn set_position(&self, symbol: &str, position_amt: Decimal, entry_price: Decimal) {
        let symbol = Symbol::new(symbol);
        let mut state = self.state.lock();
        if position_amt.is_zero() {
            state.positions.remove(&symbol);
        } else {
            state.positions.insert(
                symbol.clone(),
                LivePosition {
                    symbol,
                    position_amt,
                    entry_price,
                    mark_price: None,
                },
            );
        }
    }

    /// Script the amounts reported by successive position reads.
    ///
    /// Each read pops one amount and applies it before answering.
    pub fn script_position_amounts(&self, symbol: &str, amounts: impl IntoIterator<Item = Decimal>) {
        self.state
            .lock()
            .scripted_amounts
            .insert(Symbol::new(symbol), amounts.into_iter().collect());
    }

    /// Orders submitted so far.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.state.lock().orders.clone()
    }

    /// Leverage last applied to a symbol.
    #[must_use]
    pub fn leverage(&self, symbol: &str) -> Option<u32> {
        self.state.lock().leverage.get(&Symbol::new(symbol)).copied()
    }

    /// Margin mode last applied to a symbol.
    #[must_use]
    pub fn margin_mode(&self, symbol: &str) -> Option<MarginMode> {
        self.state.lock().margin.get(&Symbol::new(symbol)).copied()
    }

    fn rules_for(&self, state: &PaperState, symbol: &Symbol) -> LotSizeRules {
        state.rules.get(symbol).copied().unwrap_or(self.default_rules)
    }

    fn price_of(state: &PaperState, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
        if state.failing_symbols.contains(symbol) {
            return Err(ExchangeError::ConnectionError {
                message: format!("market data unavailable for {symbol}"),
            });
        }
        state
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    fn apply_scripted(state: &mut PaperState) {
        let mut updates = Vec::new();
        for (symbol, queue) in &mut state.scripted_amounts {
            if let Some(amount) = queue.pop_front() {
                updates.push((symbol.clone(), amount));
            }
        }
        for (symbol, amount) in updates {
            let entry = state
                .positions
                .get(&symbol)
                .map(|p| p.entry_price)
                .or_else(|| state.prices.get(&symbol).copied())
                .unwrap_or_default();
            if amount.is_zero() {
                state.positions.remove(&symbol);
            } else {
                state.positions.insert(
                    symbol.clone(),
                    LivePosition {
                        symbol,
                        position_amt: amount,
                        entry_price: entry,
                        mark_price: None,
                    },
                );
            }
        }
    }

    /// Apply a signed fill, realizing P&L on the reduced part.
    fn apply_fill(state: &mut PaperState, symbol: &Symbol, delta: Decimal, price: Decimal) {
        let (amount, entry) = state
            .positions
            .get(symbol)
            .map_or((Decimal::ZERO, Decimal::ZERO), |p| (p.position_amt, p.entry_price));
        let next = amount + delta;

        let reducing = !amount.is_zero() && amount.is_sign_positive() != delta.is_sign_positive();
        let next_entry = if reducing {
            let closed = delta.abs().min(amount.abs());
            let direction = if amount.is_sign_positive() { Decimal::ONE } else { Decimal::NEGATIVE_ONE };
            state.wallet_balance += closed * (price - entry) * direction;
            if delta.abs() > amount.abs() { price } else { entry }
        } else {
            (amount.abs() * entry + delta.abs() * price) / next.abs()
        };

        if next.is_zero() {
            state.positions.remove(symbol);
        } else {
            state.positions.insert(
                symbol.clone(),
                LivePosition {
                    symbol: symbol.clone(),
                    position_amt: next,
                    entry_price: next_entry,
                    mark_price: Some(price),
                },
            );
        }
    }
}

fn unrealized(state: &PaperState) -> Decimal {
    state
        .positions
        .values()
        .filter_map(|p| {
            state
                .prices
                .get(&p.symbol)
                .map(|price| (*price - p.entry_price) * p.position_amt)
        })
        .sum()
}

#[async_trait]
impl ExchangePort for PaperExchange {
    async fn account_snapshot(&self) -> Result<AccountSnapshot, ExchangeError> {
        let state = self.state.lock();
        if state.account_unavailable {
            return Err(ExchangeError::ConnectionError {
                message: "account endpoint unavailable".to_string(),
            });
        }
        let unrealized_pnl = unrealized(&state);
        Ok(AccountSnapshot {
            equity: state.wallet_balance + unrealized_pnl,
            available_balance: state.wallet_balance,
            unrealized_pnl,
        })
    }

    async fn live_positions(&self) -> Result<Vec<LivePosition>, ExchangeError> {
        let mut state = self.state.lock();
        Self::apply_scripted(&mut state);
        Ok(state.positions.values().cloned().collect())
    }

    async fn last_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
        Self::price_of(&self.state.lock(), symbol)
    }

    async fn change_24h_pct(&self, symbol: &Symbol) -> Result<f64, ExchangeError> {
        let state = self.state.lock();
        Self::price_of(&state, symbol)?;
        Ok(state.changes.get(symbol).copied().unwrap_or_default())
    }

    async fn candles(
        &self,
        symbol: &Symbol,
        _interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let state = self.state.lock();
        let price = Self::price_of(&state, symbol)?;
        if let Some(candles) = state.candles.get(symbol) {
            let skip = candles.len().saturating_sub(limit);
            return Ok(candles[skip..].to_vec());
        }

        // Flat synthetic bars at the current price.
        let close = price.to_f64().unwrap_or_default();
        let now = Timestamp::now();
        Ok((0..limit)
            .map(|i| {
                let age = i64::try_from(limit - i).unwrap_or(i64::MAX);
                Candle {
                    open_time: now.plus(-chrono::Duration::minutes(age)),
                    open: close,
                    high: close * 1.001,
                    low: close * 0.999,
                    close,
                    volume: 1.0,
                }
            })
            .collect())
    }

    async fn trading_rules(&self, symbol: &Symbol) -> Result<LotSizeRules, ExchangeError> {
        Ok(self.rules_for(&self.state.lock(), symbol))
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> Result<(), ExchangeError> {
        self.state.lock().leverage.insert(symbol.clone(), leverage);
        Ok(())
    }

    async fn set_margin_mode(
        &self,
        symbol: &Symbol,
        mode: MarginMode,
    ) -> Result<(), ExchangeError> {
        self.state.lock().margin.insert(symbol.clone(), mode);
        Ok(())
    }

    async fn submit_market_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        let mut state = self.state.lock();
        let price = Self::price_of(&state, &order.symbol)?;
        let rules = self.rules_for(&state, &order.symbol);
        state.orders.push(order.clone());

        let live_amt = state
            .positions
            .get(&order.symbol)
            .map_or(Decimal::ZERO, |p| p.position_amt);
        let reduces = match order.side {
            OrderSide::Buy => live_amt < Decimal::ZERO,
            OrderSide::Sell => live_amt > Decimal::ZERO,
        };
        if order.reduce_only() && !reduces {
            return Err(ExchangeError::Api {
                status: 400,
                code: Some(-2022),
                message: "ReduceOnly Order is rejected.".to_string(),
            });
        }

        let mut quantity = match state.fill {
            FillBehavior::Immediate => order.quantity,
            FillBehavior::Partial(fraction) => {
                let part = order.quantity * fraction;
                if part < rules.step_size { Decimal::ZERO } else { rules.quantize(part) }
            }
            FillBehavior::Never => Decimal::ZERO,
        };
        if order.reduce_only() {
            quantity = quantity.min(live_amt.abs());
        }

        if !quantity.is_zero() {
            let delta = match order.side {
                OrderSide::Buy => quantity,
                OrderSide::Sell => -quantity,
            };
            Self::apply_fill(&mut state, &order.symbol, delta, price);
        }

        let order_id = state.next_order_id;
        state.next_order_id += 1;
        let filled = !quantity.is_zero();
        let status = if quantity == order.quantity {
            "FILLED"
        } else if filled {
            "PARTIALLY_FILLED"
        } else {
            "NEW"
        };
        Ok(OrderAck {
            order_id: format!("paper-{order_id}"),
            client_order_id: order.client_order_id.clone(),
            status: status.to_string(),
            executed_qty: quantity,
            avg_price: filled.then_some(price),
        })
    }
}
