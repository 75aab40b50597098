//! Aggregate Market Use Case
//!
//! Builds the per-tick market snapshot. Symbols are fetched concurrently and
//! a failing symbol only nulls its own fields.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;

use crate::application::ports::ExchangePort;
use crate::application::services::TickJournal;
use crate::domain::market::{
    CandleInterval, MarketSnapshot, PositionView, SymbolIndicators,
};
use crate::domain::position_lifecycle::OpenPosition;
use crate::domain::shared::{Symbol, Timestamp};

struct SymbolMarket {
    symbol: Symbol,
    price: Option<Decimal>,
    change_24h: Option<f64>,
    indicators: Option<SymbolIndicators>,
}

/// Use case assembling a [`MarketSnapshot`].
pub struct AggregateMarketUseCase<E: ExchangePort> {
    exchange: Arc<E>,
    interval: CandleInterval,
    candle_limit: usize,
}

impl<E: ExchangePort> AggregateMarketUseCase<E> {
    /// Create a new AggregateMarketUseCase.
    pub const fn new(exchange: Arc<E>, interval: CandleInterval, candle_limit: usize) -> Self {
        Self {
            exchange,
            interval,
            candle_limit,
        }
    }

    /// Execute the use case.
    pub async fn execute<'a>(
        &self,
        universe: &[Symbol],
        equity: Decimal,
        positions: impl IntoIterator<Item = &'a OpenPosition>,
        now: Timestamp,
        journal: &TickJournal,
    ) -> MarketSnapshot {
        // Open positions outside the universe still need a price for exits.
        let positions: Vec<&OpenPosition> = positions.into_iter().collect();
        let mut symbols: Vec<Symbol> = universe.to_vec();
        for position in &positions {
            if !symbols.contains(&position.symbol) {
                symbols.push(position.symbol.clone());
            }
        }

        let markets = join_all(symbols.iter().map(|s| self.fetch_symbol(s, journal))).await;

        let mut prices = BTreeMap::new();
        let mut change_24h = BTreeMap::new();
        let mut indicators = BTreeMap::new();
        for market in markets {
            prices.insert(market.symbol.clone(), market.price);
            change_24h.insert(market.symbol.clone(), market.change_24h);
            indicators.insert(market.symbol, market.indicators);
        }

        let positions = positions
            .into_iter()
            .map(|p| {
                let price = prices.get(&p.symbol).copied().flatten();
                PositionView::from_position(p, price, now)
            })
            .collect();

        MarketSnapshot {
            as_of: now,
            equity,
            positions,
            universe: universe.to_vec(),
            prices,
            change_24h,
            indicators,
        }
    }

    async fn fetch_symbol(&self, symbol: &Symbol, journal: &TickJournal) -> SymbolMarket {
        let (price, change, candles) = tokio::join!(
            self.exchange.last_price(symbol),
            self.exchange.change_24h_pct(symbol),
            self.exchange.candles(symbol, self.interval, self.candle_limit),
        );

        let price = price
            .inspect_err(|e| journal.warn(format!("price fetch failed: {e}"), Some(symbol)))
            .ok();
        let change_24h = change
            .inspect_err(|e| journal.warn(format!("24h change fetch failed: {e}"), Some(symbol)))
            .ok();
        let indicators = candles
            .inspect_err(|e| journal.warn(format!("candle fetch failed: {e}"), Some(symbol)))
            .ok()
            .filter(|c| !c.is_empty())
            .map(|c| SymbolIndicators::from_candles(&c));

        SymbolMarket {
            symbol: symbol.clone(),
            price,
            change_24h,
            indicators,
        }
    }
}
