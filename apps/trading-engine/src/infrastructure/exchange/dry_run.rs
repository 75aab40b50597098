//! Dry-run exchange: real market data, simulated account.
//!
//! Prices, candles and trading rules come from `M`; every price and rule
//! read is mirrored into a [`PaperExchange`] that holds the account,
//! positions and fills. No order ever reaches the real venue.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::paper::PaperExchange;
use crate::application::ports::{AccountSnapshot, ExchangeError, ExchangePort, LivePosition, OrderAck};
use crate::domain::market::{Candle, CandleInterval};
use crate::domain::order_execution::{LotSizeRules, OrderRequest};
use crate::domain::risk_management::MarginMode;
use crate::domain::shared::Symbol;

/// Paper account driven by a live market data source.
#[derive(Debug)]
pub struct DryRunExchange<M: ExchangePort> {
    market: M,
    book: PaperExchange,
}

impl<M: ExchangePort> DryRunExchange<M> {
    /// Simulate an account of `wallet_balance` USD against `market`.
    #[must_use]
    pub fn new(market: M, wallet_balance: Decimal) -> Self {
        Self {
            market,
            book: PaperExchange::new(wallet_balance),
        }
    }

    /// The simulated account.
    #[must_use]
    pub const fn book(&self) -> &PaperExchange {
        &self.book
    }
}

#[async_trait]
impl<M: ExchangePort> ExchangePort for DryRunExchange<M> {
    async fn account_snapshot(&self) -> Result<AccountSnapshot, ExchangeError> {
        self.book.account_snapshot().await
    }

    async fn live_positions(&self) -> Result<Vec<LivePosition>, ExchangeError> {
        self.book.live_positions().await
    }

    async fn last_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError> {
        let price = self.market.last_price(symbol).await?;
        self.book.set_price(symbol.as_str(), price);
        Ok(price)
    }

    async fn change_24h_pct(&self, symbol: &Symbol) -> Result<f64, ExchangeError> {
        self.market.change_24h_pct(symbol).await
    }

    async fn candles(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        self.market.candles(symbol, interval, limit).await
    }

    async fn trading_rules(&self, symbol: &Symbol) -> Result<LotSizeRules, ExchangeError> {
        let rules = self.market.trading_rules(symbol).await?;
        self.book.set_rules(symbol.as_str(), rules);
        Ok(rules)
    }

    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> Result<(), ExchangeError> {
        self.book.set_leverage(symbol, leverage).await
    }

    async fn set_margin_mode(
        &self,
        symbol: &Symbol,
        mode: MarginMode,
    ) -> Result<(), ExchangeError> {
        self.book.set_margin_mode(symbol, mode).await
    }

    async fn submit_market_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        // Fill at the freshest price available.
        if let Ok(price) = self.market.last_price(&order.symbol).await {
            self.book.set_price(order.symbol.as_str(), price);
        }
        self.book.submit_market_order(order).await
    }
}
