//! Exchange Port (Driven Port)
//!
//! Interface for account, market data and order execution on a perpetual
//! futures exchange.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market::{Candle, CandleInterval};
use crate::domain::order_execution::{LotSizeRules, OrderRequest};
use crate::domain::position_lifecycle::PositionSide;
use crate::domain::risk_management::MarginMode;
use crate::domain::shared::Symbol;

/// Account balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    /// Wallet balance plus unrealized P&L.
    pub equity: Decimal,
    /// Balance available for new margin.
    pub available_balance: Decimal,
    /// Unrealized P&L across all positions.
    pub unrealized_pnl: Decimal,
}

/// A position as the exchange reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePosition {
    /// Contract symbol.
    pub symbol: Symbol,
    /// Signed base amount; negative is short, zero is flat.
    pub position_amt: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Mark price, when reported.
    pub mark_price: Option<Decimal>,
}

impl LivePosition {
    /// Absolute quantity.
    #[must_use]
    pub fn quantity(&self) -> Decimal {
        self.position_amt.abs()
    }

    /// LONG / SHORT, or `None` when flat.
    #[must_use]
    pub fn side(&self) -> Option<PositionSide> {
        PositionSide::from_signed_amount(self.position_amt)
    }

    /// True when the exchange reports no position.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.position_amt.is_zero()
    }

    /// Entry price if the exchange reported a usable one.
    #[must_use]
    pub fn reported_entry_price(&self) -> Option<Decimal> {
        (self.entry_price > Decimal::ZERO).then_some(self.entry_price)
    }
}

/// Acknowledgment returned by order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    /// Exchange order ID.
    pub order_id: String,
    /// Client order ID echoed back.
    pub client_order_id: String,
    /// Exchange status string (NEW, FILLED, ...).
    pub status: String,
    /// Quantity executed so far.
    pub executed_qty: Decimal,
    /// Average fill price, if any fill happened.
    pub avg_price: Option<Decimal>,
}

/// Exchange port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExchangeError {
    /// Credentials missing; signed calls fail closed.
    #[error("Exchange not configured: {message}")]
    NotConfigured {
        /// What is missing.
        message: String,
    },

    /// Network failure or timeout.
    #[error("Exchange connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Exchange answered with an error status.
    #[error("Exchange API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Exchange error code, if present.
        code: Option<i64>,
        /// Response body or message.
        message: String,
    },

    /// Order rejected by the exchange.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// Rate limited.
    #[error("Rate limited by exchange")]
    RateLimited,

    /// Response did not match the expected shape.
    #[error("Invalid exchange response: {message}")]
    InvalidResponse {
        /// Parse error details.
        message: String,
    },

    /// Symbol unknown to the exchange.
    #[error("Unknown symbol: {symbol}")]
    UnknownSymbol {
        /// The symbol.
        symbol: String,
    },
}

/// Port for exchange interactions.
#[async_trait]
pub trait ExchangePort: Send + Sync {
    /// Account equity and balances.
    async fn account_snapshot(&self) -> Result<AccountSnapshot, ExchangeError>;

    /// All non-flat positions.
    async fn live_positions(&self) -> Result<Vec<LivePosition>, ExchangeError>;

    /// Position for one symbol; `None` when flat.
    async fn live_position(&self, symbol: &Symbol) -> Result<Option<LivePosition>, ExchangeError> {
        Ok(self
            .live_positions()
            .await?
            .into_iter()
            .find(|p| &p.symbol == symbol && !p.is_flat()))
    }

    /// Latest traded price.
    async fn last_price(&self, symbol: &Symbol) -> Result<Decimal, ExchangeError>;

    /// 24h percent change.
    async fn change_24h_pct(&self, symbol: &Symbol) -> Result<f64, ExchangeError>;

    /// Most recent `limit` candles, oldest first.
    async fn candles(
        &self,
        symbol: &Symbol,
        interval: CandleInterval,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;

    /// Lot size and min notional rules.
    async fn trading_rules(&self, symbol: &Symbol) -> Result<LotSizeRules, ExchangeError>;

    /// Set leverage for a symbol.
    async fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> Result<(), ExchangeError>;

    /// Set margin mode for a symbol.
    async fn set_margin_mode(&self, symbol: &Symbol, mode: MarginMode)
    -> Result<(), ExchangeError>;

    /// Submit a market order (reduce-only for closes).
    async fn submit_market_order(&self, order: &OrderRequest) -> Result<OrderAck, ExchangeError>;
}
