//! Order Execution Gateway
//!
//! Sizes, submits and confirms market orders against the exchange. An order
//! is only reported as done once the exchange-reported position reaches the
//! intended state; callers write the ledger after that and not before.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::application::ports::{ExchangeError, ExchangePort, LivePosition, OrderAck};
use crate::domain::order_execution::{FillAccumulator, OrderRequest, RetryPolicy};
use crate::domain::position_lifecycle::PositionSide;
use crate::domain::shared::Symbol;

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Exchange call failed.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// Requested size does not translate into a tradable quantity.
    #[error("cannot size {size_usd} USD of {symbol} at price {price}")]
    InvalidQuantity {
        /// Symbol.
        symbol: Symbol,
        /// Requested notional.
        size_usd: Decimal,
        /// Reference price.
        price: Decimal,
    },

    /// Open order never showed up in the exchange position.
    #[error("open of {symbol} not confirmed after {attempts} polls")]
    OpenNotConfirmed {
        /// Symbol.
        symbol: Symbol,
        /// Polls made.
        attempts: u32,
    },

    /// Position still open after the close retry budget.
    #[error("close of {symbol} not confirmed: {remaining} still open")]
    CloseNotConfirmed {
        /// Symbol.
        symbol: Symbol,
        /// Quantity still reported by the exchange.
        remaining: Decimal,
    },
}

/// A confirmed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFill {
    /// Side opened.
    pub side: PositionSide,
    /// Quantity now held on the exchange for this entry.
    pub quantity: Decimal,
    /// Entry price (exchange-reported when available).
    pub entry_price: Decimal,
    /// Exchange order id.
    pub order_id: String,
    /// True when the retry budget ran out with only part of the order filled.
    pub partial: bool,
}

/// A confirmed close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFill {
    /// Side that was closed.
    pub side: PositionSide,
    /// Quantity closed.
    pub quantity: Decimal,
    /// Volume weighted exit price.
    pub exit_price: Decimal,
    /// Entry price the exchange held before the close.
    pub reported_entry_price: Option<Decimal>,
    /// Exchange order id.
    pub order_id: String,
}

/// Result of driving a symbol to flat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The exchange already reported no position; nothing was sent.
    AlreadyFlat,
    /// Reduce-only order filled and the position reached zero.
    Closed(CloseFill),
}

/// Market order gateway with bounded confirmation polling.
pub struct OrderGateway<E: ExchangePort> {
    exchange: Arc<E>,
    open_retry: RetryPolicy,
    close_retry: RetryPolicy,
}

impl<E: ExchangePort> OrderGateway<E> {
    /// Create a gateway.
    pub const fn new(exchange: Arc<E>, open_retry: RetryPolicy, close_retry: RetryPolicy) -> Self {
        Self {
            exchange,
            open_retry,
            close_retry,
        }
    }

    fn live_amount(position: Option<&LivePosition>) -> Decimal {
        position.map_or(Decimal::ZERO, |p| p.position_amt)
    }

    /// Open `size_usd` of exposure on `side` and wait for the exchange to show it.
    pub async fn open_position(
        &self,
        symbol: &Symbol,
        side: PositionSide,
        size_usd: Decimal,
        reference_price: Decimal,
    ) -> Result<OpenFill, ExecutionError> {
        let rules = self.exchange.trading_rules(symbol).await?;
        let quantity = rules.quantity_for_notional(size_usd, reference_price);
        if quantity <= Decimal::ZERO {
            return Err(ExecutionError::InvalidQuantity {
                symbol: symbol.clone(),
                size_usd,
                price: reference_price,
            });
        }

        let baseline = Self::live_amount(self.exchange.live_position(symbol).await?.as_ref());
        let target = baseline + side.sign() * quantity;

        let order = OrderRequest::open(symbol.clone(), side.entry_order_side(), quantity);
        tracing::info!(
            symbol = %symbol,
            side = %side,
            quantity = %quantity,
            size_usd = %size_usd,
            client_order_id = %order.client_order_id,
            "Submitting entry order"
        );
        let ack = self.exchange.submit_market_order(&order).await?;

        let mut last_seen: Option<LivePosition> = None;
        for attempt in 1..=self.open_retry.max_attempts {
            match self.exchange.live_position(symbol).await {
                Ok(live) => {
                    let amount = Self::live_amount(live.as_ref());
                    last_seen = live;
                    if (amount - target).abs() <= rules.half_step() {
                        crate::observability::record_order("open", "confirmed");
                        return Ok(Self::open_fill(
                            side,
                            (amount - baseline).abs(),
                            last_seen.as_ref(),
                            &ack,
                            reference_price,
                            false,
                        ));
                    }
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, attempt, error = %e, "Position poll failed");
                }
            }
            if attempt < self.open_retry.max_attempts {
                tokio::time::sleep(self.open_retry.delay()).await;
            }
        }

        let moved = (Self::live_amount(last_seen.as_ref()) - baseline).abs();
        if moved >= rules.step_size {
            tracing::warn!(
                symbol = %symbol,
                requested = %quantity,
                filled = %moved,
                "Entry only partially filled, keeping the filled quantity"
            );
            crate::observability::record_order("open", "partial");
            return Ok(Self::open_fill(
                side,
                moved,
                last_seen.as_ref(),
                &ack,
                reference_price,
                true,
            ));
        }

        crate::observability::record_order("open", "unconfirmed");
        Err(ExecutionError::OpenNotConfirmed {
            symbol: symbol.clone(),
            attempts: self.open_retry.max_attempts,
        })
    }

    fn open_fill(
        side: PositionSide,
        quantity: Decimal,
        live: Option<&LivePosition>,
        ack: &OrderAck,
        reference_price: Decimal,
        partial: bool,
    ) -> OpenFill {
        let entry_price = live
            .and_then(LivePosition::reported_entry_price)
            .or(ack.avg_price.filter(|p| *p > Decimal::ZERO))
            .unwrap_or(reference_price);
        OpenFill {
            side,
            quantity,
            entry_price,
            order_id: ack.order_id.clone(),
            partial,
        }
    }

    /// Drive `symbol` to flat with a reduce-only order sized to the live position.
    ///
    /// Fills are accumulated across polls at the order's average price, or
    /// the latest market price when the exchange did not report one.
    /// `fallback_price` prices fills when neither is available.
    pub async fn close_to_flat(
        &self,
        symbol: &Symbol,
        fallback_price: Decimal,
    ) -> Result<CloseOutcome, ExecutionError> {
        let Some(live) = self.exchange.live_position(symbol).await? else {
            return Ok(CloseOutcome::AlreadyFlat);
        };
        let Some(side) = live.side() else {
            return Ok(CloseOutcome::AlreadyFlat);
        };
        let reported_entry_price = live.reported_entry_price();

        let order = OrderRequest::close(symbol.clone(), side.exit_order_side(), live.quantity());
        tracing::info!(
            symbol = %symbol,
            side = %side,
            quantity = %live.quantity(),
            client_order_id = %order.client_order_id,
            "Submitting reduce-only close"
        );
        let ack = self.exchange.submit_market_order(&order).await?;

        let mut fills = FillAccumulator::new();
        let mut remaining = live.quantity();
        for attempt in 1..=self.close_retry.max_attempts {
            match self.exchange.live_position(symbol).await {
                Ok(now) => {
                    let now_qty = now.as_ref().map_or(Decimal::ZERO, LivePosition::quantity);
                    let delta = remaining - now_qty;
                    if delta > Decimal::ZERO {
                        let price = self.fill_price(symbol, &ack, fallback_price).await;
                        fills.record(delta, price);
                    }
                    remaining = now_qty;
                    if remaining.is_zero() {
                        crate::observability::record_order("close", "confirmed");
                        return Ok(CloseOutcome::Closed(CloseFill {
                            side,
                            quantity: fills.filled_qty(),
                            exit_price: fills.vwap().unwrap_or(fallback_price),
                            reported_entry_price,
                            order_id: ack.order_id.clone(),
                        }));
                    }
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, attempt, error = %e, "Position poll failed");
                }
            }
            if attempt < self.close_retry.max_attempts {
                tokio::time::sleep(self.close_retry.delay()).await;
            }
        }

        crate::observability::record_order("close", "unconfirmed");
        Err(ExecutionError::CloseNotConfirmed {
            symbol: symbol.clone(),
            remaining,
        })
    }

    async fn fill_price(&self, symbol: &Symbol, ack: &OrderAck, fallback: Decimal) -> Decimal {
        if let Some(price) = ack.avg_price.filter(|p| *p > Decimal::ZERO) {
            return price;
        }
        match self.exchange.last_price(symbol).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Using fallback fill price");
                fallback
            }
        }
    }
}
