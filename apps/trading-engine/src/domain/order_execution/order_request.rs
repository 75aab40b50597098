//! Market order requests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderSide;
use crate::domain::shared::Symbol;

/// Whether an order opens exposure or only reduces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderIntent {
    /// Opens or adds to a position.
    Open,
    /// Reduce-only close.
    Close,
}

/// A market order ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Contract symbol.
    pub symbol: Symbol,
    /// Buy or sell.
    pub side: OrderSide,
    /// Quantized base quantity.
    pub quantity: Decimal,
    /// Open or reduce-only close.
    pub intent: OrderIntent,
    /// Fresh client order id; the only idempotency handle the exchange offers.
    pub client_order_id: String,
}

impl OrderRequest {
    /// Market order opening exposure.
    #[must_use]
    pub fn open(symbol: Symbol, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol,
            side,
            quantity,
            intent: OrderIntent::Open,
            client_order_id: new_client_order_id(),
        }
    }

    /// Reduce-only market order.
    #[must_use]
    pub fn close(symbol: Symbol, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol,
            side,
            quantity,
            intent: OrderIntent::Close,
            client_order_id: new_client_order_id(),
        }
    }

    /// True for reduce-only orders.
    #[must_use]
    pub fn reduce_only(&self) -> bool {
        self.intent == OrderIntent::Close
    }
}

fn new_client_order_id() -> String {
    // Exchange limit is 36 chars.
    Uuid::new_v4().simple().to_string()
}
