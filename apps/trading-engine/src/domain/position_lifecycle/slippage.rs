//! Flip slippage attribution.
//!
//! A flip closes the old leg through the real reduce-only path and then opens
//! the new leg. The difference between the close VWAP and the decision
//! reference price is slippage; it is booked either on the closed trade or
//! carried into the new position's entry price. Combined P&L across both legs
//! is the same either way.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::{ExitFill, OpenPosition, PositionSide};

/// Where flip slippage is booked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlippageAttribution {
    /// Closed trade keeps its exchange-reported exit price.
    #[default]
    ClosedLeg,
    /// Closed trade is marked at the reference price and the difference
    /// adjusts the new leg's entry.
    OpenedLeg,
}

/// Dollar slippage of closing `side`/`quantity` at `fill_price` rather than
/// `reference_price`. Positive is favourable.
#[must_use]
pub fn slippage_usd(
    side: PositionSide,
    quantity: Decimal,
    fill_price: Decimal,
    reference_price: Decimal,
) -> Decimal {
    (fill_price - reference_price) * quantity * side.sign()
}

/// Re-mark a flip's closing fill at the reference price.
///
/// Returns the adjusted fill and the slippage that was moved out of it.
#[must_use]
pub fn mark_exit_at_reference(
    closing_side: PositionSide,
    fill: ExitFill,
    reference_price: Decimal,
) -> (ExitFill, Decimal) {
    let slippage = slippage_usd(closing_side, fill.quantity, fill.price, reference_price);
    (
        ExitFill {
            price: reference_price,
            ..fill
        },
        slippage,
    )
}

/// Fold carried slippage into a newly opened position's entry price.
#[must_use]
pub fn carry_into_entry(position: OpenPosition, slippage: Decimal) -> OpenPosition {
    if slippage.is_zero() || position.quantity.is_zero() {
        return position;
    }
    let entry_price = position.entry_price - slippage / (position.side.sign() * position.quantity);
    OpenPosition {
        entry_price,
        entry_notional: entry_price * position.quantity,
        entry_adjustment_usd: position.entry_adjustment_usd + slippage,
        ..position
    }
}
