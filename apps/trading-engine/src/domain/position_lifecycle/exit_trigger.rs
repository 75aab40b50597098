//! Exit trigger evaluation.
//!
//! Checked every tick for every open position, in priority order:
//!
//! 1. Stop-loss breach (ignores min hold)
//! 2. Take-profit breach (only after min hold)
//! 3. Hard dollar-loss breach (ignores min hold)

use rust_decimal::Decimal;

use super::position::{ExitReason, OpenPosition, PositionSide};
use crate::domain::shared::Timestamp;

/// Returns the exit reason for `position` at `price`, if any.
///
/// `max_loss_per_trade_usd` is taken as an absolute value; zero disables the
/// dollar-loss check.
#[must_use]
pub fn evaluate_exit(
    position: &OpenPosition,
    price: Decimal,
    now: Timestamp,
    max_loss_per_trade_usd: Decimal,
) -> Option<ExitReason> {
    if stop_breached(position, price) {
        return Some(ExitReason::StopLoss);
    }

    if position.min_hold_elapsed(now) && target_reached(position, price) {
        return Some(ExitReason::TakeProfit);
    }

    let cap = max_loss_per_trade_usd.abs();
    if cap > Decimal::ZERO && position.unrealized_pnl(price) <= -cap {
        return Some(ExitReason::MaxLoss);
    }

    None
}

fn stop_breached(position: &OpenPosition, price: Decimal) -> bool {
    position.stop_loss_price.is_some_and(|stop| match position.side {
        PositionSide::Long => price <= stop,
        PositionSide::Short => price >= stop,
    })
}

fn target_reached(position: &OpenPosition, price: Decimal) -> bool {
    position
        .take_profit_price
        .is_some_and(|target| match position.side {
            PositionSide::Long => price >= target,
            PositionSide::Short => price <= target,
        })
}
