//! Open positions and closed trades.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::order_execution::OrderSide;
use crate::domain::shared::{Symbol, Timestamp};

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    /// Profits when price rises.
    Long,
    /// Profits when price falls.
    Short,
}

impl PositionSide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// +1 for long, -1 for short.
    #[must_use]
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Order side that opens (or adds to) this position.
    #[must_use]
    pub const fn entry_order_side(&self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Order side that reduces this position.
    #[must_use]
    pub const fn exit_order_side(&self) -> OrderSide {
        self.entry_order_side().opposite()
    }

    /// Side implied by a signed exchange position amount.
    ///
    /// Returns `None` for a flat (zero) amount.
    #[must_use]
    pub fn from_signed_amount(amount: Decimal) -> Option<Self> {
        if amount > Decimal::ZERO {
            Some(Self::Long)
        } else if amount < Decimal::ZERO {
            Some(Self::Short)
        } else {
            None
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// Stop-loss price breached.
    StopLoss,
    /// Take-profit price reached after the min hold.
    TakeProfit,
    /// Unrealized loss reached the hard per-trade dollar cap.
    MaxLoss,
    /// Closed to open the opposite side.
    Flip,
    /// Exchange already reported the position flat.
    ExchangeFlat,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StopLoss => "STOP_LOSS",
            Self::TakeProfit => "TAKE_PROFIT",
            Self::MaxLoss => "MAX_LOSS",
            Self::Flip => "FLIP",
            Self::ExchangeFlat => "EXCHANGE_FLAT",
        };
        f.write_str(s)
    }
}

/// Oracle provider and model that proposed a position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Inference provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
}

/// A position the engine opened and has not yet closed.
///
/// At most one per symbol. Replaced whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPosition {
    /// Contract symbol.
    pub symbol: Symbol,
    /// LONG or SHORT.
    pub side: PositionSide,
    /// Absolute base quantity.
    pub quantity: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// `quantity * entry_price` at open.
    pub entry_notional: Decimal,
    /// Fill confirmation time.
    pub opened_at: Timestamp,
    /// Protective stop.
    pub stop_loss_price: Option<Decimal>,
    /// Profit target.
    pub take_profit_price: Option<Decimal>,
    /// Take-profit is ignored until this many minutes have elapsed.
    pub min_hold_minutes: u32,
    /// Oracle rationale.
    pub thesis: String,
    /// Oracle provider and model.
    pub provenance: Provenance,
    /// Flip slippage folded into `entry_price`, in USD of P&L over the whole
    /// quantity. Zero unless the position was opened by a flip.
    #[serde(default)]
    pub entry_adjustment_usd: Decimal,
}

impl OpenPosition {
    /// Mark-to-market P&L at `price`.
    #[must_use]
    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity * self.side.sign()
    }

    /// Notional at `price`.
    #[must_use]
    pub fn notional_at(&self, price: Decimal) -> Decimal {
        self.quantity * price
    }

    /// Per-unit price shift applied to the entry by carried slippage.
    fn entry_shift(&self) -> Decimal {
        if self.entry_adjustment_usd.is_zero() || self.quantity.is_zero() {
            return Decimal::ZERO;
        }
        self.entry_adjustment_usd / (self.side.sign() * self.quantity)
    }

    /// Whole minutes the position has been held.
    #[must_use]
    pub fn held_minutes(&self, now: Timestamp) -> i64 {
        now.seconds_since(self.opened_at) / 60
    }

    /// True once the min-hold window has passed.
    #[must_use]
    pub fn min_hold_elapsed(&self, now: Timestamp) -> bool {
        now.seconds_since(self.opened_at) >= i64::from(self.min_hold_minutes) * 60
    }

    /// Close the position at a confirmed exit.
    ///
    /// An exchange-reported entry replaces the recorded one, shifted by any
    /// carried flip slippage so realized and unrealized P&L agree.
    #[must_use]
    pub fn close(self, exit: ExitFill) -> ClosedTrade {
        let entry_price = match exit.reported_entry_price {
            Some(reported) => reported - self.entry_shift(),
            None => self.entry_price,
        };
        let quantity = if exit.quantity > Decimal::ZERO {
            exit.quantity
        } else {
            self.quantity
        };
        let realized_pnl = (exit.price - entry_price) * quantity * self.side.sign();
        let holding_seconds = exit.closed_at.seconds_since(self.opened_at);

        ClosedTrade {
            position: Self {
                quantity,
                entry_price,
                entry_notional: entry_price * quantity,
                ..self
            },
            exit_price: exit.price,
            exit_notional: exit.price * quantity,
            closed_at: exit.closed_at,
            holding_seconds,
            realized_pnl,
            exit_reason: exit.reason,
        }
    }
}

/// Exchange-confirmed exit used to close an [`OpenPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitFill {
    /// Volume weighted exit price.
    pub price: Decimal,
    /// Quantity closed; zero means "the recorded quantity".
    pub quantity: Decimal,
    /// Entry price as reported by the exchange, when available.
    pub reported_entry_price: Option<Decimal>,
    /// Confirmation time.
    pub closed_at: Timestamp,
    /// Exit reason.
    pub reason: ExitReason,
}

/// A position that reached flat. Created exactly once per position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTrade {
    /// Position as it was held.
    #[serde(flatten)]
    pub position: OpenPosition,
    /// Volume weighted exit price.
    pub exit_price: Decimal,
    /// `quantity * exit_price`.
    pub exit_notional: Decimal,
    /// Confirmation time.
    pub closed_at: Timestamp,
    /// Seconds between open and close.
    pub holding_seconds: i64,
    /// Realized P&L in USD.
    pub realized_pnl: Decimal,
    /// Exit reason.
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    /// True when the trade lost money.
    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.realized_pnl < Decimal::ZERO
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn long_position(symbol: &str, entry: Decimal, quantity: Decimal) -> OpenPosition {
        OpenPosition {
            symbol: Symbol::new(symbol),
            side: PositionSide::Long,
            quantity,
            entry_price: entry,
            entry_notional: entry * quantity,
            opened_at: Timestamp::parse("2026-01-19T12:00:00Z").unwrap(),
            stop_loss_price: None,
            take_profit_price: None,
            min_hold_minutes: 0,
            thesis: "test".to_string(),
            provenance: Provenance::default(),
            entry_adjustment_usd: Decimal::ZERO,
        }
    }

    #[test]
    fn unrealized_pnl_long_and_short() {
        let long = long_position("BTCUSDT", dec!(100), dec!(2));
        assert_eq!(long.unrealized_pnl(dec!(94)), dec!(-12));

        let short = OpenPosition {
            side: PositionSide::Short,
            ..long
        };
        assert_eq!(short.unrealized_pnl(dec!(94)), dec!(12));
    }

    #[test]
    fn min_hold_elapsed() {
        let mut pos = long_position("BTCUSDT", dec!(100), dec!(1));
        pos.min_hold_minutes = 5;
        let opened = pos.opened_at;

        assert!(!pos.min_hold_elapsed(opened.plus(chrono::Duration::seconds(299))));
        assert!(pos.min_hold_elapsed(opened.plus(chrono::Duration::minutes(5))));
        assert_eq!(pos.held_minutes(opened.plus(chrono::Duration::seconds(299))), 4);
    }

    #[test]
    fn close_uses_reported_entry_price() {
        let pos = long_position("BTCUSDT", dec!(100), dec!(2));
        let closed_at = pos.opened_at.plus(chrono::Duration::minutes(3));

        let trade = pos.close(ExitFill {
            price: dec!(105),
            quantity: dec!(2),
            reported_entry_price: Some(dec!(101)),
            closed_at,
            reason: ExitReason::TakeProfit,
        });

        assert_eq!(trade.realized_pnl, dec!(8));
        assert_eq!(trade.position.entry_price, dec!(101));
        assert_eq!(trade.exit_notional, dec!(210));
        assert_eq!(trade.holding_seconds, 180);
        assert!(!trade.is_loss());
    }

    #[test]
    fn close_keeps_carried_adjustment_over_reported_entry() {
        // Short 2 filled at 99, with -1 of flip slippage carried in.
        let mut pos = long_position("BTCUSDT", dec!(98.5), dec!(2));
        pos.side = PositionSide::Short;
        pos.entry_adjustment_usd = dec!(-1);
        let closed_at = pos.opened_at;

        let trade = pos.close(ExitFill {
            price: dec!(99),
            quantity: dec!(2),
            reported_entry_price: Some(dec!(99)),
            closed_at,
            reason: ExitReason::TakeProfit,
        });

        assert_eq!(trade.position.entry_price, dec!(98.5));
        assert_eq!(trade.realized_pnl, dec!(-1));
    }

    #[test]
    fn close_with_zero_quantity_uses_recorded_quantity() {
        let pos = long_position("BTCUSDT", dec!(100), dec!(2));
        let closed_at = pos.opened_at;
        let trade = pos.close(ExitFill {
            price: dec!(94),
            quantity: Decimal::ZERO,
            reported_entry_price: None,
            closed_at,
            reason: ExitReason::ExchangeFlat,
        });

        assert_eq!(trade.realized_pnl, dec!(-12));
        assert!(trade.is_loss());
    }

    #[test]
    fn closed_trade_serializes_flat() {
        let pos = long_position("ETHUSDT", dec!(10), dec!(1));
        let closed_at = pos.opened_at;
        let trade = pos.close(ExitFill {
            price: dec!(9),
            quantity: dec!(1),
            reported_entry_price: None,
            closed_at,
            reason: ExitReason::StopLoss,
        });

        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["symbol"], "ETHUSDT");
        assert_eq!(json["exitReason"], "STOP_LOSS");
        assert_eq!(json["side"], "LONG");
    }

    #[test]
    fn side_from_signed_amount() {
        assert_eq!(PositionSide::from_signed_amount(dec!(0.5)), Some(PositionSide::Long));
        assert_eq!(PositionSide::from_signed_amount(dec!(-1)), Some(PositionSide::Short));
        assert_eq!(PositionSide::from_signed_amount(Decimal::ZERO), None);
        assert_eq!(PositionSide::Long.exit_order_side(), OrderSide::Sell);
    }
}
