//! Oracle plan rejections.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::position_lifecycle::PositionSide;
use crate::domain::shared::Symbol;

/// Why an oracle plan was discarded. Every rejection degrades to FLAT.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanRejection {
    /// Not JSON, or JSON that does not match the plan schema.
    #[error("malformed plan: {0}")]
    Malformed(String),

    /// Symbol is not in the configured universe.
    #[error("symbol {0} is outside the universe")]
    OutsideUniverse(Symbol),

    /// Proposed size is zero or negative.
    #[error("non-positive size {0}")]
    NonPositiveSize(Decimal),

    /// A price level is zero or negative.
    #[error("non-positive {field}: {value}")]
    NonPositiveLevel {
        /// Plan field name.
        field: &'static str,
        /// Offending value.
        value: Decimal,
    },

    /// Stop, price and target are not ordered for the side.
    #[error("inverted levels for {side}: stop {stop_loss:?}, price {price:?}, target {take_profit:?}")]
    InvertedLevels {
        /// Plan side.
        side: PositionSide,
        /// Stop-loss level.
        stop_loss: Option<Decimal>,
        /// Reference price.
        price: Option<Decimal>,
        /// Take-profit level.
        take_profit: Option<Decimal>,
    },
}
