//! Partial fill accumulation.

use rust_decimal::Decimal;

/// Running totals of filled quantity and notional across polls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillAccumulator {
    filled_qty: Decimal,
    filled_notional: Decimal,
}

impl FillAccumulator {
    /// Empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filled_qty: Decimal::ZERO,
            filled_notional: Decimal::ZERO,
        }
    }

    /// Record `quantity` filled at `price`. Non-positive quantities are ignored.
    pub fn record(&mut self, quantity: Decimal, price: Decimal) {
        if quantity <= Decimal::ZERO {
            return;
        }
        self.filled_qty += quantity;
        self.filled_notional += quantity * price;
    }

    /// Total filled quantity.
    #[must_use]
    pub const fn filled_qty(&self) -> Decimal {
        self.filled_qty
    }

    /// Total filled notional.
    #[must_use]
    pub const fn filled_notional(&self) -> Decimal {
        self.filled_notional
    }

    /// Volume weighted average fill price.
    #[must_use]
    pub fn vwap(&self) -> Option<Decimal> {
        if self.filled_qty.is_zero() {
            None
        } else {
            Some(self.filled_notional / self.filled_qty)
        }
    }
}
