//! Exchange lot-size rules and quantity quantization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::DomainError;

/// Per-symbol quantity constraints from exchange info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSizeRules {
    /// Quantity increment.
    pub step_size: Decimal,
    /// Smallest accepted quantity.
    pub min_qty: Decimal,
    /// Smallest accepted notional (quantity × price).
    pub min_notional: Decimal,
}

impl LotSizeRules {
    /// Create rules, rejecting a non-positive step.
    ///
    /// # Errors
    ///
    /// Returns error if `step_size` is zero or negative.
    pub fn new(
        step_size: Decimal,
        min_qty: Decimal,
        min_notional: Decimal,
    ) -> Result<Self, DomainError> {
        if step_size <= Decimal::ZERO {
            return Err(DomainError::invalid("step_size", "must be positive"));
        }
        Ok(Self {
            step_size,
            min_qty: min_qty.max(Decimal::ZERO),
            min_notional: min_notional.max(Decimal::ZERO),
        })
    }

    /// Round `quantity` down to a step multiple, never below one step.
    ///
    /// Non-positive input yields zero.
    #[must_use]
    pub fn quantize(&self, quantity: Decimal) -> Decimal {
        if quantity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let floored = (quantity / self.step_size).floor() * self.step_size;
        floored.max(self.step_size).normalize()
    }

    /// Round `quantity` up to the next step multiple.
    #[must_use]
    pub fn ceil_to_step(&self, quantity: Decimal) -> Decimal {
        if quantity <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((quantity / self.step_size).ceil() * self.step_size).normalize()
    }

    /// Quantity to buy `notional_usd` worth at `price`.
    ///
    /// Quantized down, then bumped up to the smallest step multiple that
    /// satisfies both `min_qty` and `min_notional`.
    #[must_use]
    pub fn quantity_for_notional(&self, notional_usd: Decimal, price: Decimal) -> Decimal {
        if price <= Decimal::ZERO || notional_usd <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mut quantity = self.quantize(notional_usd / price);

        if quantity < self.min_qty {
            quantity = self.ceil_to_step(self.min_qty);
        }
        if quantity * price < self.min_notional {
            quantity = self.ceil_to_step(self.min_notional / price);
        }
        quantity
    }

    /// Half a step, the tolerance used when comparing live and target quantities.
    #[must_use]
    pub fn half_step(&self) -> Decimal {
        self.step_size / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn rules() -> LotSizeRules {
        LotSizeRules::new(dec!(0.001), dec!(0.001), dec!(5)).unwrap()
    }

    #[test]
    fn quantize_rounds_down() {
        assert_eq!(rules().quantize(dec!(0.0129)), dec!(0.012));
    }

    #[test]
    fn quantize_minimum_one_step() {
        assert_eq!(rules().quantize(dec!(0.0004)), dec!(0.001));
        assert_eq!(rules().quantize(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn new_rejects_zero_step() {
        assert!(LotSizeRules::new(Decimal::ZERO, dec!(1), dec!(5)).is_err());
    }

    #[test]
    fn quantity_for_notional_plain() {
        // 500 USD at 40_000 = 0.0125 -> 0.012
        assert_eq!(
            rules().quantity_for_notional(dec!(500), dec!(40000)),
            dec!(0.012)
        );
    }

    #[test]
    fn quantity_for_notional_bumps_to_min_notional() {
        let rules = LotSizeRules::new(dec!(1), dec!(1), dec!(100)).unwrap();
        // 30 USD at 7 -> 4 units (28 USD) -> bumped to 15 units (105 USD)
        assert_eq!(rules.quantity_for_notional(dec!(30), dec!(7)), dec!(15));
    }

    #[test]
    fn quantity_for_notional_respects_min_qty() {
        let rules = LotSizeRules::new(dec!(0.1), dec!(0.5), Decimal::ZERO).unwrap();
        assert_eq!(rules.quantity_for_notional(dec!(1), dec!(10)), dec!(0.5));
    }

    proptest! {
        #[test]
        fn quantize_is_step_multiple_and_idempotent(
            raw in 0i64..10_000_000,
            step_exp in 0u32..6,
        ) {
            let step = Decimal::new(1, step_exp);
            let rules = LotSizeRules::new(step, Decimal::ZERO, Decimal::ZERO).unwrap();
            let quantity = Decimal::new(raw, 4);

            let q = rules.quantize(quantity);
            prop_assert!(q >= Decimal::ZERO);
            prop_assert_eq!((q / step).fract(), Decimal::ZERO);
            prop_assert_eq!(rules.quantize(q), q);
        }
    }
}
