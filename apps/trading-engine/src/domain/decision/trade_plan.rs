//! Trade plans returned by the decision oracle.
//!
//! Oracle output is untrusted. It is parsed through a strict tagged schema and
//! validated against the universe and the current prices; anything that does
//! not pass becomes a [`PlanRejection`], which the tick treats as FLAT.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::PlanRejection;
use crate::domain::position_lifecycle::PositionSide;
use crate::domain::shared::Symbol;

/// Entry fields shared by LONG and SHORT plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPlan {
    /// Contract to trade.
    pub symbol: Symbol,
    /// Proposed order size in USD; absent means "use the risk cap".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_usd: Option<Decimal>,
    /// Oracle rationale.
    #[serde(default)]
    pub thesis: String,
    /// Protective stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_price: Option<Decimal>,
    /// Profit target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_price: Option<Decimal>,
    /// Minutes before take-profit may fire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_hold_minutes: Option<u32>,
}

/// A validated oracle decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum TradePlan {
    /// Open or hold a long position.
    Long(EntryPlan),
    /// Open or hold a short position.
    Short(EntryPlan),
    /// Do nothing.
    Flat {
        /// Oracle rationale, or the rejection reason.
        #[serde(default)]
        thesis: String,
    },
}

impl TradePlan {
    /// FLAT with a reason.
    #[must_use]
    pub fn flat(thesis: impl Into<String>) -> Self {
        Self::Flat {
            thesis: thesis.into(),
        }
    }

    /// Side and entry fields, or `None` for FLAT.
    #[must_use]
    pub const fn entry(&self) -> Option<(PositionSide, &EntryPlan)> {
        match self {
            Self::Long(entry) => Some((PositionSide::Long, entry)),
            Self::Short(entry) => Some((PositionSide::Short, entry)),
            Self::Flat { .. } => None,
        }
    }

    /// Signal label recorded in runtime state.
    #[must_use]
    pub fn signal(&self) -> String {
        match self {
            Self::Long(entry) => format!("LONG {}", entry.symbol),
            Self::Short(entry) => format!("SHORT {}", entry.symbol),
            Self::Flat { .. } => "FLAT".to_string(),
        }
    }

    /// True for FLAT.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        matches!(self, Self::Flat { .. })
    }

    /// Parse raw oracle text and validate it.
    ///
    /// `price_of` returns the latest price for a symbol when known.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanRejection`] for malformed JSON, an unknown action, an
    /// out-of-universe symbol, non-positive size or levels, or inverted
    /// stop/target ordering.
    pub fn parse(
        raw: &str,
        universe: &[Symbol],
        price_of: impl Fn(&Symbol) -> Option<Decimal>,
    ) -> Result<Self, PlanRejection> {
        let body = strip_code_fences(raw);
        let plan: Self = serde_json::from_str(body)
            .map_err(|e| PlanRejection::Malformed(e.to_string()))?;
        plan.validate(universe, price_of)
    }

    fn validate(
        self,
        universe: &[Symbol],
        price_of: impl Fn(&Symbol) -> Option<Decimal>,
    ) -> Result<Self, PlanRejection> {
        if let Some((side, entry)) = self.entry() {
            if !universe.contains(&entry.symbol) {
                return Err(PlanRejection::OutsideUniverse(entry.symbol.clone()));
            }
            if let Some(size) = entry.size_usd.filter(|s| *s <= Decimal::ZERO) {
                return Err(PlanRejection::NonPositiveSize(size));
            }
            for (field, level) in [
                ("stopLossPrice", entry.stop_loss_price),
                ("takeProfitPrice", entry.take_profit_price),
            ] {
                if let Some(value) = level.filter(|v| *v <= Decimal::ZERO) {
                    return Err(PlanRejection::NonPositiveLevel { field, value });
                }
            }

            let reference = price_of(&entry.symbol);
            check_ordering(side, entry.stop_loss_price, reference, entry.take_profit_price)?;
        }
        Ok(self)
    }
}

/// Levels must read stop < price < target for LONG and the mirror for SHORT.
/// Missing values are skipped.
fn check_ordering(
    side: PositionSide,
    stop: Option<Decimal>,
    price: Option<Decimal>,
    target: Option<Decimal>,
) -> Result<(), PlanRejection> {
    let ladder: Vec<Decimal> = [stop, price, target].into_iter().flatten().collect();
    let ordered = ladder.windows(2).all(|w| match side {
        PositionSide::Long => w[0] < w[1],
        PositionSide::Short => w[0] > w[1],
    });
    if ordered {
        Ok(())
    } else {
        Err(PlanRejection::InvertedLevels {
            side,
            stop_loss: stop,
            price,
            take_profit: target,
        })
    }
}

/// Remove markdown code fences wrapped around a JSON body.
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn universe() -> Vec<Symbol> {
        vec![Symbol::new("BTCUSDT"), Symbol::new("ETHUSDT")]
    }

    fn price(_: &Symbol) -> Option<Decimal> {
        Some(dec!(100))
    }

    #[test]
    fn parses_long_plan() {
        let raw = r#"{"action":"LONG","symbol":"btcusdt","sizeUsd":250,"thesis":"breakout",
            "stopLossPrice":95,"takeProfitPrice":110,"minHoldMinutes":5}"#;
        let plan = TradePlan::parse(raw, &universe(), price).unwrap();

        let (side, entry) = plan.entry().unwrap();
        assert_eq!(side, PositionSide::Long);
        assert_eq!(entry.symbol.as_str(), "BTCUSDT");
        assert_eq!(entry.size_usd, Some(dec!(250)));
        assert_eq!(entry.min_hold_minutes, Some(5));
        assert_eq!(plan.signal(), "LONG BTCUSDT");
    }

    #[test]
    fn parses_fenced_flat_plan() {
        let raw = "```json\n{\"action\":\"FLAT\",\"thesis\":\"chop\"}\n```";
        let plan = TradePlan::parse(raw, &universe(), price).unwrap();
        assert_eq!(plan, TradePlan::flat("chop"));
    }

    #[test]
    fn strip_code_fences_variants() {
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn rejects_unknown_or_missing_action() {
        for raw in [
            r#"{"action":"HOLD","symbol":"BTCUSDT"}"#,
            r#"{"symbol":"BTCUSDT"}"#,
            "not json",
        ] {
            let err = TradePlan::parse(raw, &universe(), price).unwrap_err();
            assert!(matches!(err, PlanRejection::Malformed(_)), "{raw}");
        }
    }

    #[test]
    fn rejects_symbol_outside_universe() {
        let raw = r#"{"action":"SHORT","symbol":"DOGEUSDT"}"#;
        assert_eq!(
            TradePlan::parse(raw, &universe(), price),
            Err(PlanRejection::OutsideUniverse(Symbol::new("DOGEUSDT")))
        );
    }

    #[test]
    fn rejects_non_positive_size_and_levels() {
        let raw = r#"{"action":"LONG","symbol":"BTCUSDT","sizeUsd":0}"#;
        assert!(matches!(
            TradePlan::parse(raw, &universe(), price),
            Err(PlanRejection::NonPositiveSize(_))
        ));

        let raw = r#"{"action":"LONG","symbol":"BTCUSDT","stopLossPrice":-1}"#;
        assert!(matches!(
            TradePlan::parse(raw, &universe(), price),
            Err(PlanRejection::NonPositiveLevel { .. })
        ));
    }

    #[test]
    fn rejects_inverted_levels() {
        // LONG with the stop above the target.
        let raw = r#"{"action":"LONG","symbol":"BTCUSDT","stopLossPrice":110,"takeProfitPrice":95}"#;
        assert!(matches!(
            TradePlan::parse(raw, &universe(), |_| None),
            Err(PlanRejection::InvertedLevels { .. })
        ));

        // SHORT stop below the current price.
        let raw = r#"{"action":"SHORT","symbol":"ETHUSDT","stopLossPrice":99}"#;
        assert!(matches!(
            TradePlan::parse(raw, &universe(), price),
            Err(PlanRejection::InvertedLevels { .. })
        ));
    }

    #[test]
    fn short_plan_with_mirrored_levels_is_valid() {
        let raw = r#"{"action":"SHORT","symbol":"ETHUSDT","stopLossPrice":105,"takeProfitPrice":90}"#;
        assert!(TradePlan::parse(raw, &universe(), price).is_ok());
    }

    #[test]
    fn plan_serializes_with_action_tag() {
        let json = serde_json::to_value(TradePlan::flat("quiet")).unwrap();
        assert_eq!(json["action"], "FLAT");
        assert_eq!(json["thesis"], "quiet");
    }
}
