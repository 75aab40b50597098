//! Market snapshot handed to the decision oracle.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::indicators::SymbolIndicators;
use crate::domain::position_lifecycle::{OpenPosition, PositionSide};
use crate::domain::shared::{Symbol, Timestamp};

/// Open position as presented to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    /// Contract symbol.
    pub symbol: Symbol,
    /// LONG or SHORT.
    pub side: PositionSide,
    /// Base quantity.
    pub quantity: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Mark-to-market P&L at the snapshot price, if a price was available.
    pub unrealized_pnl: Option<Decimal>,
    /// Minutes since the position was opened.
    pub held_minutes: i64,
}

impl PositionView {
    /// Project an open position at `price`.
    #[must_use]
    pub fn from_position(position: &OpenPosition, price: Option<Decimal>, now: Timestamp) -> Self {
        Self {
            symbol: position.symbol.clone(),
            side: position.side,
            quantity: position.quantity,
            entry_price: position.entry_price,
            unrealized_pnl: price.map(|p| position.unrealized_pnl(p)),
            held_minutes: position.held_minutes(now),
        }
    }
}

/// Per-tick view of account and market state.
///
/// Per-symbol fetch failures appear as `null` entries; the snapshot itself is
/// always produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// Snapshot time.
    pub as_of: Timestamp,
    /// Account equity in USD.
    pub equity: Decimal,
    /// Open positions.
    pub positions: Vec<PositionView>,
    /// Tradeable symbols.
    pub universe: Vec<Symbol>,
    /// Latest price per symbol.
    pub prices: BTreeMap<Symbol, Option<Decimal>>,
    /// 24h percent change per symbol.
    #[serde(rename = "change24h")]
    pub change_24h: BTreeMap<Symbol, Option<f64>>,
    /// Indicator set per symbol.
    pub indicators: BTreeMap<Symbol, Option<SymbolIndicators>>,
}

impl MarketSnapshot {
    /// Latest known price for `symbol`.
    #[must_use]
    pub fn price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.get(symbol).copied().flatten()
    }
}

/// Risk limits stated to the oracle alongside the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskConstraints {
    /// Largest single order in USD.
    pub max_risk_per_trade_usd: Decimal,
    /// Cap on the sum of open notionals.
    pub max_exposure_usd: Decimal,
    /// Realized daily loss that halts entries.
    pub max_daily_loss_usd: Decimal,
    /// Hard dollar loss per position.
    pub max_loss_per_trade_usd: Decimal,
    /// Maximum leverage.
    pub leverage_cap: u32,
    /// Allowed symbols.
    pub universe: Vec<Symbol>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn snapshot_serializes_camel_case_with_nulls() {
        let btc = Symbol::new("BTCUSDT");
        let snapshot = MarketSnapshot {
            as_of: Timestamp::parse("2026-01-19T12:00:00Z").unwrap(),
            equity: dec!(1000),
            positions: vec![],
            universe: vec![btc.clone()],
            prices: BTreeMap::from([(btc.clone(), None)]),
            change_24h: BTreeMap::from([(btc.clone(), Some(1.5))]),
            indicators: BTreeMap::from([(btc, None)]),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("asOf").is_some());
        assert!(json["prices"]["BTCUSDT"].is_null());
        assert_eq!(json["change24h"]["BTCUSDT"], 1.5);
    }

    #[test]
    fn price_lookup_flattens_missing() {
        let snapshot = MarketSnapshot {
            as_of: Timestamp::now(),
            equity: Decimal::ZERO,
            positions: vec![],
            universe: vec![],
            prices: BTreeMap::from([(Symbol::new("ETHUSDT"), Some(dec!(2500)))]),
            change_24h: BTreeMap::new(),
            indicators: BTreeMap::new(),
        };
        assert_eq!(snapshot.price(&Symbol::new("ETHUSDT")), Some(dec!(2500)));
        assert_eq!(snapshot.price(&Symbol::new("BTCUSDT")), None);
    }
}
