//! Status summaries emitted by the narrator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::position_lifecycle::{OpenPosition, PositionSide};
use crate::domain::shared::Symbol;

/// Closest stop-loss to the current price across open positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invalidation {
    /// Position symbol.
    pub symbol: Symbol,
    /// Stop-loss level.
    pub stop_price: Decimal,
    /// Distance from price to stop as % of price.
    pub distance_pct: Decimal,
}

/// Snapshot of what the engine is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    /// Latest signal.
    pub signal: String,
    /// Open positions.
    pub open_positions: usize,
    /// Sum of open notionals at current prices.
    pub exposure_usd: Decimal,
    /// Sum of unrealized P&L at current prices.
    pub unrealized_pnl: Decimal,
    /// Account equity.
    pub equity: Decimal,
    /// Nearest stop-loss, if any position has one.
    pub nearest_invalidation: Option<Invalidation>,
}

impl StatusSummary {
    /// Build from the open positions at `price_of`.
    ///
    /// Positions without a price are valued at entry.
    #[must_use]
    pub fn build<'a>(
        signal: impl Into<String>,
        positions: impl IntoIterator<Item = &'a OpenPosition>,
        equity: Decimal,
        price_of: impl Fn(&Symbol) -> Option<Decimal>,
    ) -> Self {
        let mut open_positions = 0;
        let mut exposure_usd = Decimal::ZERO;
        let mut unrealized_pnl = Decimal::ZERO;
        let mut nearest_invalidation: Option<Invalidation> = None;

        for position in positions {
            open_positions += 1;
            let price = price_of(&position.symbol).unwrap_or(position.entry_price);
            exposure_usd += position.notional_at(price);
            unrealized_pnl += position.unrealized_pnl(price);

            let Some(stop) = position.stop_loss_price else {
                continue;
            };
            if price.is_zero() {
                continue;
            }
            let distance = match position.side {
                PositionSide::Long => price - stop,
                PositionSide::Short => stop - price,
            };
            let distance_pct = (distance / price * Decimal::ONE_HUNDRED).round_dp(2);
            if nearest_invalidation
                .as_ref()
                .is_none_or(|n| distance_pct < n.distance_pct)
            {
                nearest_invalidation = Some(Invalidation {
                    symbol: position.symbol.clone(),
                    stop_price: stop,
                    distance_pct,
                });
            }
        }

        Self {
            signal: signal.into(),
            open_positions,
            exposure_usd: exposure_usd.round_dp(2),
            unrealized_pnl: unrealized_pnl.round_dp(2),
            equity: equity.round_dp(2),
            nearest_invalidation,
        }
    }

    /// One-line message for the activity log.
    #[must_use]
    pub fn message(&self) -> String {
        let invalidation = self.nearest_invalidation.as_ref().map_or_else(
            || "none".to_string(),
            |n| format!("{} stop {} ({}% away)", n.symbol, n.stop_price, n.distance_pct),
        );
        format!(
            "signal={} positions={} exposure=${} uPnL=${} equity=${} invalidation={}",
            self.signal,
            self.open_positions,
            self.exposure_usd,
            self.unrealized_pnl,
            self.equity,
            invalidation
        )
    }

    /// SHA-256 hex over the qualitative content.
    ///
    /// Equity is left out; the narrator compares it separately against a
    /// threshold. Dollar amounts are rounded to whole USD so tick noise does
    /// not defeat deduplication.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let invalidation = self
            .nearest_invalidation
            .as_ref()
            .map(|n| format!("{}@{}:{}", n.symbol, n.stop_price, n.distance_pct.round_dp(1)))
            .unwrap_or_default();
        let canonical = format!(
            "{}|{}|{}|{}|{}",
            self.signal,
            self.open_positions,
            self.exposure_usd.round(),
            self.unrealized_pnl.round(),
            invalidation
        );
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position_lifecycle::position::tests::long_position;
    use rust_decimal_macros::dec;

    #[test]
    fn build_picks_nearest_stop() {
        let mut btc = long_position("BTCUSDT", dec!(100), dec!(2));
        btc.stop_loss_price = Some(dec!(95));
        let mut eth = long_position("ETHUSDT", dec!(50), dec!(1));
        eth.stop_loss_price = Some(dec!(49));
        let positions = [btc, eth];

        let summary = StatusSummary::build("FLAT", &positions, dec!(1000), |s| {
            if s.as_str() == "BTCUSDT" {
                Some(dec!(100))
            } else {
                Some(dec!(50))
            }
        });

        assert_eq!(summary.open_positions, 2);
        assert_eq!(summary.exposure_usd, dec!(250));
        let nearest = summary.nearest_invalidation.unwrap();
        assert_eq!(nearest.symbol.as_str(), "ETHUSDT");
        assert_eq!(nearest.distance_pct, dec!(2));
    }

    #[test]
    fn fingerprint_ignores_equity_and_cents() {
        let a = StatusSummary::build("FLAT", [], dec!(1000), |_| None);
        let b = StatusSummary::build("FLAT", [], dec!(1000.4), |_| None);
        let c = StatusSummary::build("LONG BTCUSDT", [], dec!(1000), |_| None);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn message_mentions_invalidation() {
        let summary = StatusSummary::build("FLAT", [], dec!(10), |_| None);
        assert!(summary.message().contains("invalidation=none"));
    }
}
