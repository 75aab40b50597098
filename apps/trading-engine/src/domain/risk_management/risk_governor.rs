//! Risk Governor
//!
//! Clamps a proposed order size to the per-trade cap, the equity fraction and
//! the remaining exposure headroom, and rejects anything below the minimum
//! order notional.

use rust_decimal::Decimal;
use thiserror::Error;

use super::trading_config::TradingConfig;
use crate::domain::position_lifecycle::OpenPosition;
use crate::domain::shared::Symbol;

/// Why an entry was refused by the risk layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskRejection {
    /// Final size is below the exchange/engine minimum notional.
    #[error("order size {size_usd} USD below minimum notional {min_notional_usd} USD")]
    BelowMinNotional {
        /// Clamped size.
        size_usd: Decimal,
        /// Minimum notional.
        min_notional_usd: Decimal,
    },

    /// Realized loss for the UTC day has reached the cap.
    #[error("daily loss limit reached: realized {realized_usd} USD, cap {cap_usd} USD")]
    DailyLossLimit {
        /// Realized P&L today.
        realized_usd: Decimal,
        /// Daily loss cap.
        cap_usd: Decimal,
    },

    /// Too many recent losing trades in a row.
    #[error("loss streak guard tripped: {losses} consecutive losses")]
    LossStreak {
        /// Consecutive losses found within the lookback.
        losses: u32,
    },

    /// Inter-order cooldown has not elapsed.
    #[error("order cooldown active: {remaining_secs}s remaining")]
    Cooldown {
        /// Seconds until orders are allowed again.
        remaining_secs: i64,
    },
}

/// Stateless sizing rules for one tick.
#[derive(Debug, Clone, Copy)]
pub struct RiskGovernor {
    per_trade_cap: Decimal,
    max_exposure: Decimal,
    target_fraction: Decimal,
    min_notional: Decimal,
}

impl RiskGovernor {
    /// Build from the persisted config and process tuning.
    #[must_use]
    pub const fn new(config: &TradingConfig, target_fraction: Decimal, min_notional: Decimal) -> Self {
        Self {
            per_trade_cap: config.max_risk_per_trade_usd,
            max_exposure: config.max_exposure_usd,
            target_fraction,
            min_notional,
        }
    }

    /// `min(perTradeCap, floor(equity × targetFraction))`, never negative.
    #[must_use]
    pub fn size_cap(&self, equity: Decimal) -> Decimal {
        let equity_cap = (equity * self.target_fraction).floor();
        self.per_trade_cap.min(equity_cap).max(Decimal::ZERO)
    }

    /// Exposure left after the open positions, ignoring `replacing`.
    #[must_use]
    pub fn exposure_headroom<'a>(
        &self,
        positions: impl IntoIterator<Item = &'a OpenPosition>,
        replacing: Option<&Symbol>,
    ) -> Decimal {
        let used: Decimal = positions
            .into_iter()
            .filter(|p| Some(&p.symbol) != replacing)
            .map(|p| p.entry_notional.abs())
            .sum();
        (self.max_exposure - used).max(Decimal::ZERO)
    }

    /// Final order size in USD for a proposal.
    ///
    /// A non-positive `proposed_usd` means "use the cap".
    ///
    /// # Errors
    ///
    /// Returns [`RiskRejection::BelowMinNotional`] when the clamped size is
    /// below the minimum notional.
    pub fn size_order<'a>(
        &self,
        proposed_usd: Decimal,
        equity: Decimal,
        positions: impl IntoIterator<Item = &'a OpenPosition>,
        replacing: Option<&Symbol>,
    ) -> Result<Decimal, RiskRejection> {
        let cap = self.size_cap(equity);
        let size = if proposed_usd > Decimal::ZERO {
            proposed_usd.min(cap)
        } else {
            cap
        };
        let size = size.min(self.exposure_headroom(positions, replacing));

        if size < self.min_notional || size <= Decimal::ZERO {
            return Err(RiskRejection::BelowMinNotional {
                size_usd: size,
                min_notional_usd: self.min_notional,
            });
        }
        Ok(size)
    }
}
