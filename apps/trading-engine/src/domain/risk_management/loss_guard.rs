//! Entry guards driven by realized results: daily loss and loss streaks.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::risk_governor::RiskRejection;
use crate::domain::position_lifecycle::ClosedTrade;
use crate::domain::shared::Timestamp;

/// Blocks entries after a run of recent losing trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossStreakGuard {
    /// Master switch.
    pub enabled: bool,
    /// Consecutive losses that trip the guard.
    pub streak_length: u32,
    /// Only trades closed within this window count.
    pub lookback_minutes: u32,
    /// A trade counts as a loss when P&L is at or below `-loss_threshold_usd`.
    pub loss_threshold_usd: Decimal,
}

impl Default for LossStreakGuard {
    fn default() -> Self {
        Self {
            enabled: true,
            streak_length: 3,
            lookback_minutes: 60,
            loss_threshold_usd: Decimal::ZERO,
        }
    }
}

impl LossStreakGuard {
    /// Count trailing consecutive losses within the lookback window.
    ///
    /// `closed` is ordered oldest first.
    #[must_use]
    pub fn recent_losses(&self, closed: &[ClosedTrade], now: Timestamp) -> u32 {
        let window_start = now.plus(-chrono::Duration::minutes(i64::from(self.lookback_minutes)));
        let mut losses = 0;
        for trade in closed.iter().rev() {
            if trade.closed_at < window_start {
                break;
            }
            if !self.counts_as_loss(trade) {
                break;
            }
            losses += 1;
        }
        losses
    }

    fn counts_as_loss(&self, trade: &ClosedTrade) -> bool {
        if self.loss_threshold_usd > Decimal::ZERO {
            trade.realized_pnl <= -self.loss_threshold_usd
        } else {
            trade.is_loss()
        }
    }

    /// Check the guard.
    ///
    /// # Errors
    ///
    /// Returns [`RiskRejection::LossStreak`] when tripped.
    pub fn check(&self, closed: &[ClosedTrade], now: Timestamp) -> Result<(), RiskRejection> {
        if !self.enabled || self.streak_length == 0 {
            return Ok(());
        }
        let losses = self.recent_losses(closed, now);
        if losses >= self.streak_length {
            return Err(RiskRejection::LossStreak { losses });
        }
        Ok(())
    }
}

/// Realized P&L of trades closed on `day` (UTC).
#[must_use]
pub fn realized_pnl_for_day(closed: &[ClosedTrade], day: NaiveDate) -> Decimal {
    closed
        .iter()
        .filter(|t| t.closed_at.utc_date() == day)
        .map(|t| t.realized_pnl)
        .sum()
}

/// Check the daily loss cap.
///
/// # Errors
///
/// Returns [`RiskRejection::DailyLossLimit`] when today's realized P&L is at
/// or below `-max_daily_loss_usd`.
pub fn check_daily_loss(
    closed: &[ClosedTrade],
    now: Timestamp,
    max_daily_loss_usd: Decimal,
) -> Result<(), RiskRejection> {
    let cap = max_daily_loss_usd.abs();
    if cap.is_zero() {
        return Ok(());
    }
    let realized = realized_pnl_for_day(closed, now.utc_date());
    if realized <= -cap {
        return Err(RiskRejection::DailyLossLimit {
            realized_usd: realized,
            cap_usd: cap,
        });
    }
    Ok(())
}
