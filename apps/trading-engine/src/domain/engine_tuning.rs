//! Process-level tuning that is not admin-mutable.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::market::CandleInterval;
use super::narration::NarratorPolicy;
use super::order_execution::RetryPolicy;
use super::position_lifecycle::SlippageAttribution;
use super::risk_management::LossStreakGuard;

/// Fewest candles that still yield EMA(21).
pub const MIN_CANDLE_LIMIT: usize = 21;

/// Engine tuning loaded from settings at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    /// Share of equity a single order may use.
    pub target_equity_fraction: Decimal,
    /// Orders below this notional are never sent.
    pub min_order_notional_usd: Decimal,
    /// Seconds between any two orders.
    pub order_cooldown_secs: u64,
    /// Min hold used when a plan omits it.
    pub default_min_hold_minutes: u32,
    /// Closed trades kept.
    pub closed_trade_capacity: usize,
    /// Rolling equity samples kept.
    pub equity_capacity: usize,
    /// Activity log entries kept.
    pub log_capacity: usize,
    /// Close-to-flat polling.
    pub close_retry: RetryPolicy,
    /// Open confirmation polling.
    pub open_retry: RetryPolicy,
    /// Recent loss streak guard.
    pub loss_streak: LossStreakGuard,
    /// Narrator rate limits.
    pub narrator: NarratorPolicy,
    /// Kline interval for indicators.
    pub candle_interval: CandleInterval,
    /// Klines fetched per symbol.
    pub candle_limit: usize,
    /// Oracle request timeout.
    pub oracle_timeout_secs: u64,
    /// Where flip slippage is booked.
    pub slippage_attribution: SlippageAttribution,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            target_equity_fraction: dec!(0.5),
            min_order_notional_usd: dec!(10),
            order_cooldown_secs: 60,
            default_min_hold_minutes: 0,
            closed_trade_capacity: 200,
            equity_capacity: 1440,
            log_capacity: 500,
            close_retry: RetryPolicy::CLOSE_DEFAULT,
            open_retry: RetryPolicy::OPEN_DEFAULT,
            loss_streak: LossStreakGuard::default(),
            narrator: NarratorPolicy::default(),
            candle_interval: CandleInterval::FiveMinutes,
            candle_limit: 100,
            oracle_timeout_secs: 30,
            slippage_attribution: SlippageAttribution::ClosedLeg,
        }
    }
}

impl EngineTuning {
    /// Clamp values into their usable ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.candle_limit = self.candle_limit.clamp(MIN_CANDLE_LIMIT, 1500);
        self.target_equity_fraction = self
            .target_equity_fraction
            .clamp(Decimal::ZERO, Decimal::ONE);
        self.min_order_notional_usd = self.min_order_notional_usd.max(Decimal::ZERO);
        self.close_retry.max_attempts = self.close_retry.max_attempts.max(1);
        self.open_retry.max_attempts = self.open_retry.max_attempts.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_enforces_minimum_window() {
        let tuning = EngineTuning {
            candle_limit: 5,
            target_equity_fraction: dec!(3),
            ..EngineTuning::default()
        }
        .normalized();
        assert_eq!(tuning.candle_limit, MIN_CANDLE_LIMIT);
        assert_eq!(tuning.target_equity_fraction, Decimal::ONE);
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let tuning: EngineTuning =
            serde_json::from_str(r#"{"order_cooldown_secs": 5, "candle_interval": "1m"}"#).unwrap();
        assert_eq!(tuning.order_cooldown_secs, 5);
        assert_eq!(tuning.candle_interval, CandleInterval::OneMinute);
        assert_eq!(tuning.closed_trade_capacity, 200);
    }
}
