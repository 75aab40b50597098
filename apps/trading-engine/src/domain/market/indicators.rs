//! Technical indicators over OHLCV series.
//!
//! All functions are pure and return `None` when the window is too short or
//! the result is undefined, so the snapshot can publish `null` instead of a
//! misleading number.
//!
//! - EMA: seeded with the first value, `k = 2 / (period + 1)`.
//! - RSI: seed averages over the first `period` changes, Wilder smoothing after.
//! - ATR: true range from the second candle, seed mean then Wilder smoothing.
//! - VWAP: typical-price weighted over the whole window.
//! - Range compression: high/low span of the last 30 bars as % of last close.

use serde::{Deserialize, Serialize};

use super::candle::Candle;

/// Bars considered by [`range_compression_pct`].
pub const RANGE_COMPRESSION_WINDOW: usize = 30;

/// Exponential moving average of `values`.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    if period == 0 {
        return None;
    }
    let k = 2.0 / (period as f64 + 1.0);
    Some(rest.iter().fold(*first, |acc, v| v * k + acc * (1.0 - k)))
}

/// Relative strength index of `closes`.
///
/// Needs at least `period + 1` closes. An average loss of zero yields 100.
#[must_use]
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, tail) = changes.split_at(period);

    let mut avg_gain = seed.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = -seed.iter().filter(|c| **c < 0.0).sum::<f64>() / period as f64;

    let n = period as f64;
    for change in tail {
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (n - 1.0) + gain) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss) / n;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

/// Average true range of `candles`.
///
/// Needs at least `period + 1` candles since the first bar has no previous close.
#[must_use]
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            let prev_close = w[0].close;
            let bar = &w[1];
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .collect();

    let (seed, tail) = true_ranges.split_at(period);
    let n = period as f64;
    let initial = seed.iter().sum::<f64>() / n;
    Some(tail.iter().fold(initial, |acc, tr| (acc * (n - 1.0) + tr) / n))
}

/// Volume weighted average price over the whole window.
#[must_use]
pub fn vwap(candles: &[Candle]) -> Option<f64> {
    let (pv, volume) = candles.iter().fold((0.0, 0.0), |(pv, vol), c| {
        (pv + c.typical_price() * c.volume, vol + c.volume)
    });
    if volume == 0.0 {
        return None;
    }
    Some(pv / volume)
}

/// High/low span of the trailing window as a percentage of the last close.
#[must_use]
pub fn range_compression_pct(candles: &[Candle]) -> Option<f64> {
    let last_close = candles.last()?.close;
    if last_close == 0.0 {
        return None;
    }
    let start = candles.len().saturating_sub(RANGE_COMPRESSION_WINDOW);
    let window = &candles[start..];
    let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    Some((high - low) / last_close * 100.0)
}

/// Indicator set published per symbol in the market snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolIndicators {
    /// EMA(9) of closes.
    pub ema9: Option<f64>,
    /// EMA(21) of closes.
    pub ema21: Option<f64>,
    /// RSI(14) of closes.
    pub rsi14: Option<f64>,
    /// ATR(14).
    pub atr14: Option<f64>,
    /// Window VWAP.
    pub vwap: Option<f64>,
    /// Trailing range as % of last close.
    pub range_compression_pct: Option<f64>,
}

impl SymbolIndicators {
    /// Compute the full indicator set from a candle window.
    #[must_use]
    pub fn from_candles(candles: &[Candle]) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        Self {
            ema9: ema(&closes, 9),
            ema21: ema(&closes, 21),
            rsi14: rsi(&closes, 14),
            atr14: atr(candles, 14),
            vwap: vwap(candles),
            range_compression_pct: range_compression_pct(candles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Timestamp;
    use test_case::test_case;

    fn bar(high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            open_time: Timestamp::now(),
            open: close,
            high,
            low,
            close,
            volume,
        }
    }

    fn flat_bars(closes: &[f64]) -> Vec<Candle> {
        closes.iter().map(|c| bar(*c, *c, *c, 1.0)).collect()
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    #[test]
    fn ema_seeds_with_first_value() {
        approx(ema(&[10.0], 9).unwrap(), 10.0);
        // k = 2/4 = 0.5: 10 -> 11 -> 12.5
        approx(ema(&[10.0, 12.0, 15.0], 3).unwrap(), 12.5);
    }

    #[test]
    fn ema_empty_is_unknown() {
        assert!(ema(&[], 9).is_none());
    }

    #[test_case(14, None ; "fourteen closes")]
    #[test_case(15, Some(100.0) ; "fifteen closes")]
    fn rsi_needs_period_plus_one(len: usize, expected: Option<f64>) {
        let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&closes, 14), expected);
    }

    #[test]
    fn rsi_flat_series_is_hundred() {
        assert_eq!(rsi(&[5.0; 20], 14), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        approx(rsi(&closes, 14).unwrap(), 0.0);
    }

    #[test]
    fn rsi_wilder_smoothing() {
        // Period 2: changes +2, -1, +1
        // seed gain = 1.0, loss = 0.5; next: gain = (1*1 + 1)/2 = 1, loss = 0.25
        let value = rsi(&[10.0, 12.0, 11.0, 12.0], 2).unwrap();
        approx(value, 100.0 - 100.0 / (1.0 + 4.0));
    }

    #[test]
    fn atr_constant_range() {
        let candles: Vec<Candle> = (0..20).map(|_| bar(11.0, 9.0, 10.0, 1.0)).collect();
        approx(atr(&candles, 14).unwrap(), 2.0);
    }

    #[test]
    fn atr_uses_gap_from_previous_close() {
        let candles = vec![
            bar(10.0, 10.0, 10.0, 1.0),
            bar(15.0, 14.0, 14.5, 1.0),
            bar(14.0, 14.0, 14.0, 1.0),
        ];
        // TR1 = max(1, 5, 4) = 5; TR2 = max(0, 0.5, 0.5) = 0.5; seed 5, then (5 + 0.5) / 2
        approx(atr(&candles, 1).unwrap(), 0.5);
        approx(atr(&candles, 2).unwrap(), 2.75);
        assert!(atr(&candles, 3).is_none());
    }

    #[test]
    fn vwap_weights_by_volume() {
        let candles = vec![bar(10.0, 10.0, 10.0, 1.0), bar(20.0, 20.0, 20.0, 3.0)];
        approx(vwap(&candles).unwrap(), 17.5);
    }

    #[test]
    fn vwap_zero_volume_is_unknown() {
        let candles = vec![bar(10.0, 10.0, 10.0, 0.0)];
        assert!(vwap(&candles).is_none());
    }

    #[test]
    fn range_compression_uses_last_thirty_bars() {
        let mut candles = vec![bar(1000.0, 1.0, 100.0, 1.0)];
        candles.extend((0..30).map(|_| bar(102.0, 98.0, 100.0, 1.0)));
        approx(range_compression_pct(&candles).unwrap(), 4.0);
    }

    #[test]
    fn range_compression_zero_close_is_unknown() {
        assert!(range_compression_pct(&[bar(1.0, 0.0, 0.0, 1.0)]).is_none());
        assert!(range_compression_pct(&[]).is_none());
    }

    #[test]
    fn symbol_indicators_short_window() {
        let set = SymbolIndicators::from_candles(&flat_bars(&[100.0; 10]));
        assert!(set.ema9.is_some());
        assert!(set.rsi14.is_none());
        assert!(set.atr14.is_none());
    }

    #[test]
    fn symbol_indicators_serialize_null_for_unknown() {
        let json = serde_json::to_value(SymbolIndicators::default()).unwrap();
        assert!(json["rsi14"].is_null());
        assert!(json.get("rangeCompressionPct").is_some());
    }
}
