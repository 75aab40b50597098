//! OHLCV candle and interval types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::shared::{DomainError, Timestamp};

/// One OHLCV bar as reported by the exchange.
///
/// Indicator math runs in `f64`; order math never reads these fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// Bar open time.
    pub open_time: Timestamp,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Base asset volume.
    pub volume: f64,
}

impl Candle {
    /// Typical price `(high + low + close) / 3`.
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Kline interval accepted by the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    /// 1 minute.
    #[serde(rename = "1m")]
    OneMinute,
    /// 3 minutes.
    #[serde(rename = "3m")]
    ThreeMinutes,
    /// 5 minutes.
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 15 minutes.
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// 1 hour.
    #[serde(rename = "1h")]
    OneHour,
}

impl CandleInterval {
    /// Wire representation used in kline queries.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::ThreeMinutes => "3m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
        }
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandleInterval {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "3m" => Ok(Self::ThreeMinutes),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            other => Err(DomainError::invalid(
                "candle_interval",
                format!("unsupported interval '{other}'"),
            )),
        }
    }
}
