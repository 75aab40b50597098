//! Market State Bounded Context
//!
//! Candles, technical indicators and the per-tick market snapshot handed to
//! the decision oracle.

pub mod candle;
pub mod indicators;
pub mod snapshot;

pub use candle::{Candle, CandleInterval};
pub use indicators::SymbolIndicators;
pub use snapshot::{MarketSnapshot, PositionView, RiskConstraints};
