//! Exchange adapters.

pub mod binance;
mod dry_run;
mod paper;

pub use binance::{BinanceConfig, BinanceEnvironment, BinanceExchangeAdapter, Credentials};
pub use dry_run::DryRunExchange;
pub use paper::{FillBehavior, PaperExchange};
