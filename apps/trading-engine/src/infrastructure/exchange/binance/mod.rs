//! Binance USDⓈ-M Futures Exchange Adapter
//!
//! Implementation of `ExchangePort` over the futures REST API with:
//! - HMAC-SHA256 or wallet (EIP-191) request signing
//! - Retry logic with exponential backoff
//! - Environment-aware safety checks (TESTNET vs LIVE)

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;
mod signing;

pub use adapter::BinanceExchangeAdapter;
pub use config::{BinanceConfig, BinanceEnvironment, Credentials, RetryConfig};
pub use error::BinanceError;
