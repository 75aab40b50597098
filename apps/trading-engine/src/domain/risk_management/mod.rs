//! Risk Management Bounded Context
//!
//! Persisted trading configuration, order sizing and entry guards.

pub mod loss_guard;
pub mod risk_governor;
pub mod trading_config;

pub use loss_guard::{LossStreakGuard, check_daily_loss, realized_pnl_for_day};
pub use risk_governor::{RiskGovernor, RiskRejection};
pub use trading_config::{ConfigOverrides, EngineStatus, MarginMode, TradingConfig};
