// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Trading Engine - Decision & Position-Lifecycle Core
//!
//! A periodic control loop for USD-margined perpetual futures. Each tick
//! reads the account and market, enforces exits on open positions, asks an
//! external decision oracle for at most one trade plan, sizes and guards it,
//! drives orders to a confirmed exchange state and records the outcome.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure business rules
//!   - `market`: Candles, indicators and the oracle snapshot
//!   - `decision`: Trade plan parsing and validation
//!   - `risk_management`: Trading config, sizing, exposure and loss guards
//!   - `position_lifecycle`: Open positions, exit triggers, closed trades
//!   - `order_execution`: Lot-size rounding and fill confirmation
//!   - `ledger` / `narration`: Persisted histories and status summaries
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `ExchangePort`, `DecisionOraclePort`, `StateStorePort`
//!   - `services`: Trade ledger, order gateway, tick journal, scheduler
//!   - `use_cases`: `RunTick` and the control surface
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `exchange`: Binance USD-M futures, paper and dry-run accounts
//!   - `oracle`: Chat-completions oracle
//!   - `persistence`: In-memory and JSON-file state stores
//!   - `http`: Axum control surface
//!   - `config`: Layered settings and the dependency container

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Prometheus metrics.
pub mod observability;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::EngineTuning;
pub use domain::decision::TradePlan;
pub use domain::position_lifecycle::{ClosedTrade, OpenPosition};
pub use domain::risk_management::{ConfigOverrides, EngineStatus, TradingConfig};
pub use domain::shared::{Symbol, Timestamp};

// Application re-exports
pub use application::ports::{
    DecisionOraclePort, ExchangeError, ExchangePort, OracleError, StateStorePort, StoreError,
};
pub use application::services::{TickScheduler, TradeLedger};
pub use application::use_cases::{ControlError, ControlService, RunTickUseCase};

// Infrastructure re-exports
pub use infrastructure::config::{Container, Settings, SettingsError};
pub use infrastructure::exchange::{
    BinanceConfig, BinanceEnvironment, BinanceExchangeAdapter, DryRunExchange, PaperExchange,
};
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::oracle::{ChatCompletionsOracle, ChatOracleConfig, ScriptedOracle};
pub use infrastructure::persistence::{FileStateStore, InMemoryStateStore};
