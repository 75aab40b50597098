//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless business logic (indicators, sizing, exit triggers)
//!
//! # Bounded Contexts
//!
//! - [`market`]: Candles, indicators and the oracle snapshot
//! - [`decision`]: Oracle trade plans and their validation
//! - [`risk_management`]: Trading config, sizing and entry guards
//! - [`position_lifecycle`]: Open positions, exits and closed trades
//! - [`order_execution`]: Lot sizes, fills and confirmation retries
//! - [`ledger`]: Persisted histories, equity and runtime state
//! - [`narration`]: Deduplicated status summaries

pub mod decision;
pub mod engine_tuning;
pub mod ledger;
pub mod market;
pub mod narration;
pub mod order_execution;
pub mod position_lifecycle;
pub mod risk_management;
pub mod shared;

pub use engine_tuning::EngineTuning;
