//! Position Lifecycle Bounded Context
//!
//! Open positions, closed trades, exit triggers and the per-symbol
//! FLAT -> OPEN -> CLOSING -> FLAT state machine.

pub mod exit_trigger;
pub mod lifecycle_state;
pub mod position;
pub mod slippage;

pub use exit_trigger::evaluate_exit;
pub use lifecycle_state::LifecycleState;
pub use position::{
    ClosedTrade, ExitFill, ExitReason, OpenPosition, PositionSide, Provenance,
};
pub use slippage::SlippageAttribution;
