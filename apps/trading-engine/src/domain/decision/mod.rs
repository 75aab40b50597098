//! Decision Bounded Context
//!
//! Oracle trade plans and their validation.

pub mod errors;
pub mod trade_plan;

pub use errors::PlanRejection;
pub use trade_plan::{EntryPlan, TradePlan, strip_code_fences};
