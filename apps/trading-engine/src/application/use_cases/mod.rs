//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod aggregate_market;
mod consult_oracle;
mod control;
mod manage_positions;
mod narrate_status;
mod run_tick;

pub use aggregate_market::AggregateMarketUseCase;
pub use consult_oracle::{ConsultOracleUseCase, Consultation};
pub use control::{ControlError, ControlService};
pub use manage_positions::{ManagePositionsError, ManagePositionsUseCase, PlanOutcome};
pub use narrate_status::NarrateStatusUseCase;
pub use run_tick::{RunTickUseCase, TickError};
