//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters.
//! They differ from use cases in that they typically run as background tasks
//! or provide long-running functionality.

mod order_gateway;
mod tick_journal;
mod tick_scheduler;
mod trade_ledger;

pub use order_gateway::{CloseFill, CloseOutcome, ExecutionError, OpenFill, OrderGateway};
pub use tick_journal::TickJournal;
pub use tick_scheduler::TickScheduler;
pub use trade_ledger::{
    CLOSED_TRADES_KEY, CONFIG_KEY, EQUITY_ANCHOR_KEY, EQUITY_ROLLING_KEY, LOGS_KEY,
    LedgerCapacities, NARRATOR_KEY, OPEN_POSITIONS_KEY, RUNTIME_KEY, TradeLedger, equity_day_key,
};
