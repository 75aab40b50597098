//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driver Ports** (Primary/Inbound): How the world uses our application
//! - **Driven Ports** (Secondary/Outbound): How our application uses external systems

mod exchange_port;
mod oracle_port;
mod state_store_port;

pub use exchange_port::{AccountSnapshot, ExchangeError, ExchangePort, LivePosition, OrderAck};
pub use oracle_port::{DecisionOraclePort, OracleError, OracleReply, OracleRequest};
pub use state_store_port::{StateStorePort, StoreError};
