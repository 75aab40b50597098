//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `exchange/`: Binance USD-M futures, paper and dry-run accounts
//!   - `oracle/`: Chat-completions decision oracle
//!   - `persistence/`: Key/value state stores (memory, JSON files)
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST control surface
//!
//! - **Wiring**
//!   - `config/`: Layered settings and the dependency container

pub mod config;
pub mod exchange;
pub mod http;
pub mod oracle;
pub mod persistence;
