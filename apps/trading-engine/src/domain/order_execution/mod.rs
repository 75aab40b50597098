//! Order Execution Bounded Context
//!
//! Pure order math used by the execution gateway.
//!
//! # Key Concepts
//!
//! - **Lot size rules**: quantities are whole multiples of the exchange step
//! - **Fill accumulation**: partial fills fold into a volume weighted price
//! - **Retry policy**: bounded, fixed-delay confirmation polling

pub mod fill;
pub mod lot_size;
pub mod order_request;
pub mod order_side;
pub mod retry_policy;

pub use fill::FillAccumulator;
pub use lot_size::LotSizeRules;
pub use order_request::{OrderIntent, OrderRequest};
pub use order_side::OrderSide;
pub use retry_policy::RetryPolicy;
