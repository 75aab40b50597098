//! Observability module for metrics.
//!
//! Logging goes through `tracing`; the subscriber is installed by the binary.

mod metrics;

pub use self::metrics::{
    MetricsConfig, MetricsError, init_metrics, record_oracle_call, record_order,
    record_risk_rejection, record_tick, record_trade_closed, set_account_state,
};
