//! Prometheus metrics for the trading engine.
//!
//! Recording functions are no-ops until a recorder is installed, so they are
//! safe to call from tests and from binaries that run without an exporter.
//!
//! # Example
//!
//! ```ignore
//! use trading_engine::observability::{init_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! record_tick("ok", 0.42);
//! ```

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Configuration for the metrics exporter.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Address to bind the metrics HTTP listener.
    pub listen_addr: SocketAddr,
    /// Histogram buckets for latency measurements (in seconds).
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            // Ticks and oracle calls run from tens of milliseconds to a minute
            latency_buckets: vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        }
    }
}

impl MetricsConfig {
    /// Create a new metrics configuration with custom address.
    #[must_use]
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            listen_addr: addr,
            ..Default::default()
        }
    }
}

/// Initialize the Prometheus metrics exporter.
///
/// This starts an HTTP server that exposes metrics at `/metrics`.
///
/// # Errors
///
/// Returns an error if the metrics exporter fails to start (e.g., port already in use).
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .set_buckets(&config.latency_buckets)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(
        addr = %config.listen_addr,
        "Prometheus metrics exporter started"
    );

    Ok(())
}

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

fn as_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

// ============================================================================
// Tick Metrics
// ============================================================================

/// Record a tick.
///
/// # Arguments
///
/// * `outcome` - "ok", "error" or "skipped"
/// * `duration_seconds` - Wall time of the tick
pub fn record_tick(outcome: &str, duration_seconds: f64) {
    counter!("engine_ticks_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("engine_tick_duration_seconds").record(duration_seconds);
}

/// Record a decision oracle call.
///
/// # Arguments
///
/// * `provider` - Oracle provider name
/// * `outcome` - "long", "short", "flat", "rejected" or "error"
/// * `latency_seconds` - Call latency
pub fn record_oracle_call(provider: &str, outcome: &str, latency_seconds: f64) {
    counter!(
        "oracle_calls_total",
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!("oracle_latency_seconds", "provider" => provider.to_string())
        .record(latency_seconds);
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record an order attempt.
///
/// # Arguments
///
/// * `intent` - "open" or "close"
/// * `status` - "confirmed", "partial", "unconfirmed" or "error"
pub fn record_order(intent: &str, status: &str) {
    counter!(
        "engine_orders_total",
        "intent" => intent.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a closed trade.
///
/// # Arguments
///
/// * `reason` - Exit reason label
/// * `realized_pnl` - Realized P&L in USD
pub fn record_trade_closed(reason: &str, realized_pnl: Decimal) {
    counter!("engine_trades_closed_total", "reason" => reason.to_string()).increment(1);
    histogram!("engine_trade_pnl_usd").record(as_f64(realized_pnl));
}

/// Record an entry refused by the risk layer.
pub fn record_risk_rejection(reason: &str) {
    counter!("engine_risk_rejections_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Account Metrics
// ============================================================================

/// Update account gauges.
pub fn set_account_state(equity: Decimal, open_positions: usize) {
    gauge!("engine_equity_usd").set(as_f64(equity));
    #[allow(clippy::cast_precision_loss)]
    gauge!("engine_open_positions").set(open_positions as f64);
}
