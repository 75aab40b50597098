//! Trading Engine Binary
//!
//! Starts the tick scheduler and the HTTP control surface.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin trading-engine -- [path/to/engine.yaml]
//! ```
//!
//! # Configuration
//!
//! Settings come from `engine.yaml` (or the path given as the first argument)
//! overlaid with `ENGINE__*` environment variables, for example:
//!
//! - `ENGINE__EXCHANGE__MODE`: paper | testnet | live (default: paper)
//! - `ENGINE__EXCHANGE__API_KEY` / `ENGINE__EXCHANGE__API_SECRET`
//! - `ENGINE__ORACLE__API_KEY`: chat-completions bearer token
//! - `ENGINE__ADMIN_SECRET`: required for `run` and `stop`
//! - `ENGINE__SERVER__HTTP_PORT`: HTTP port (default: 8080)
//! - `ENGINE__SCHEDULER__INTERVAL_SECS`: tick interval, 0 disables (default: 60)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use trading_engine::application::ports::{DecisionOraclePort, ExchangePort, StateStorePort};
use trading_engine::infrastructure::config::{Container, ExchangeMode, Settings, StoreKind};
use trading_engine::infrastructure::exchange::{BinanceExchangeAdapter, DryRunExchange};
use trading_engine::infrastructure::http::create_router;
use trading_engine::infrastructure::oracle::ChatCompletionsOracle;
use trading_engine::infrastructure::persistence::{FileStateStore, InMemoryStateStore};
use trading_engine::observability::{MetricsConfig, init_metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    tracing::info!("Starting trading engine");

    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref()).context("loading settings")?;
    log_settings(&settings);

    if let Some(port) = settings.server.metrics_port {
        let addr = socket_addr(&settings.server.bind_address, port)?;
        match init_metrics(&MetricsConfig::with_addr(addr)) {
            Ok(()) => tracing::info!(%addr, "Prometheus exporter listening"),
            Err(e) => tracing::warn!(error = %e, "Metrics disabled"),
        }
    }

    let oracle = Arc::new(ChatCompletionsOracle::new(
        settings
            .oracle
            .chat_config(std::time::Duration::from_secs(settings.engine.oracle_timeout_secs)),
    )?);
    if !oracle.is_configured() {
        tracing::warn!("Oracle API key not set; every tick will stay FLAT");
    }

    let venue = BinanceExchangeAdapter::new(&settings.exchange.binance_config())?;
    match settings.exchange.mode {
        ExchangeMode::Paper => {
            let exchange = DryRunExchange::new(venue, settings.exchange.paper_balance_usd);
            with_store(&settings, Arc::new(exchange), oracle).await
        }
        ExchangeMode::Testnet | ExchangeMode::Live => {
            with_store(&settings, Arc::new(venue), oracle).await
        }
    }
}

/// Pick the state store and run.
async fn with_store<E, O>(settings: &Settings, exchange: Arc<E>, oracle: Arc<O>) -> anyhow::Result<()>
where
    E: ExchangePort + 'static,
    O: DecisionOraclePort + 'static,
{
    match settings.store.kind {
        StoreKind::Memory => {
            tracing::warn!("In-memory state store; ledger is lost on restart");
            serve(settings, exchange, oracle, Arc::new(InMemoryStateStore::new())).await
        }
        StoreKind::File => {
            let store = FileStateStore::open(settings.store.path.clone())
                .await
                .with_context(|| format!("opening state store at {}", settings.store.path.display()))?;
            tracing::info!(path = %settings.store.path.display(), "File state store opened");
            serve(settings, exchange, oracle, Arc::new(store)).await
        }
    }
}

/// Wire the container, start the scheduler and serve until a signal arrives.
async fn serve<E, O, S>(
    settings: &Settings,
    exchange: Arc<E>,
    oracle: Arc<O>,
    store: Arc<S>,
) -> anyhow::Result<()>
where
    E: ExchangePort + 'static,
    O: DecisionOraclePort + 'static,
    S: StateStorePort + 'static,
{
    if settings.admin_secret.is_none() {
        tracing::warn!("Admin secret not set; run and stop will be refused");
    }

    let container = Container::new(
        exchange,
        oracle,
        store,
        &settings.engine,
        settings.admin_secret.clone(),
    );
    let shutdown = CancellationToken::new();

    let scheduler = container
        .tick_scheduler(settings.scheduler.interval(), shutdown.clone())
        .start();

    let app = create_router(container.app_state(env!("CARGO_PKG_VERSION")));
    let http_addr = socket_addr(&settings.server.bind_address, settings.server.http_port)?;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding {http_addr}"))?;

    tracing::info!(%http_addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  GET  /api/v1/status");
    tracing::info!("  POST /api/v1/run | /api/v1/stop | /api/v1/tick");
    tracing::info!("  GET  /api/v1/trades/open | /api/v1/trades/closed");
    tracing::info!("  GET  /api/v1/equity | /api/v1/logs");

    let token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            token.cancel();
        })
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Tick scheduler task failed");
        }
    }

    tracing::info!("Trading engine stopped");
    Ok(())
}

fn socket_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))
}

/// Log the effective settings. Secrets are redacted by their `Debug` impls.
fn log_settings(settings: &Settings) {
    tracing::info!(
        exchange_mode = ?settings.exchange.mode,
        store = ?settings.store.kind,
        http_port = settings.server.http_port,
        tick_interval_secs = settings.scheduler.interval_secs,
        candle_interval = %settings.engine.candle_interval.as_str(),
        "Settings loaded"
    );
    tracing::debug!(exchange = ?settings.exchange, oracle = ?settings.oracle, "Adapter settings");
    if settings.exchange.mode == ExchangeMode::Live {
        tracing::warn!("LIVE mode: orders are sent to the production exchange");
    }
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Initialize the tracing subscriber with environment filter.
#[allow(clippy::expect_used)]
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "trading_engine=info"
                    .parse()
                    .expect("static directive 'trading_engine=info' is valid"),
            ),
        )
        .init();
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
