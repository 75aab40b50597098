//! Dependency Injection Container
//!
//! Manages creation and wiring of all application components.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{DecisionOraclePort, ExchangePort, StateStorePort};
use crate::application::services::{LedgerCapacities, TickScheduler, TradeLedger};
use crate::application::use_cases::{ControlService, RunTickUseCase};
use crate::domain::EngineTuning;
use crate::infrastructure::http::AppState;

/// Dependency injection container.
///
/// Owns one ledger and one tick use case; the control surface and the
/// scheduler share them, so on-demand and scheduled ticks go through the
/// same single-flight guard.
pub struct Container<E, O, S>
where
    E: ExchangePort + 'static,
    O: DecisionOraclePort + 'static,
    S: StateStorePort + 'static,
{
    exchange: Arc<E>,
    ledger: Arc<TradeLedger<S>>,
    tick: Arc<RunTickUseCase<E, O, S>>,
    control: Arc<ControlService<E, O, S>>,
}

impl<E, O, S> Container<E, O, S>
where
    E: ExchangePort + 'static,
    O: DecisionOraclePort + 'static,
    S: StateStorePort + 'static,
{
    /// Wire the engine over the given adapters.
    pub fn new(
        exchange: Arc<E>,
        oracle: Arc<O>,
        store: Arc<S>,
        tuning: &EngineTuning,
        admin_secret: Option<String>,
    ) -> Self {
        let ledger = Arc::new(TradeLedger::new(store, capacities(tuning)));
        let tick = Arc::new(RunTickUseCase::new(
            Arc::clone(&exchange),
            oracle,
            Arc::clone(&ledger),
            tuning,
        ));
        let control = Arc::new(ControlService::new(
            Arc::clone(&ledger),
            Arc::clone(&tick),
            admin_secret,
        ));
        Self {
            exchange,
            ledger,
            tick,
            control,
        }
    }

    /// Get the exchange port.
    pub fn exchange(&self) -> Arc<E> {
        Arc::clone(&self.exchange)
    }

    /// Get the trade ledger.
    pub fn ledger(&self) -> Arc<TradeLedger<S>> {
        Arc::clone(&self.ledger)
    }

    /// Get the tick use case.
    pub fn tick_use_case(&self) -> Arc<RunTickUseCase<E, O, S>> {
        Arc::clone(&self.tick)
    }

    /// Get the control service.
    pub fn control_service(&self) -> Arc<ControlService<E, O, S>> {
        Arc::clone(&self.control)
    }

    /// Create a `TickScheduler` bound to `shutdown`.
    pub fn tick_scheduler(
        &self,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> TickScheduler<E, O, S> {
        TickScheduler::new(Arc::clone(&self.tick), interval, shutdown)
    }

    /// HTTP handler state.
    pub fn app_state(&self, version: impl Into<String>) -> AppState<E, O, S> {
        AppState {
            control: Arc::clone(&self.control),
            version: version.into(),
        }
    }
}

const fn capacities(tuning: &EngineTuning) -> LedgerCapacities {
    LedgerCapacities {
        closed_trades: tuning.closed_trade_capacity,
        equity: tuning.equity_capacity,
        logs: tuning.log_capacity,
    }
}
