//! Periodic tick scheduler.
//!
//! Fires the tick use case on a fixed interval until cancelled. Scheduled
//! ticks go through the same single-flight guard as on-demand ones, so a
//! slow tick makes the next scheduled one report an overlap rather than
//! queueing.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{DecisionOraclePort, ExchangePort, StateStorePort};
use crate::application::use_cases::RunTickUseCase;

/// Background driver for [`RunTickUseCase`].
pub struct TickScheduler<E: ExchangePort, O: DecisionOraclePort, S: StateStorePort> {
    tick: Arc<RunTickUseCase<E, O, S>>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<E, O, S> TickScheduler<E, O, S>
where
    E: ExchangePort + 'static,
    O: DecisionOraclePort + 'static,
    S: StateStorePort + 'static,
{
    /// Create a scheduler. A zero interval disables it.
    #[must_use]
    pub const fn new(
        tick: Arc<RunTickUseCase<E, O, S>>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            tick,
            interval,
            shutdown,
        }
    }

    /// Spawn the loop. Returns `None` when scheduling is disabled.
    pub fn start(self) -> Option<JoinHandle<()>> {
        if self.interval.is_zero() {
            tracing::info!("Tick scheduler disabled");
            return None;
        }

        tracing::info!(interval_secs = self.interval.as_secs_f64(), "Starting tick scheduler");
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let result = self.tick.execute().await;
                        if !result.ok {
                            tracing::warn!(meta = %result.meta, "Scheduled tick did not complete");
                        }
                    }
                    () = self.shutdown.cancelled() => {
                        tracing::info!("Tick scheduler shutting down");
                        break;
                    }
                }
            }
        }))
    }
}
