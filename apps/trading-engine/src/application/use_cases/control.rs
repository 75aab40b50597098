//! Control Service
//!
//! The operations the engine exposes to its host. `run` and `stop` require
//! the shared admin secret; everything else is read-only.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::run_tick::RunTickUseCase;
use crate::application::dto::{StatusDto, TickResultDto};
use crate::application::ports::{DecisionOraclePort, ExchangePort, StateStorePort, StoreError};
use crate::application::services::TradeLedger;
use crate::domain::ledger::{ActivityLogEntry, EquitySample};
use crate::domain::position_lifecycle::{ClosedTrade, OpenPosition};
use crate::domain::risk_management::{ConfigOverrides, EngineStatus, TradingConfig};
use crate::domain::shared::DomainError;

/// Control surface errors.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Missing or wrong admin secret.
    #[error("unauthorized")]
    Unauthorized,

    /// Overrides produced an invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] DomainError),

    /// Ledger read or write failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Control surface over the ledger and the tick use case.
pub struct ControlService<E: ExchangePort, O: DecisionOraclePort, S: StateStorePort> {
    ledger: Arc<TradeLedger<S>>,
    tick: Arc<RunTickUseCase<E, O, S>>,
    admin_secret: Option<String>,
}

impl<E: ExchangePort, O: DecisionOraclePort, S: StateStorePort> ControlService<E, O, S> {
    /// Create a new ControlService. Without an admin secret every
    /// privileged call is refused.
    pub const fn new(
        ledger: Arc<TradeLedger<S>>,
        tick: Arc<RunTickUseCase<E, O, S>>,
        admin_secret: Option<String>,
    ) -> Self {
        Self {
            ledger,
            tick,
            admin_secret,
        }
    }

    /// Current config and runtime state.
    pub async fn get_status(&self) -> Result<StatusDto, ControlError> {
        Ok(StatusDto {
            config: self.ledger.load_config().await?,
            runtime: self.ledger.load_runtime().await?,
        })
    }

    /// Apply overrides and set the engine RUNNING.
    pub async fn run(
        &self,
        secret: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<TradingConfig, ControlError> {
        self.authorize(secret)?;
        let current = self.ledger.load_config().await?;
        let mut config = overrides.apply(&current)?;
        config.status = EngineStatus::Running;
        self.ledger.save_config(&config).await?;
        tracing::info!(universe = ?config.universe, model = %config.model, "Engine started");
        Ok(config)
    }

    /// Set the engine STOPPED. Exits keep being enforced.
    pub async fn stop(&self, secret: Option<&str>) -> Result<TradingConfig, ControlError> {
        self.authorize(secret)?;
        let mut config = self.ledger.load_config().await?;
        config.status = EngineStatus::Stopped;
        self.ledger.save_config(&config).await?;
        tracing::info!("Engine stopped");
        Ok(config)
    }

    /// Run a tick on demand.
    pub async fn tick(&self) -> TickResultDto {
        self.tick.execute().await
    }

    /// Open positions.
    pub async fn get_open_trades(&self) -> Result<Vec<OpenPosition>, ControlError> {
        Ok(self.ledger.open_positions().await?.into_values().collect())
    }

    /// Closed trades, oldest first.
    pub async fn get_closed_trades(&self) -> Result<Vec<ClosedTrade>, ControlError> {
        Ok(self.ledger.closed_trades().await?)
    }

    /// Equity series up to today.
    pub async fn get_equity_series(&self) -> Result<Vec<EquitySample>, ControlError> {
        Ok(self.ledger.equity_series(Utc::now().date_naive()).await?)
    }

    /// Activity log, oldest first.
    pub async fn get_logs(&self) -> Result<Vec<ActivityLogEntry>, ControlError> {
        Ok(self.ledger.logs().await?)
    }

    fn authorize(&self, secret: Option<&str>) -> Result<(), ControlError> {
        match (self.admin_secret.as_deref(), secret) {
            (Some(expected), Some(given)) if secrets_match(expected, given) => Ok(()),
            _ => {
                tracing::warn!("Rejected privileged control call");
                Err(ControlError::Unauthorized)
            }
        }
    }
}

/// Compare digests so timing depends on neither content nor length.
fn secrets_match(expected: &str, given: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(given.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::LedgerCapacities;
    use crate::domain::EngineTuning;
    use crate::domain::shared::Symbol;
    use crate::infrastructure::exchange::PaperExchange;
    use crate::infrastructure::oracle::ScriptedOracle;
    use crate::infrastructure::persistence::InMemoryStateStore;
    use rust_decimal_macros::dec;

    type Service = ControlService<PaperExchange, ScriptedOracle, InMemoryStateStore>;

    fn service(secret: Option<&str>) -> Service {
        let exchange = Arc::new(PaperExchange::new(dec!(1000)));
        let ledger = Arc::new(TradeLedger::new(
            Arc::new(InMemoryStateStore::new()),
            LedgerCapacities::default(),
        ));
        let tick = Arc::new(RunTickUseCase::new(
            exchange,
            Arc::new(ScriptedOracle::new()),
            Arc::clone(&ledger),
            &EngineTuning::default(),
        ));
        ControlService::new(ledger, tick, secret.map(str::to_string))
    }

    #[test]
    fn secret_comparison() {
        assert!(secrets_match("hunter2", "hunter2"));
        assert!(!secrets_match("hunter2", "hunter3"));
        assert!(!secrets_match("hunter2", "hunter22"));
        assert!(!secrets_match("hunter2", ""));
    }

    #[tokio::test]
    async fn run_applies_overrides_and_starts() {
        let service = service(Some("s3cret"));
        let overrides = ConfigOverrides {
            universe: Some(vec![Symbol::new("ethusdt")]),
            max_risk_per_trade_usd: Some(dec!(250)),
            ..ConfigOverrides::default()
        };

        let config = service.run(Some("s3cret"), overrides).await.unwrap();

        assert_eq!(config.status, EngineStatus::Running);
        assert_eq!(config.universe, vec![Symbol::new("ETHUSDT")]);
        assert_eq!(service.get_status().await.unwrap().config, config);
    }

    #[tokio::test]
    async fn wrong_secret_has_no_effect() {
        let service = service(Some("s3cret"));
        let before = service.get_status().await.unwrap().config;

        let err = service.run(Some("guess"), ConfigOverrides::default()).await.unwrap_err();
        assert!(matches!(err, ControlError::Unauthorized));
        assert_eq!(err.to_string(), "unauthorized");
        assert!(matches!(service.stop(None).await, Err(ControlError::Unauthorized)));
        assert_eq!(service.get_status().await.unwrap().config, before);
    }

    #[tokio::test]
    async fn missing_admin_secret_fails_closed() {
        let service = service(None);
        assert!(matches!(
            service.run(Some(""), ConfigOverrides::default()).await,
            Err(ControlError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn invalid_overrides_leave_config_untouched() {
        let service = service(Some("s3cret"));
        let overrides = ConfigOverrides {
            universe: Some(vec![]),
            ..ConfigOverrides::default()
        };

        let err = service.run(Some("s3cret"), overrides).await.unwrap_err();
        assert!(matches!(err, ControlError::InvalidConfig(_)));
        assert_eq!(service.get_status().await.unwrap().config.status, EngineStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_keeps_config() {
        let service = service(Some("s3cret"));
        service.run(Some("s3cret"), ConfigOverrides::default()).await.unwrap();

        let config = service.stop(Some("s3cret")).await.unwrap();
        assert_eq!(config.status, EngineStatus::Stopped);
        assert_eq!(config.universe.len(), 3);
    }
}
