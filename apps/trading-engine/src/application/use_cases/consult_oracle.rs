//! Consult Oracle Use Case
//!
//! One decision oracle call per tick. Every failure mode collapses to a FLAT
//! plan; nothing here has side effects beyond logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::ports::{DecisionOraclePort, OracleError, OracleRequest};
use crate::application::services::TickJournal;
use crate::domain::decision::TradePlan;
use crate::domain::market::MarketSnapshot;
use crate::domain::position_lifecycle::Provenance;
use crate::domain::risk_management::TradingConfig;

/// Outcome of a consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consultation {
    /// Validated plan, FLAT on any failure.
    pub plan: TradePlan,
    /// Provider and model that answered (or were asked).
    pub provenance: Provenance,
}

/// Use case for obtaining a trade plan.
pub struct ConsultOracleUseCase<O: DecisionOraclePort> {
    oracle: Arc<O>,
    timeout: Duration,
}

impl<O: DecisionOraclePort> ConsultOracleUseCase<O> {
    /// Create a new ConsultOracleUseCase.
    pub const fn new(oracle: Arc<O>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Execute the use case.
    pub async fn execute(
        &self,
        snapshot: &MarketSnapshot,
        config: &TradingConfig,
        journal: &TickJournal,
    ) -> Consultation {
        let provider = self.oracle.provider().to_string();
        let request = OracleRequest {
            snapshot: snapshot.clone(),
            constraints: config.risk_constraints(),
            model: config.model.clone(),
        };

        let started = Instant::now();
        let reply = match tokio::time::timeout(self.timeout, self.oracle.decide(&request)).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                after_secs: self.timeout.as_secs(),
            }),
        };
        let latency = started.elapsed().as_secs_f64();

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                journal.warn(format!("oracle unavailable, staying flat: {e}"), None);
                crate::observability::record_oracle_call(&provider, "error", latency);
                return Consultation {
                    plan: TradePlan::flat(format!("oracle error: {e}")),
                    provenance: Provenance {
                        provider,
                        model: config.model.clone(),
                    },
                };
            }
        };

        let provenance = Provenance {
            provider: reply.provider.clone(),
            model: reply.model.clone(),
        };
        let plan = match TradePlan::parse(&reply.content, &config.universe, |s| snapshot.price(s)) {
            Ok(plan) => {
                let outcome = match &plan {
                    TradePlan::Long(_) => "long",
                    TradePlan::Short(_) => "short",
                    TradePlan::Flat { .. } => "flat",
                };
                crate::observability::record_oracle_call(&provenance.provider, outcome, latency);
                journal.info(format!("oracle decision: {}", plan.signal()), None);
                plan
            }
            Err(rejection) => {
                crate::observability::record_oracle_call(&provenance.provider, "rejected", latency);
                journal.warn(format!("oracle plan rejected, staying flat: {rejection}"), None);
                TradePlan::flat(format!("rejected plan: {rejection}"))
            }
        };

        Consultation { plan, provenance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::LogLevel;
    use crate::domain::shared::{Symbol, Timestamp};
    use crate::infrastructure::oracle::ScriptedOracle;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn snapshot() -> MarketSnapshot {
        let btc = Symbol::new("BTCUSDT");
        MarketSnapshot {
            as_of: Timestamp::now(),
            equity: dec!(1000),
            positions: vec![],
            universe: vec![btc.clone()],
            prices: BTreeMap::from([(btc, Some(dec!(100)))]),
            change_24h: BTreeMap::new(),
            indicators: BTreeMap::new(),
        }
    }

    fn config() -> TradingConfig {
        TradingConfig {
            universe: vec![Symbol::new("BTCUSDT")],
            model: "test-model".to_string(),
            ..TradingConfig::default()
        }
    }

    #[tokio::test]
    async fn valid_plan_is_returned_with_provenance() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_reply(r#"{"action":"LONG","symbol":"BTCUSDT","stopLossPrice":95}"#);
        let use_case = ConsultOracleUseCase::new(Arc::clone(&oracle), Duration::from_secs(5));
        let journal = TickJournal::new();

        let consultation = use_case.execute(&snapshot(), &config(), &journal).await;

        assert_eq!(consultation.plan.signal(), "LONG BTCUSDT");
        assert_eq!(consultation.provenance.provider, "scripted");
        assert_eq!(consultation.provenance.model, "test-model");
        assert_eq!(oracle.requests()[0].constraints.max_risk_per_trade_usd, dec!(100));
    }

    #[tokio::test]
    async fn invalid_plan_degrades_to_flat_with_warning() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_reply(r#"{"action":"LONG","symbol":"DOGEUSDT"}"#);
        let use_case = ConsultOracleUseCase::new(oracle, Duration::from_secs(5));
        let journal = TickJournal::new();

        let consultation = use_case.execute(&snapshot(), &config(), &journal).await;

        assert!(consultation.plan.is_flat());
        let entries = journal.drain();
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert!(entries[0].message.contains("DOGEUSDT"));
    }

    #[tokio::test]
    async fn oracle_error_degrades_to_flat() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.push_error(OracleError::NotConfigured {
            message: "missing API key".to_string(),
        });
        let use_case = ConsultOracleUseCase::new(oracle, Duration::from_secs(5));
        let journal = TickJournal::new();

        let consultation = use_case.execute(&snapshot(), &config(), &journal).await;
        assert!(consultation.plan.is_flat());
        assert_eq!(consultation.provenance.provider, "scripted");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_oracle_times_out_to_flat() {
        let oracle = Arc::new(ScriptedOracle::new().with_latency(Duration::from_secs(60)));
        oracle.push_reply(r#"{"action":"LONG","symbol":"BTCUSDT"}"#);
        let use_case = ConsultOracleUseCase::new(oracle, Duration::from_secs(2));
        let journal = TickJournal::new();

        let consultation = use_case.execute(&snapshot(), &config(), &journal).await;
        assert!(consultation.plan.is_flat());
        assert!(journal.drain()[0].message.contains("timed out"));
    }
}
