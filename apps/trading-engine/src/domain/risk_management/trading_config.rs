//! Persisted trading configuration.
//!
//! Loaded from the state store at the start of every tick, written with
//! defaults on first run and overwritten only by admin `run` / `stop`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::market::RiskConstraints;
use crate::domain::shared::{DomainError, Symbol};

/// Highest leverage accepted in a config override.
pub const MAX_LEVERAGE: u32 = 125;

/// Exchange margin mode applied per symbol before opening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarginMode {
    /// Margin is ring-fenced per position.
    #[default]
    Isolated,
    /// Margin is shared across positions.
    Crossed,
}

impl MarginMode {
    /// Wire value for the exchange `marginType` parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Isolated => "ISOLATED",
            Self::Crossed => "CROSSED",
        }
    }
}

impl fmt::Display for MarginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the engine may open new positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineStatus {
    /// Oracle is consulted and entries are allowed.
    Running,
    /// Exits are still enforced; no oracle calls, no entries.
    #[default]
    Stopped,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Admin-mutable trading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingConfig {
    /// Tradeable symbols.
    pub universe: Vec<Symbol>,
    /// Largest single order in USD.
    pub max_risk_per_trade_usd: Decimal,
    /// Realized loss for the UTC day that blocks new entries.
    pub max_daily_loss_usd: Decimal,
    /// Cap on the sum of open entry notionals.
    pub max_exposure_usd: Decimal,
    /// Leverage applied before opening.
    pub leverage_cap: u32,
    /// Margin mode applied before opening.
    pub margin_mode: MarginMode,
    /// Hard unrealized loss that forces a close.
    pub max_loss_per_trade_usd: Decimal,
    /// Oracle model identifier.
    pub model: String,
    /// Run status.
    pub status: EngineStatus,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            universe: vec![
                Symbol::new("BTCUSDT"),
                Symbol::new("ETHUSDT"),
                Symbol::new("SOLUSDT"),
            ],
            max_risk_per_trade_usd: dec!(100),
            max_daily_loss_usd: dec!(50),
            max_exposure_usd: dec!(300),
            leverage_cap: 5,
            margin_mode: MarginMode::Isolated,
            max_loss_per_trade_usd: dec!(25),
            model: "gpt-4o-mini".to_string(),
            status: EngineStatus::Stopped,
        }
    }
}

impl TradingConfig {
    /// True when entries are allowed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == EngineStatus::Running
    }

    /// True when `symbol` is in the universe.
    #[must_use]
    pub fn allows(&self, symbol: &Symbol) -> bool {
        self.universe.contains(symbol)
    }

    /// Risk limits as stated to the oracle.
    #[must_use]
    pub fn risk_constraints(&self) -> RiskConstraints {
        RiskConstraints {
            max_risk_per_trade_usd: self.max_risk_per_trade_usd,
            max_exposure_usd: self.max_exposure_usd,
            max_daily_loss_usd: self.max_daily_loss_usd,
            max_loss_per_trade_usd: self.max_loss_per_trade_usd,
            leverage_cap: self.leverage_cap,
            universe: self.universe.clone(),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error for an empty or invalid universe, non-positive limits or
    /// leverage outside `1..=125`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.universe.is_empty() {
            return Err(DomainError::invalid("universe", "must not be empty"));
        }
        for symbol in &self.universe {
            symbol.validate()?;
        }
        for (field, value) in [
            ("maxRiskPerTradeUsd", self.max_risk_per_trade_usd),
            ("maxDailyLossUsd", self.max_daily_loss_usd),
            ("maxExposureUsd", self.max_exposure_usd),
            ("maxLossPerTradeUsd", self.max_loss_per_trade_usd),
        ] {
            if value <= Decimal::ZERO {
                return Err(DomainError::invalid(field, "must be positive"));
            }
        }
        if !(1..=MAX_LEVERAGE).contains(&self.leverage_cap) {
            return Err(DomainError::invalid(
                "leverageCap",
                format!("must be between 1 and {MAX_LEVERAGE}"),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(DomainError::invalid("model", "must not be empty"));
        }
        Ok(())
    }
}

/// Partial update supplied with an admin `run` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Replacement universe.
    pub universe: Option<Vec<Symbol>>,
    /// Replacement per-trade cap.
    pub max_risk_per_trade_usd: Option<Decimal>,
    /// Replacement daily loss cap.
    pub max_daily_loss_usd: Option<Decimal>,
    /// Replacement exposure cap.
    pub max_exposure_usd: Option<Decimal>,
    /// Replacement leverage.
    pub leverage_cap: Option<u32>,
    /// Replacement margin mode.
    pub margin_mode: Option<MarginMode>,
    /// Replacement hard per-trade loss.
    pub max_loss_per_trade_usd: Option<Decimal>,
    /// Replacement oracle model.
    pub model: Option<String>,
}

impl ConfigOverrides {
    /// Apply onto `base` and validate the result.
    ///
    /// # Errors
    ///
    /// Returns error if the merged configuration is invalid; `base` is not
    /// modified.
    pub fn apply(self, base: &TradingConfig) -> Result<TradingConfig, DomainError> {
        let mut merged = base.clone();
        if let Some(universe) = self.universe {
            let mut symbols: Vec<Symbol> = Vec::with_capacity(universe.len());
            for symbol in universe.into_iter().map(|s| Symbol::new(s.into_inner())) {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
            merged.universe = symbols;
        }
        if let Some(v) = self.max_risk_per_trade_usd {
            merged.max_risk_per_trade_usd = v;
        }
        if let Some(v) = self.max_daily_loss_usd {
            merged.max_daily_loss_usd = v;
        }
        if let Some(v) = self.max_exposure_usd {
            merged.max_exposure_usd = v;
        }
        if let Some(v) = self.leverage_cap {
            merged.leverage_cap = v;
        }
        if let Some(v) = self.margin_mode {
            merged.margin_mode = v;
        }
        if let Some(v) = self.max_loss_per_trade_usd {
            merged.max_loss_per_trade_usd = v.abs();
        }
        if let Some(v) = self.model {
            merged.model = v.trim().to_string();
        }
        merged.validate()?;
        Ok(merged)
    }
}
