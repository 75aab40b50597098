//! Control surface DTOs

use serde::{Deserialize, Serialize};

use crate::domain::decision::TradePlan;
use crate::domain::ledger::RuntimeState;
use crate::domain::risk_management::TradingConfig;

/// DTO for `getStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDto {
    /// Persisted trading configuration.
    pub config: TradingConfig,
    /// Runtime state after the last tick.
    pub runtime: RuntimeState,
}

/// DTO for a tick invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickResultDto {
    /// Whether the tick ran to completion.
    pub ok: bool,
    /// Short outcome description.
    pub meta: String,
    /// Status after the tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusDto>,
    /// Plan the tick acted on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<TradePlan>,
}

impl TickResultDto {
    /// Tick rejected by the single-flight guard.
    #[must_use]
    pub fn in_progress() -> Self {
        Self {
            ok: false,
            meta: "tick already in progress".to_string(),
            status: None,
            decision: None,
        }
    }
}
