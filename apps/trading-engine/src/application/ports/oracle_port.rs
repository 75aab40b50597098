//! Decision Oracle Port (Driven Port)
//!
//! Interface for the external inference service that proposes trade plans.

use async_trait::async_trait;

use crate::domain::market::{MarketSnapshot, RiskConstraints};

/// Input for one oracle consult.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// Market snapshot.
    pub snapshot: MarketSnapshot,
    /// Risk limits to respect.
    pub constraints: RiskConstraints,
    /// Model identifier from the trading config.
    pub model: String,
}

/// Raw oracle answer. The content is untrusted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleReply {
    /// Message content, expected to be a JSON plan.
    pub content: String,
    /// Provider name.
    pub provider: String,
    /// Model that produced the answer.
    pub model: String,
}

/// Oracle port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    /// API key or endpoint missing.
    #[error("Oracle not configured: {message}")]
    NotConfigured {
        /// What is missing.
        message: String,
    },

    /// Request exceeded its deadline.
    #[error("Oracle timed out after {after_secs}s")]
    Timeout {
        /// Deadline in seconds.
        after_secs: u64,
    },

    /// Network failure.
    #[error("Oracle connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("Oracle API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Response had no usable content.
    #[error("Invalid oracle response: {message}")]
    InvalidResponse {
        /// Details.
        message: String,
    },
}

/// Port for the decision oracle.
#[async_trait]
pub trait DecisionOraclePort: Send + Sync {
    /// Provider name recorded in runtime state and position provenance.
    fn provider(&self) -> &str;

    /// Ask for a trade plan.
    async fn decide(&self, request: &OracleRequest) -> Result<OracleReply, OracleError>;
}
