//! Binance-specific error types.

use thiserror::Error;

use crate::application::ports::ExchangeError;

/// Exchange error code for "no need to change margin type".
pub const MARGIN_TYPE_UNCHANGED: i64 = -4046;

/// Exchange error code for "reduce only order is rejected".
pub const REDUCE_ONLY_REJECTED: i64 = -2022;

/// Errors from the Binance adapter.
#[derive(Debug, Error, Clone)]
pub enum BinanceError {
    /// No credentials configured for a signed call.
    #[error("Credentials not configured: {0}")]
    NotConfigured(String),

    /// Credentials present but unusable, or signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// API returned an error.
    #[error("API error {status} ({code:?}): {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Exchange error code, when the body carried one.
        code: Option<i64>,
        /// Error message.
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Network error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Symbol missing from exchange info.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl BinanceError {
    /// Exchange error code, if any.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<BinanceError> for ExchangeError {
    fn from(err: BinanceError) -> Self {
        match err {
            BinanceError::NotConfigured(message) | BinanceError::Signing(message) => {
                Self::NotConfigured { message }
            }
            BinanceError::Api {
                status,
                code,
                message,
            } => Self::Api {
                status,
                code,
                message,
            },
            BinanceError::AuthenticationFailed(message) => Self::Api {
                status: 401,
                code: None,
                message,
            },
            BinanceError::RateLimited { .. } => Self::RateLimited,
            BinanceError::Network(message) => Self::ConnectionError { message },
            BinanceError::MaxRetriesExceeded { attempts } => Self::ConnectionError {
                message: format!("Max retries exceeded after {attempts} attempts"),
            },
            BinanceError::JsonParse(message) => Self::InvalidResponse { message },
            BinanceError::UnknownSymbol(symbol) => Self::UnknownSymbol { symbol },
        }
    }
}
