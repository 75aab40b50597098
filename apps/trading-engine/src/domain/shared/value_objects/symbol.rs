//! Symbol value object for perpetual contract identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// Quote assets recognised when splitting a contract symbol.
const QUOTE_ASSETS: [&str; 4] = ["USDT", "USDC", "BUSD", "USD"];

/// A perpetual contract symbol such as "BTCUSDT".
///
/// Symbols are normalized to uppercase so that "btcusdt" and "BTCUSDT"
/// address the same ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    ///
    /// The symbol is trimmed and normalized to uppercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Base asset of the contract ("BTC" for "BTCUSDT").
    ///
    /// Returns the full symbol when no known quote asset suffix matches.
    #[must_use]
    pub fn base_asset(&self) -> &str {
        QUOTE_ASSETS
            .iter()
            .find_map(|quote| {
                self.0
                    .strip_suffix(quote)
                    .filter(|base| !base.is_empty())
            })
            .unwrap_or(&self.0)
    }

    /// Validate the symbol before it is sent to the exchange.
    ///
    /// # Errors
    ///
    /// Returns error if symbol is empty, too long or contains invalid characters.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.0.is_empty() {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "Symbol cannot be empty".to_string(),
            });
        }

        if self.0.len() > 20 {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "Symbol exceeds maximum length".to_string(),
            });
        }

        if !self.0.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidValue {
                field: "symbol".to_string(),
                message: "Symbol contains invalid characters".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
