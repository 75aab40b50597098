//! Binance USDⓈ-M futures adapter configuration.

use std::fmt;
use std::time::Duration;

/// Futures API environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinanceEnvironment {
    /// Futures testnet.
    Testnet,
    /// Production futures API (real money).
    Live,
}

impl BinanceEnvironment {
    /// Get the base URL for the futures REST API.
    #[must_use]
    pub const fn base_url(&self) -> &'static str {
        match self {
            Self::Testnet => "https://testnet.binancefuture.com",
            Self::Live => "https://fapi.binance.com",
        }
    }

    /// Check if this is live trading.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl fmt::Display for BinanceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Testnet => write!(f, "TESTNET"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Signing credentials. Only one scheme is used at a time.
#[derive(Clone)]
pub enum Credentials {
    /// API key with an HMAC-SHA256 secret.
    ApiKey {
        /// API key sent as `X-MBX-APIKEY`.
        api_key: String,
        /// HMAC secret.
        api_secret: String,
    },
    /// EIP-191 message signing with a wallet key.
    Wallet {
        /// Hex private key, with or without `0x`.
        private_key: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey { api_key, .. } => f
                .debug_struct("ApiKey")
                .field("api_key", api_key)
                .field("api_secret", &"<redacted>")
                .finish(),
            Self::Wallet { .. } => f
                .debug_struct("Wallet")
                .field("private_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Configuration for the Binance exchange adapter.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    /// Signing credentials; `None` makes signed calls fail closed.
    pub credentials: Option<Credentials>,
    /// API environment.
    pub environment: BinanceEnvironment,
    /// Base URL override (tests, proxies).
    pub base_url: Option<String>,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// `recvWindow` sent with signed requests, in milliseconds.
    pub recv_window_ms: u64,
    /// Retry policy configuration.
    pub retry: RetryConfig,
}

impl BinanceConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(credentials: Option<Credentials>, environment: BinanceEnvironment) -> Self {
        Self {
            credentials,
            environment,
            base_url: None,
            timeout: Duration::from_secs(10),
            recv_window_ms: 5_000,
            retry: RetryConfig::default(),
        }
    }

    /// Point the adapter at a different host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Effective base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_urls() {
        assert!(BinanceEnvironment::Testnet.base_url().contains("testnet"));
        assert!(!BinanceEnvironment::Testnet.is_live());
        assert!(BinanceEnvironment::Live.is_live());
        assert_eq!(BinanceEnvironment::Live.to_string(), "LIVE");
    }

    #[test]
    fn base_url_override_trims_slash() {
        let config = BinanceConfig::new(None, BinanceEnvironment::Testnet)
            .with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn debug_redacts_secrets() {
        let credentials = Credentials::ApiKey {
            api_key: "key".to_string(),
            api_secret: "very-secret".to_string(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("key"));
        assert!(!rendered.contains("very-secret"));

        let wallet = Credentials::Wallet {
            private_key: "0xdeadbeef".to_string(),
        };
        assert!(!format!("{wallet:?}").contains("deadbeef"));
    }
}
