//! Process settings.
//!
//! Layered with the `config` crate: built-in defaults, then an optional YAML
//! file, then `ENGINE__*` environment variables (`__` separates levels, e.g.
//! `ENGINE__SERVER__HTTP_PORT=8081`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::EngineTuning;
use crate::infrastructure::exchange::binance::{
    BinanceConfig, BinanceEnvironment, Credentials, RetryConfig,
};
use crate::infrastructure::oracle::ChatOracleConfig;

/// Default settings file, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "engine.yaml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ENGINE";

/// Settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A source could not be read or deserialized.
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// Values are individually valid but unusable together.
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Root settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP server.
    pub server: ServerSettings,
    /// Exchange adapter.
    pub exchange: ExchangeSettings,
    /// Decision oracle adapter.
    pub oracle: OracleSettings,
    /// State store.
    pub store: StoreSettings,
    /// Periodic tick scheduler.
    pub scheduler: SchedulerSettings,
    /// Shared secret for `run` and `stop`. Unset refuses both.
    pub admin_secret: Option<String>,
    /// Engine tuning.
    pub engine: EngineTuning,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub bind_address: String,
    /// Control surface port.
    pub http_port: u16,
    /// Prometheus exporter port; unset disables the exporter.
    pub metrics_port: Option<u16>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: 8080,
            metrics_port: None,
        }
    }
}

/// Which venue orders go to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeMode {
    /// Public market data, simulated account.
    #[default]
    Paper,
    /// Futures testnet.
    Testnet,
    /// Production futures API.
    Live,
}

/// Exchange settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    /// Venue selection.
    pub mode: ExchangeMode,
    /// API key for HMAC signing.
    pub api_key: Option<String>,
    /// HMAC secret.
    pub api_secret: Option<String>,
    /// Wallet key for EIP-191 signing.
    pub wallet_private_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// `recvWindow` for signed calls.
    pub recv_window_ms: u64,
    /// Attempts per request, including the first.
    pub max_attempts: u32,
    /// Starting balance of the simulated account in paper mode.
    pub paper_balance_usd: Decimal,
}

impl std::fmt::Debug for ExchangeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeSettings")
            .field("mode", &self.mode)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("wallet_private_key", &self.wallet_private_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("max_attempts", &self.max_attempts)
            .field("paper_balance_usd", &self.paper_balance_usd)
            .finish()
    }
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            mode: ExchangeMode::Paper,
            api_key: None,
            api_secret: None,
            wallet_private_key: None,
            base_url: None,
            timeout_secs: 10,
            recv_window_ms: 5_000,
            max_attempts: 3,
            paper_balance_usd: dec!(1000),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ExchangeSettings {
    /// Signing credentials, if configured. A wallet key wins over an API key.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        if let Some(private_key) = non_empty(self.wallet_private_key.as_ref()) {
            return Some(Credentials::Wallet { private_key });
        }
        match (non_empty(self.api_key.as_ref()), non_empty(self.api_secret.as_ref())) {
            (Some(api_key), Some(api_secret)) => Some(Credentials::ApiKey {
                api_key,
                api_secret,
            }),
            _ => None,
        }
    }

    /// Adapter configuration. Paper mode reads public data from the live API.
    #[must_use]
    pub fn binance_config(&self) -> BinanceConfig {
        let (credentials, environment) = match self.mode {
            ExchangeMode::Paper => (None, BinanceEnvironment::Live),
            ExchangeMode::Testnet => (self.credentials(), BinanceEnvironment::Testnet),
            ExchangeMode::Live => (self.credentials(), BinanceEnvironment::Live),
        };
        let mut config = BinanceConfig::new(credentials, environment)
            .with_timeout(Duration::from_secs(self.timeout_secs.max(1)))
            .with_retry(RetryConfig {
                max_attempts: self.max_attempts.max(1),
                ..RetryConfig::default()
            });
        config.recv_window_ms = self.recv_window_ms;
        if let Some(base_url) = non_empty(self.base_url.as_ref()) {
            config = config.with_base_url(base_url);
        }
        config
    }
}

/// Oracle settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Provider label recorded in runtime state.
    pub provider: String,
    /// Chat-completions base URL.
    pub base_url: String,
    /// Bearer token.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
}

impl std::fmt::Debug for OracleSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSettings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        let defaults = ChatOracleConfig::default();
        Self {
            provider: defaults.provider,
            base_url: defaults.base_url,
            api_key: None,
            temperature: defaults.temperature,
        }
    }
}

impl OracleSettings {
    /// Adapter configuration; the HTTP timeout matches the consult deadline.
    #[must_use]
    pub fn chat_config(&self, timeout: Duration) -> ChatOracleConfig {
        ChatOracleConfig {
            api_key: non_empty(self.api_key.as_ref()),
            base_url: self.base_url.clone(),
            provider: self.provider.clone(),
            timeout,
            temperature: self.temperature,
        }
    }
}

/// State store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process memory; lost on restart.
    Memory,
    /// One JSON file per key.
    #[default]
    File,
}

/// State store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Backend.
    pub kind: StoreKind,
    /// Directory for the file store.
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: PathBuf::from("data"),
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Seconds between ticks; 0 disables the scheduler.
    pub interval_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl SchedulerSettings {
    /// Interval as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Settings {
    /// Load from `path` (default [`DEFAULT_SETTINGS_FILE`], optional) and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = path.map_or_else(
            || File::with_name(DEFAULT_SETTINGS_FILE).required(false),
            |p| File::from(p).required(true),
        );
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Self::finish(config)
    }

    /// Load from a YAML string only.
    pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;
        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self, SettingsError> {
        let mut settings: Self = config.try_deserialize()?;
        settings.engine = settings.engine.normalized();
        settings.validate()?;
        Ok(settings)
    }

    /// Cross-field checks.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.exchange.mode != ExchangeMode::Paper && self.exchange.credentials().is_none() {
            tracing::warn!(
                mode = ?self.exchange.mode,
                "Exchange credentials missing; account and order calls will be refused"
            );
        }
        if self.exchange.mode == ExchangeMode::Paper && self.exchange.paper_balance_usd <= Decimal::ZERO {
            return Err(SettingsError::Invalid(
                "exchange.paper_balance_usd must be positive".to_string(),
            ));
        }
        if self.store.kind == StoreKind::File && self.store.path.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("store.path must be set".to_string()));
        }
        if self
            .admin_secret
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            return Err(SettingsError::Invalid(
                "admin_secret must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}
