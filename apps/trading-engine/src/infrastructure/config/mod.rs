//! Configuration and wiring.

mod container;
mod settings;

pub use container::Container;
pub use settings::{
    DEFAULT_SETTINGS_FILE, ENV_PREFIX, ExchangeMode, ExchangeSettings, OracleSettings,
    SchedulerSettings, ServerSettings, Settings, SettingsError, StoreKind, StoreSettings,
};
