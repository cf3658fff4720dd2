//! Configuration structures.
//!
//! Configuration is loaded from environment variables. The inactivity
//! interval is a compile-time constant and is never read from the environment.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inactivity interval before an unheld, idle service exits.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_millis(12_000);

/// Presence of this variable keeps the service alive indefinitely.
pub const PERSIST_ENV: &str = "EXAMPLE_SEARCH_PROVIDER_PERSIST";

/// Set to `json` to switch log output to JSON lines.
pub const LOG_FORMAT_ENV: &str = "SEARCH_PROVIDER_LOG_FORMAT";

/// Global service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Lifecycle configuration.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Build configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Presence alone enables persistence, whatever the value.
        config.service.persist = lookup(PERSIST_ENV).is_some();

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.observability.json_logs = format.eq_ignore_ascii_case("json");
        }

        config
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Take one hold at startup so the idle timer never fires.
    pub persist: bool,

    /// Inactivity interval before exit.
    #[serde(with = "humantime_serde")]
    pub inactivity_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            persist: false,
            inactivity_timeout: INACTIVITY_TIMEOUT,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
