//! Configuration for paytill.

use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Which backend verification attempts go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyVia {
    /// Query the ledger-query service directly.
    #[default]
    Ledger,
    /// Delegate to a paytill-verifyd gateway.
    Gateway,
}

/// Till configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TillConfig {
    /// Base URL of the ledger-query service, or of the gateway when
    /// `verify_via` is `gateway`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Verification backend.
    #[serde(default)]
    pub verify_via: VerifyVia,

    /// Merchant account that receives payments (Base58).
    /// If not set, every charge must name a recipient explicitly.
    #[serde(default)]
    pub recipient: Option<String>,

    /// Merchant name shown by the payer's wallet.
    #[serde(default)]
    pub label: Option<String>,

    /// Delay between verification attempts, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How long a checkout waits before giving up, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TillConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            verify_via: VerifyVia::default(),
            recipient: None,
            label: None,
            tick_interval_ms: default_tick_interval_ms(),
            timeout_ms: default_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl TillConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or an interval is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if self.endpoint.is_empty() {
            return Err(crate::Error::Config("endpoint must not be empty".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(crate::Error::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(crate::Error::Config(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&TillConfig> for SessionConfig {
    fn from(config: &TillConfig) -> Self {
        Self::from_millis(config.tick_interval_ms, config.timeout_ms)
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8899".to_string()
}

const fn default_tick_interval_ms() -> u64 {
    3000
}

const fn default_timeout_ms() -> u64 {
    180_000 // 3 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}
