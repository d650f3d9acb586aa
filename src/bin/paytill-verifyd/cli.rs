//! Command-line interface definition.

use clap::{Parser, ValueEnum};
use paytill::config::TillConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Verification gateway for paytill points of sale.
///
/// Tills post payment expectations here instead of talking to the
/// ledger-query service themselves.
#[derive(Parser, Debug)]
#[command(name = "paytill-verifyd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, short, default_value = "127.0.0.1:7710", env = "PAYTILL_LISTEN")]
    pub listen: SocketAddr,

    /// Base URL of the ledger-query service.
    #[arg(long, env = "PAYTILL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Log level.
    #[arg(long, value_enum, default_value = "info", env = "RUST_LOG")]
    pub log_level: CliLogLevel,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Log level CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum CliLogLevel {
    /// Error messages only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages (default).
    #[default]
    Info,
    /// Debug messages.
    Debug,
    /// Trace messages (verbose).
    Trace,
}

impl Cli {
    /// Convert CLI arguments into a `TillConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be
    /// loaded, or if the merged configuration is invalid.
    pub fn into_config(self) -> color_eyre::Result<TillConfig> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            TillConfig::from_file(path)?
        } else {
            TillConfig::default()
        };

        // Override with CLI arguments
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        config.log_level = self.log_level.into();

        config.validate()?;
        Ok(config)
    }
}

impl From<CliLogLevel> for String {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => "error".to_string(),
            CliLogLevel::Warn => "warn".to_string(),
            CliLogLevel::Info => "info".to_string(),
            CliLogLevel::Debug => "debug".to_string(),
            CliLogLevel::Trace => "trace".to_string(),
        }
    }
}
