//! Command-line interface definition.

use clap::{Parser, Subcommand, ValueEnum};
use paytill::config::{TillConfig, VerifyVia};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Point-of-sale till for ledger-settled payments.
#[derive(Parser, Debug)]
#[command(name = "paytill")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the ledger-query service, or of the gateway when
    /// verifying via one.
    #[arg(long, env = "PAYTILL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Verification backend.
    #[arg(long, value_enum, env = "PAYTILL_VERIFY_VIA")]
    pub verify_via: Option<CliVerifyVia>,

    /// Delay between verification attempts, in milliseconds.
    #[arg(long, env = "PAYTILL_TICK_INTERVAL_MS")]
    pub tick_interval_ms: Option<u64>,

    /// Give up on a checkout after this long, in milliseconds.
    #[arg(long, env = "PAYTILL_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: TillCommand,
}

/// Till subcommands.
#[derive(Subcommand, Debug)]
pub enum TillCommand {
    /// Charge an amount: show the payment code and wait for settlement.
    Charge {
        /// Amount to charge, in display units (e.g. "1.5").
        amount: Decimal,

        /// Merchant account that receives the payment (Base58).
        #[arg(long, env = "PAYTILL_RECIPIENT")]
        recipient: Option<String>,

        /// Order memo the payment must carry (e.g. an order number).
        #[arg(long, short)]
        memo: Option<String>,

        /// Merchant name shown by the payer's wallet.
        #[arg(long)]
        label: Option<String>,

        /// Note shown by the payer's wallet.
        #[arg(long)]
        message: Option<String>,

        /// Also write the payment code as an SVG to this path.
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Write the active configuration to a TOML file.
    Init {
        /// Destination path (defaults to ./paytill.toml).
        path: Option<PathBuf>,
    },
}

/// Verification backend CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum CliVerifyVia {
    /// Query the ledger-query service directly.
    #[default]
    Ledger,
    /// Delegate to a paytill-verifyd gateway.
    Gateway,
}

impl Cli {
    /// Merge the configuration file (if any) with CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be
    /// loaded, or if the merged configuration is invalid.
    pub fn to_config(&self) -> color_eyre::Result<TillConfig> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            TillConfig::from_file(path)?
        } else {
            TillConfig::default()
        };

        // Override with CLI arguments
        if let Some(ref endpoint) = self.endpoint {
            config.endpoint.clone_from(endpoint);
        }
        if let Some(verify_via) = self.verify_via {
            config.verify_via = verify_via.into();
        }
        if let Some(tick_interval_ms) = self.tick_interval_ms {
            config.tick_interval_ms = tick_interval_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        config.log_level.clone_from(&self.log_level);

        config.validate()?;
        Ok(config)
    }
}

impl From<CliVerifyVia> for VerifyVia {
    fn from(v: CliVerifyVia) -> Self {
        match v {
            CliVerifyVia::Ledger => Self::Ledger,
            CliVerifyVia::Gateway => Self::Gateway,
        }
    }
}
