//! Error types for paytill.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in paytill.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A charge amount the till cannot accept.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Failure to render or parse a payment instruction.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Account text that does not decode to a valid address.
    #[error("invalid address: {0}")]
    Address(String),

    /// The ledger-query service could not be reached or gave a bad answer.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
