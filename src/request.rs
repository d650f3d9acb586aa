//! Payment requests and the references that identify them.
//!
//! A checkout starts with a [`PaymentRequest`]: the merchant account,
//! the amount due, and an optional order memo, stamped with a freshly
//! generated [`Reference`]. The reference is the only piece of the
//! request the payer's wallet must echo back on the ledger, so it is
//! what verification keys on.

use crate::address::{decode_base58_32, Address};
use crate::error::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use tokio::time::Instant;

/// An opaque per-checkout identifier embedded in the payment instruction.
///
/// References use the same 32-byte Base58 encoding as account addresses
/// so wallets can attach them to a transaction unchanged. Each checkout
/// gets its own; two requests never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference([u8; 32]);

impl Reference {
    /// Length of a reference in bytes.
    pub const LEN: usize = 32;

    /// Generate a fresh reference from the operating system's RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a reference from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a reference from its Base58 form.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid Base58 or does not
    /// decode to exactly 32 bytes.
    pub fn from_base58(text: &str) -> Result<Self> {
        decode_base58_32(text)
            .map(Self)
            .map_err(|e| Error::Encoding(format!("invalid reference: {e}")))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for Reference {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A single checkout's payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Merchant account that receives the payment.
    pub recipient: Address,
    /// Unique identifier for this checkout.
    pub reference: Reference,
    /// Amount due, in display units of the ledger's native token.
    pub amount: Decimal,
    /// Order memo the payment should carry, such as an order number.
    pub memo: Option<String>,
    /// When the request was created.
    pub created_at: SystemTime,
    // Monotonic twin of `created_at`; anchors the checkout deadline.
    pub(crate) created: Instant,
}

impl PaymentRequest {
    /// Create a payment request for `amount` owed to `recipient`,
    /// stamped with a freshly generated reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is zero or negative.
    pub fn new(recipient: Address, amount: Decimal, memo: Option<String>) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            recipient,
            reference: Reference::generate(),
            amount,
            memo,
            created_at: SystemTime::now(),
            created: Instant::now(),
        })
    }

    /// What a settling transaction must look like for this request.
    #[must_use]
    pub fn expectation(&self) -> PaymentExpectation {
        PaymentExpectation {
            reference: self.reference,
            recipient: self.recipient,
            amount: self.amount,
            memo: self.memo.clone(),
        }
    }
}

/// The facts a verifier checks an on-ledger transaction against.
///
/// This is also the request body of the verification gateway, so its
/// serialized form is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentExpectation {
    /// Reference the transaction must carry.
    pub reference: Reference,
    /// Account the transaction must pay.
    pub recipient: Address,
    /// Exact amount the transaction must transfer.
    pub amount: Decimal,
    /// Memo the transaction must carry, if the checkout set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}
