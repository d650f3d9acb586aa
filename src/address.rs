//! Ledger account addresses.
//!
//! Accounts are identified by 32 raw bytes, shown to humans in Base58.
//! The textual form is what appears in payment links, configuration
//! files, and the wire format of the ledger-query service.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decode Base58 text into exactly 32 bytes.
///
/// Shared by every identifier type that uses the on-ledger account
/// encoding. Returns a plain message so callers can wrap it in the
/// error variant that fits their context.
pub(crate) fn decode_base58_32(text: &str) -> std::result::Result<[u8; 32], String> {
    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| format!("invalid base58: {e}"))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| format!("expected 32 bytes, got {}", bytes.len()))
}

/// A ledger account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 32]);

impl Address {
    /// Length of an address in bytes.
    pub const LEN: usize = 32;

    /// Create an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse an address from its Base58 form.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid Base58 or does not
    /// decode to exactly 32 bytes.
    pub fn from_base58(text: &str) -> Result<Self> {
        decode_base58_32(text).map(Self).map_err(Error::Address)
    }

    /// The raw bytes of the address.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.0).into_string())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_base58() {
        let address = Address::new([7u8; 32]);
        let text = address.to_string();
        let parsed: Address = text.parse().unwrap();
        assert_eq!(parsed, address);
    }

    #[test]
    fn all_zero_address_is_a_run_of_ones() {
        // Base58 encodes each leading zero byte as the digit '1'.
        let address = Address::new([0u8; 32]);
        assert_eq!(address.to_string(), "1".repeat(32));
    }

    #[test]
    fn rejects_non_base58_text() {
        let result = Address::from_base58("not-base58-0OIl");
        assert!(matches!(result, Err(Error::Address(_))));
    }

    #[test]
    fn rejects_wrong_length() {
        let short = bs58::encode([1u8; 16]).into_string();
        let result = Address::from_base58(&short);
        assert!(matches!(result, Err(Error::Address(msg)) if msg.contains("16")));
    }

    #[test]
    fn serializes_as_base58_string() {
        let address = Address::new([7u8; 32]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{address}\""));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
