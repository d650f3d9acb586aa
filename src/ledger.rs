//! Client for the ledger-query service.
//!
//! The till never talks to the ledger itself. It queries a small REST
//! service that indexes settled transactions:
//!
//! * `GET /v1/reference/{reference}` lists the signatures of
//!   transactions that mention a reference, with the slot each landed in.
//! * `GET /v1/transaction/{signature}` returns the settled transfer
//!   details for one signature.

use crate::address::Address;
use crate::error::{Error, Result};
use crate::request::Reference;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Request timeout for ledger queries.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A transaction signature paired with the slot it landed in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferenceMatch {
    /// Signature of the transaction.
    pub signature: String,
    /// Slot the transaction was settled in.
    pub slot: u64,
}

/// Settled transfer details for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionRecord {
    /// Signature of the transaction.
    pub signature: String,
    /// Slot the transaction was settled in.
    pub slot: u64,
    /// Account the transaction paid.
    pub recipient: Address,
    /// Amount transferred, in display units.
    pub amount: Decimal,
    /// Memo the transaction carried, if any.
    #[serde(default)]
    pub memo: Option<String>,
    /// Execution error reported by the ledger, if the transaction failed.
    #[serde(default)]
    pub err: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceResponse {
    signatures: Vec<ReferenceMatch>,
}

/// HTTP client for one ledger-query endpoint.
#[derive(Debug, Clone)]
pub struct LedgerClient {
    base_url: String,
    client: reqwest::Client,
}

impl LedgerClient {
    /// Create a client for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("paytill/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// The endpoint this client queries.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Transactions that mention `reference`, if any have settled yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached, answers with
    /// a non-success status, or returns a body that does not parse.
    pub async fn signatures_for_reference(
        &self,
        reference: &Reference,
    ) -> Result<Vec<ReferenceMatch>> {
        let url = format!("{}/v1/reference/{reference}", self.base_url);
        debug!("Looking up reference at {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Ledger(format!("reference lookup failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Ledger(format!(
                "reference lookup returned status {}",
                response.status()
            )));
        }

        let body: ReferenceResponse = response
            .json()
            .await
            .map_err(|e| Error::Ledger(format!("failed to parse reference lookup: {e}")))?;
        Ok(body.signatures)
    }

    /// Settled details of the transaction with `signature`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached, answers with
    /// a non-success status, or returns a body that does not parse.
    pub async fn transaction(&self, signature: &str) -> Result<TransactionRecord> {
        let url = format!("{}/v1/transaction/{signature}", self.base_url);
        debug!("Fetching transaction at {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Ledger(format!("transaction fetch failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Ledger(format!(
                "transaction fetch returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Ledger(format!("failed to parse transaction: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slashes_from_the_base_url() {
        let client = LedgerClient::new("http://127.0.0.1:8899/");
        assert_eq!(client.base_url(), "http://127.0.0.1:8899");
    }

    #[test]
    fn parses_a_reference_lookup_response() {
        let json = r#"{"signatures":[{"signature":"sig1","slot":10},{"signature":"sig2","slot":42}]}"#;
        let body: ReferenceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.signatures.len(), 2);
        assert_eq!(body.signatures[1].signature, "sig2");
        assert_eq!(body.signatures[1].slot, 42);
    }

    #[test]
    fn parses_a_transaction_record() {
        let json = format!(
            r##"{{"signature":"sig1","slot":42,"recipient":"{}","amount":"1.50","memo":"#100001","err":null}}"##,
            "1".repeat(32)
        );
        let record: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.recipient, Address::new([0u8; 32]));
        assert_eq!(record.amount, "1.5".parse().unwrap());
        assert_eq!(record.memo.as_deref(), Some("#100001"));
        assert_eq!(record.err, None);
    }

    #[test]
    fn transaction_record_defaults_optional_fields() {
        let json = format!(
            r#"{{"signature":"sig1","slot":1,"recipient":"{}","amount":"2"}}"#,
            "1".repeat(32)
        );
        let record: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.memo, None);
        assert_eq!(record.err, None);
    }
}
