//! Payment verification.
//!
//! A [`Verifier`] answers one question: has the expected payment
//! settled on the ledger? The answer is always a [`VerificationResult`];
//! lookup failures fold into [`VerificationResult::TransientError`] so a
//! flaky network reads as "ask again later" rather than an error the
//! checkout has to handle.
//!
//! [`LedgerVerifier`] queries the ledger-query service directly.
//! [`GatewayVerifier`] delegates to a `paytill-verifyd` gateway, which
//! keeps ledger credentials and addresses off the till.

use crate::ledger::{LedgerClient, ReferenceMatch, TransactionRecord, REQUEST_TIMEOUT};
use crate::request::PaymentExpectation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Outcome of a single verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    /// No settled transaction mentions the reference yet.
    Pending,
    /// A settled transaction matches the expectation in full.
    Confirmed {
        /// Signature of the settling transaction.
        signature: String,
    },
    /// A settled transaction mentions the reference but does not match
    /// the expectation.
    Invalid {
        /// Signature of the offending transaction.
        signature: String,
    },
    /// The attempt could not produce an answer; worth retrying.
    TransientError {
        /// What went wrong.
        detail: String,
    },
}

/// Checks whether an expected payment has settled.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Run one verification attempt for `expected`.
    ///
    /// Implementations never fail; anything that prevents an answer is
    /// reported as [`VerificationResult::TransientError`].
    async fn verify(&self, expected: &PaymentExpectation) -> VerificationResult;
}

/// Decide whether a settled transaction settles the expected payment.
///
/// The reference already ties `record` to this checkout; this checks
/// that the transfer itself is the one the merchant asked for. The memo
/// is compared only when the checkout set one.
#[must_use]
pub fn match_record(
    expected: &PaymentExpectation,
    record: &TransactionRecord,
) -> VerificationResult {
    let signature = record.signature.clone();

    if record.err.as_deref().is_some_and(|err| !err.is_empty()) {
        debug!("Transaction {signature} executed with an error");
        return VerificationResult::Invalid { signature };
    }
    if record.recipient != expected.recipient {
        debug!("Transaction {signature} pays the wrong recipient");
        return VerificationResult::Invalid { signature };
    }
    if record.amount != expected.amount {
        debug!(
            "Transaction {signature} transfers {} instead of {}",
            record.amount, expected.amount
        );
        return VerificationResult::Invalid { signature };
    }
    if let Some(memo) = &expected.memo {
        if record.memo.as_deref() != Some(memo.as_str()) {
            debug!("Transaction {signature} carries a different memo");
            return VerificationResult::Invalid { signature };
        }
    }

    VerificationResult::Confirmed { signature }
}

/// Which lookup result, if any, is authoritative for a reference.
enum Candidate<'a> {
    None,
    One(&'a ReferenceMatch),
    Ambiguous(u64),
}

/// Pick the match from the highest slot. A tie means two settled
/// transactions claim the same reference and neither can be trusted as
/// the answer on its own.
fn newest_match(matches: &[ReferenceMatch]) -> Candidate<'_> {
    let Some(best) = matches.iter().max_by_key(|m| m.slot) else {
        return Candidate::None;
    };
    if matches.iter().filter(|m| m.slot == best.slot).count() > 1 {
        Candidate::Ambiguous(best.slot)
    } else {
        Candidate::One(best)
    }
}

/// Verifier that queries the ledger-query service directly.
#[derive(Debug, Clone)]
pub struct LedgerVerifier {
    ledger: LedgerClient,
}

impl LedgerVerifier {
    /// Create a verifier backed by `ledger`.
    #[must_use]
    pub fn new(ledger: LedgerClient) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Verifier for LedgerVerifier {
    async fn verify(&self, expected: &PaymentExpectation) -> VerificationResult {
        let matches = match self.ledger.signatures_for_reference(&expected.reference).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Reference lookup failed: {e}");
                return VerificationResult::TransientError {
                    detail: e.to_string(),
                };
            }
        };

        let candidate = match newest_match(&matches) {
            Candidate::None => {
                debug!("No settled transaction references {} yet", expected.reference);
                return VerificationResult::Pending;
            }
            Candidate::Ambiguous(slot) => {
                warn!(
                    "Reference {} matched by multiple transactions in slot {slot}",
                    expected.reference
                );
                return VerificationResult::TransientError {
                    detail: format!("ambiguous reference: multiple transactions in slot {slot}"),
                };
            }
            Candidate::One(candidate) => candidate,
        };

        let record = match self.ledger.transaction(&candidate.signature).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Transaction fetch failed for {}: {e}", candidate.signature);
                return VerificationResult::TransientError {
                    detail: e.to_string(),
                };
            }
        };

        match_record(expected, &record)
    }
}

/// Verifier that asks a `paytill-verifyd` gateway instead of the ledger.
#[derive(Debug, Clone)]
pub struct GatewayVerifier {
    endpoint: String,
    client: reqwest::Client,
}

impl GatewayVerifier {
    /// Create a verifier that posts expectations to the gateway at
    /// `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("paytill/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl Verifier for GatewayVerifier {
    async fn verify(&self, expected: &PaymentExpectation) -> VerificationResult {
        let url = format!("{}/verify", self.endpoint);
        let response = match self.client.post(&url).json(expected).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Gateway request failed: {e}");
                return VerificationResult::TransientError {
                    detail: e.to_string(),
                };
            }
        };
        if !response.status().is_success() {
            warn!("Gateway returned status {}", response.status());
            return VerificationResult::TransientError {
                detail: format!("gateway returned status {}", response.status()),
            };
        }
        match response.json::<VerificationResult>().await {
            Ok(result) => result,
            Err(e) => {
                warn!("Failed to parse gateway response: {e}");
                VerificationResult::TransientError {
                    detail: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::request::Reference;

    fn expectation(memo: Option<&str>) -> PaymentExpectation {
        PaymentExpectation {
            reference: Reference::from_bytes([1u8; 32]),
            recipient: Address::new([7u8; 32]),
            amount: "1.5".parse().unwrap(),
            memo: memo.map(String::from),
        }
    }

    fn record() -> TransactionRecord {
        TransactionRecord {
            signature: "sig123".to_string(),
            slot: 42,
            recipient: Address::new([7u8; 32]),
            amount: "1.5".parse().unwrap(),
            memo: Some("#100001".to_string()),
            err: None,
        }
    }

    #[test]
    fn confirms_a_matching_transaction() {
        let result = match_record(&expectation(Some("#100001")), &record());
        assert_eq!(
            result,
            VerificationResult::Confirmed {
                signature: "sig123".to_string()
            }
        );
    }

    #[test]
    fn amount_comparison_ignores_scale() {
        let mut record = record();
        record.amount = "1.50".parse().unwrap();
        let result = match_record(&expectation(None), &record);
        assert!(matches!(result, VerificationResult::Confirmed { .. }));
    }

    #[test]
    fn rejects_a_failed_transaction() {
        let mut record = record();
        record.err = Some("insufficient funds".to_string());
        let result = match_record(&expectation(None), &record);
        assert_eq!(
            result,
            VerificationResult::Invalid {
                signature: "sig123".to_string()
            }
        );
    }

    #[test]
    fn empty_err_counts_as_success() {
        let mut record = record();
        record.err = Some(String::new());
        let result = match_record(&expectation(None), &record);
        assert!(matches!(result, VerificationResult::Confirmed { .. }));
    }

    #[test]
    fn rejects_the_wrong_recipient() {
        let mut record = record();
        record.recipient = Address::new([8u8; 32]);
        let result = match_record(&expectation(None), &record);
        assert!(matches!(result, VerificationResult::Invalid { .. }));
    }

    #[test]
    fn rejects_the_wrong_amount() {
        let mut record = record();
        record.amount = "1.49".parse().unwrap();
        let result = match_record(&expectation(None), &record);
        assert!(matches!(result, VerificationResult::Invalid { .. }));
    }

    #[test]
    fn rejects_a_missing_memo_when_one_is_expected() {
        let mut record = record();
        record.memo = None;
        let result = match_record(&expectation(Some("#100001")), &record);
        assert!(matches!(result, VerificationResult::Invalid { .. }));
    }

    #[test]
    fn rejects_a_different_memo() {
        let result = match_record(&expectation(Some("#100002")), &record());
        assert!(matches!(result, VerificationResult::Invalid { .. }));
    }

    #[test]
    fn ignores_the_memo_when_none_is_expected() {
        let result = match_record(&expectation(None), &record());
        assert!(matches!(result, VerificationResult::Confirmed { .. }));
    }

    fn matches_at(slots: &[u64]) -> Vec<ReferenceMatch> {
        slots
            .iter()
            .enumerate()
            .map(|(i, &slot)| ReferenceMatch {
                signature: format!("sig{i}"),
                slot,
            })
            .collect()
    }

    #[test]
    fn no_matches_yields_no_candidate() {
        assert!(matches!(newest_match(&[]), Candidate::None));
    }

    #[test]
    fn picks_the_newest_slot() {
        let matches = matches_at(&[10, 42, 7]);
        match newest_match(&matches) {
            Candidate::One(m) => assert_eq!(m.slot, 42),
            _ => panic!("expected a single candidate"),
        }
    }

    #[test]
    fn a_slot_tie_is_ambiguous() {
        let matches = matches_at(&[10, 42, 42]);
        assert!(matches!(newest_match(&matches), Candidate::Ambiguous(42)));
    }

    #[test]
    fn older_duplicates_do_not_make_a_tie() {
        let matches = matches_at(&[10, 10, 42]);
        assert!(matches!(newest_match(&matches), Candidate::One(_)));
    }

    #[test]
    fn results_serialize_with_a_status_tag() {
        let json = serde_json::to_string(&VerificationResult::Pending).unwrap();
        assert_eq!(json, r#"{"status":"pending"}"#);

        let json = serde_json::to_string(&VerificationResult::Confirmed {
            signature: "sig123".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"confirmed","signature":"sig123"}"#);

        let json = serde_json::to_string(&VerificationResult::TransientError {
            detail: "timeout".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"transient_error","detail":"timeout"}"#);
    }

    #[test]
    fn results_deserialize_from_the_status_tag() {
        let result: VerificationResult =
            serde_json::from_str(r#"{"status":"invalid","signature":"sig456"}"#).unwrap();
        assert_eq!(
            result,
            VerificationResult::Invalid {
                signature: "sig456".to_string()
            }
        );
    }
}
