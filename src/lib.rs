//! # paytill
//!
//! Point-of-sale payment requests with asynchronous on-ledger
//! confirmation.
//!
//! A till creates a [`PaymentRequest`], shows it to the payer as a
//! `paytill:` link or QR code, and runs a [`PollSession`] that checks
//! the ledger until the payment settles, the window closes, or the
//! merchant cancels. Nothing here signs or submits transactions; the
//! payer's wallet does that, and the till only watches for the result.
//!
//! ## Architecture
//!
//! - [`request`]: payment requests and the per-checkout reference
//! - [`instruction`]: the `paytill:` link and its QR renderings
//! - [`verify`]: verifiers that decide whether a payment has settled
//! - [`session`]: the polling state machine around a verifier
//! - [`ledger`]: client for the ledger-query REST service
//! - [`api`]: the `paytill-verifyd` gateway router
//!
//! ## Example
//!
//! ```rust,no_run
//! use paytill::{LedgerClient, LedgerVerifier, PaymentRequest, PollSession, SessionConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recipient: paytill::Address =
//!         "4rL4RCWHz3iNCdCaveD8KcHfV9YWGsqSHFPo7X2zBNwa".parse()?;
//!     let amount: rust_decimal::Decimal = "1.5".parse()?;
//!     let request = PaymentRequest::new(recipient, amount, Some("#100001".into()))?;
//!
//!     let verifier = LedgerVerifier::new(LedgerClient::new("http://127.0.0.1:8899"));
//!     let session = PollSession::new(request, Arc::new(verifier), SessionConfig::default());
//!     let outcome = session.run().await;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod address;
pub mod api;
pub mod config;
pub mod error;
pub mod event;
pub mod instruction;
pub mod ledger;
pub mod request;
pub mod session;
pub mod verify;

pub use address::Address;
pub use config::{TillConfig, VerifyVia};
pub use error::{Error, Result};
pub use event::{SessionEvent, SessionEventsChannel};
pub use instruction::PaymentUri;
pub use ledger::{LedgerClient, ReferenceMatch, TransactionRecord};
pub use request::{PaymentExpectation, PaymentRequest, Reference};
pub use session::{CancelHandle, PollSession, SessionConfig, SessionState};
pub use verify::{match_record, GatewayVerifier, LedgerVerifier, VerificationResult, Verifier};
