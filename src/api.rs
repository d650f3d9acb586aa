//! REST API types and router for the verification gateway.
//!
//! This module contains the shared types, handlers, and router builder
//! used by the `paytill-verifyd` binary and integration tests.
//!
//! The gateway exists so tills do not need direct ledger access: a till
//! posts the expectation for its checkout and gets back the same
//! [`VerificationResult`] a local verifier would have produced.

use crate::address::Address;
use crate::request::{PaymentExpectation, Reference};
use crate::verify::{VerificationResult, Verifier};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ─── App State ───────────────────────────────────────────────

/// Shared state for the gateway's handlers.
#[derive(Clone)]
pub struct AppState {
    /// Verifier every request is answered through.
    pub verifier: Arc<dyn Verifier>,
}

// ─── Request / Response DTOs ─────────────────────────────────

#[derive(Deserialize)]
struct VerifyReq {
    recipient: String,
    amount: Decimal,
    reference: String,
    #[serde(default)]
    memo: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

type ApiResult<T> = Result<(StatusCode, Json<T>), (StatusCode, Json<ErrorResponse>)>;

// ─── Handlers ────────────────────────────────────────────────

async fn verify_payment(
    State(state): State<AppState>,
    Json(req): Json<VerifyReq>,
) -> ApiResult<VerificationResult> {
    let recipient = req
        .recipient
        .parse::<Address>()
        .map_err(|e| bad_request(format!("invalid recipient: {e}")))?;
    let reference = req
        .reference
        .parse::<Reference>()
        .map_err(|e| bad_request(format!("invalid reference: {e}")))?;
    if req.amount <= Decimal::ZERO {
        return Err(bad_request("amount must be positive"));
    }

    let expected = PaymentExpectation {
        reference,
        recipient,
        amount: req.amount,
        memo: req.memo,
    };
    let result = state.verifier.verify(&expected).await;
    Ok((StatusCode::OK, Json(result)))
}

async fn health() -> &'static str {
    "ok"
}

// ─── Router ──────────────────────────────────────────────────

/// Build the gateway router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/verify", post(verify_payment))
        .route("/health", get(health))
        .with_state(state)
}
