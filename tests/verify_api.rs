//! Integration tests for the verification gateway's REST API.
//!
//! These tests run against the axum router directly, with a stub
//! verifier behind it, so no ledger-query service is needed.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use paytill::api::{build_router, AppState};
use paytill::request::{PaymentExpectation, Reference};
use paytill::verify::{VerificationResult, Verifier};
use paytill::Address;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

// ─── Test helpers ───────────────────────────────────────────

/// Verifier that always answers with a fixed result.
struct FixedVerifier(VerificationResult);

#[async_trait]
impl Verifier for FixedVerifier {
    async fn verify(&self, _expected: &PaymentExpectation) -> VerificationResult {
        self.0.clone()
    }
}

/// Build a test router around a fixed verification answer.
fn test_app(result: VerificationResult) -> axum::Router {
    build_router(AppState {
        verifier: Arc::new(FixedVerifier(result)),
    })
}

fn valid_body() -> String {
    json!({
        "recipient": Address::new([7u8; 32]).to_string(),
        "amount": "1.5",
        "reference": Reference::from_bytes([1u8; 32]).to_string(),
        "memo": "#100001",
    })
    .to_string()
}

/// Send a POST request with JSON body, return (status, parsed JSON).
async fn post_json(app: axum::Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ─── Tests ───────────────────────────────────────────────────

#[tokio::test]
async fn verify_passes_the_result_through() {
    let app = test_app(VerificationResult::Confirmed {
        signature: "sig123".into(),
    });

    let (status, json) = post_json(app, "/verify", &valid_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed");
    assert_eq!(json["signature"], "sig123");
}

#[tokio::test]
async fn verify_reports_pending_checkouts() {
    let app = test_app(VerificationResult::Pending);

    let (status, json) = post_json(app, "/verify", &valid_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn verify_reports_transient_errors_with_detail() {
    let app = test_app(VerificationResult::TransientError {
        detail: "ledger unreachable".into(),
    });

    let (status, json) = post_json(app, "/verify", &valid_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "transient_error");
    assert_eq!(json["detail"], "ledger unreachable");
}

#[tokio::test]
async fn verify_accepts_a_body_without_a_memo() {
    let app = test_app(VerificationResult::Pending);
    let body = json!({
        "recipient": Address::new([7u8; 32]).to_string(),
        "amount": "2",
        "reference": Reference::from_bytes([2u8; 32]).to_string(),
    })
    .to_string();

    let (status, _) = post_json(app, "/verify", &body).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn verify_rejects_a_malformed_recipient() {
    let app = test_app(VerificationResult::Pending);
    let body = json!({
        "recipient": "not-base58-0OIl",
        "amount": "1.5",
        "reference": Reference::from_bytes([1u8; 32]).to_string(),
    })
    .to_string();

    let (status, json) = post_json(app, "/verify", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("recipient"));
}

#[tokio::test]
async fn verify_rejects_a_short_reference() {
    let app = test_app(VerificationResult::Pending);
    let body = json!({
        "recipient": Address::new([7u8; 32]).to_string(),
        "amount": "1.5",
        "reference": "abc",
    })
    .to_string();

    let (status, json) = post_json(app, "/verify", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("reference"));
}

#[tokio::test]
async fn verify_rejects_a_non_positive_amount() {
    let app = test_app(VerificationResult::Pending);
    let body = json!({
        "recipient": Address::new([7u8; 32]).to_string(),
        "amount": "0",
        "reference": Reference::from_bytes([1u8; 32]).to_string(),
    })
    .to_string();

    let (status, json) = post_json(app, "/verify", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("amount"));
}

#[tokio::test]
async fn health_answers_ok() {
    let app = test_app(VerificationResult::Pending);
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}
