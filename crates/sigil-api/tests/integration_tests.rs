//! # Integration Tests for sigil-api
//!
//! Exercises proof generation and verification, remote verifier fallback,
//! prophecy sealing and retrieval, health probes and the OpenAPI document
//! through the assembled router.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use sigil_api::prophecy::canonical_hash;
use sigil_api::state::{AppConfig, AppState, RemoteVerifier, VerifyFuture};
use sigil_zkp::{PoseidonVersion, SigilProver};

/// Building the seeded setup is slow; share one prover across tests.
fn prover() -> Arc<SigilProver> {
    static PROVER: OnceLock<Arc<SigilProver>> = OnceLock::new();
    PROVER
        .get_or_init(|| Arc::new(SigilProver::deterministic(PoseidonVersion::V2).unwrap()))
        .clone()
}

fn hash_of(secret: &str) -> String {
    prover().poseidon_hash(secret).unwrap()
}

/// Helper: build the test app with default config and no remote verifier.
fn test_app() -> axum::Router {
    sigil_api::app(AppState::new(prover()))
}

fn test_app_with_remote(remote: Arc<dyn RemoteVerifier>) -> axum::Router {
    let config = AppConfig {
        verifier_timeout_ms: 50,
        ..AppConfig::default()
    };
    let state = AppState::with_config(config, prover()).with_remote_verifier(remote);
    sigil_api::app(state)
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// A valid prophecy submission whose canonical hash is correct.
fn prophecy_submission(prophecy_id: Option<&str>) -> Value {
    let mut payload = json!({
        "v": "SM-PROPHECY-1",
        "kind": "prophecy",
        "text": "Rain before the eighth beat",
        "category": "weather",
        "userPhiKey": "1NHVPz3j4wArBdsTSdRqyQA95rwKj3oCY4",
        "kaiSignature": "sig-test-1",
        "pulse": 8_000_000,
        "beat": 7,
        "stepIndex": 12,
        "zk": {
            "scheme": "groth16-poseidon",
            "proof": "cHJvb2Y=",
            "publicInputs": ["42"],
            "poseidonHash": "42"
        }
    });
    if let Some(id) = prophecy_id {
        payload["prophecyId"] = json!(id);
    }
    let hash = canonical_hash(payload.as_object().unwrap()).unwrap();
    payload["canonicalHash"] = json!(hash);
    json!({"kind": "prophecy", "payload": payload})
}

struct StaticVerifier(bool);

impl RemoteVerifier for StaticVerifier {
    fn verify(&self, _signals: Vec<String>, _proof: String) -> VerifyFuture {
        let verdict = self.0;
        Box::pin(async move { Ok(verdict) })
    }
}

struct HangingVerifier;

impl RemoteVerifier for HangingVerifier {
    fn verify(&self, _signals: Vec<String>, _proof: String) -> VerifyFuture {
        Box::pin(std::future::pending())
    }
}

struct FailingVerifier;

impl RemoteVerifier for FailingVerifier {
    fn verify(&self, _signals: Vec<String>, _proof: String) -> VerifyFuture {
        Box::pin(async { Err("connection refused".to_string()) })
    }
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app().oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app().oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_metrics_without_recorder_is_404() {
    let response = test_app().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Proof Generation ---------------------------------------------------------

#[tokio::test]
async fn test_generate_proof() {
    let expected = hash_of("123");
    let response = test_app()
        .oneshot(post_json(
            "/api/proof/sigil",
            &json!({"secret": "123", "expectedHash": expected}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["zkPoseidonHash"], json!(expected));
    assert_eq!(body["zkPublicInputs"], json!([expected]));
    assert_eq!(body["proofHints"]["scheme"], "groth16-poseidon");
    assert_eq!(body["proofHints"]["api"], "/api/proof/sigil");
    assert_eq!(
        body["proofHints"]["explorer"],
        json!(format!("/keystream/hash/{expected}"))
    );

    let proof = body["zkProof"].as_str().unwrap();
    assert!(prover().verify(&[expected], proof).unwrap());
}

#[tokio::test]
async fn test_generate_proof_accepts_numeric_secret() {
    let expected = hash_of("456");
    let response = test_app()
        .oneshot(post_json(
            "/api/proof/sigil",
            &json!({"secret": 456, "expectedHash": expected}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["zkPublicInputs"], json!([expected]));
}

#[tokio::test]
async fn test_generate_proof_rejects_unbound_hash() {
    let response = test_app()
        .oneshot(post_json(
            "/api/proof/sigil",
            &json!({"secret": "1", "expectedHash": "1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "PUBLIC_INPUT_MISMATCH");
}

#[tokio::test]
async fn test_generate_proof_requires_both_inputs() {
    let response = test_app()
        .oneshot(post_json("/api/proof/sigil", &json!({"secret": "1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "MISSING_INPUT");
    assert!(body["error"].as_str().unwrap().contains("expectedHash"));

    let response = test_app()
        .oneshot(post_json(
            "/api/proof/sigil",
            &json!({"secret": "  ", "expectedHash": "1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_proof_rejects_bad_json() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/proof/sigil")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
}

// -- Proof Verification -------------------------------------------------------

async fn fresh_proof(secret: &str) -> (String, String) {
    let expected = hash_of(secret);
    let proof = prover().prove(secret, &expected).unwrap();
    (expected, proof.proof)
}

#[tokio::test]
async fn test_verify_valid_proof() {
    let (hash, proof) = fresh_proof("123").await;
    let response = test_app()
        .oneshot(post_json(
            "/api/proof/verify",
            &json!({"zkProof": proof, "zkPublicInputs": [hash]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["verified"], true);
    assert_eq!(body["scheme"], "groth16-poseidon");
    assert_eq!(
        body["verifyingKey"],
        json!(prover().keys().fingerprint().unwrap())
    );
    assert!(body.get("fallbackReason").is_none());
}

#[tokio::test]
async fn test_verify_wrong_signal_is_false() {
    let (_, proof) = fresh_proof("123").await;
    let other = hash_of("456");
    let response = test_app()
        .oneshot(post_json(
            "/api/proof/verify",
            &json!({"zkProof": proof, "zkPublicInputs": [other]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["verified"], false);
}

#[tokio::test]
async fn test_verify_malformed_proof_is_400() {
    let response = test_app()
        .oneshot(post_json(
            "/api/proof/verify",
            &json!({"zkProof": "not base64!", "zkPublicInputs": [hash_of("1")]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "MALFORMED_PROOF");
}

#[tokio::test]
async fn test_verify_empty_inputs_is_422() {
    let response = test_app()
        .oneshot(post_json(
            "/api/proof/verify",
            &json!({"zkProof": "AAAA", "zkPublicInputs": []}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_remote_verdict_is_final() {
    let (hash, proof) = fresh_proof("123").await;
    let response = test_app_with_remote(Arc::new(StaticVerifier(false)))
        .oneshot(post_json(
            "/api/proof/verify",
            &json!({"zkProof": proof, "zkPublicInputs": [hash]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["verified"], false);
    assert!(body.get("fallbackReason").is_none());
}

#[tokio::test]
async fn test_remote_timeout_falls_back_to_local() {
    let (hash, proof) = fresh_proof("456").await;
    let response = test_app_with_remote(Arc::new(HangingVerifier))
        .oneshot(post_json(
            "/api/proof/verify",
            &json!({"zkProof": proof, "zkPublicInputs": [hash]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["verified"], true);
    assert!(body["fallbackReason"]
        .as_str()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_local() {
    let (hash, proof) = fresh_proof("1").await;
    let response = test_app_with_remote(Arc::new(FailingVerifier))
        .oneshot(post_json(
            "/api/proof/verify",
            &json!({"zkProof": proof, "zkPublicInputs": [hash]}),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["verified"], true);
    assert!(body["fallbackReason"]
        .as_str()
        .unwrap()
        .contains("connection refused"));
}

// -- Sealing & Retrieval ------------------------------------------------------

#[tokio::test]
async fn test_seal_then_fetch() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/sigils/seal",
            &prophecy_submission(Some("prophecy-test-1")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sealed = body_json(response).await;
    assert_eq!(sealed["sigilId"], "prophecy-test-1");
    let svg = sealed["svg"].as_str().unwrap().to_string();
    assert!(svg.contains("sm-prophecy"));
    assert!(svg.contains("sm-zk"));
    assert_eq!(
        sealed["svgHash"],
        json!(sigil_core::sha256_hex(svg.as_bytes()))
    );

    let response = app.oneshot(get("/sigils/prophecy-test-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/svg+xml; charset=utf-8"
    );
    assert_eq!(body_string(response).await, svg);
}

#[tokio::test]
async fn test_seal_derives_id_from_hash() {
    let submission = prophecy_submission(None);
    let canonical = submission["payload"]["canonicalHash"]
        .as_str()
        .unwrap()
        .to_string();
    let response = test_app()
        .oneshot(post_json("/api/sigils/seal", &submission))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sealed = body_json(response).await;
    assert_eq!(
        sealed["sigilId"],
        json!(format!("prophecy_{}", &canonical[..40]))
    );
    assert_eq!(sealed["canonicalHash"], json!(canonical));
}

#[tokio::test]
async fn test_seal_rejects_tampered_text() {
    let mut submission = prophecy_submission(None);
    submission["payload"]["text"] = json!("Sun before the eighth beat");
    let response = test_app()
        .oneshot(post_json("/api/sigils/seal", &submission))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "CANONICAL_HASH_MISMATCH");
}

#[tokio::test]
async fn test_seal_requires_zk_bundle() {
    let mut submission = prophecy_submission(None);
    submission["payload"]
        .as_object_mut()
        .unwrap()
        .remove("zk");
    let response = test_app()
        .oneshot(post_json("/api/sigils/seal", &submission))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "MISSING_ZK_BUNDLE");
}

#[tokio::test]
async fn test_seal_rejects_wrong_kind() {
    let mut submission = prophecy_submission(None);
    submission["kind"] = json!("glyph");
    let response = test_app()
        .oneshot(post_json("/api/sigils/seal", &submission))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_sigil_is_404() {
    let response = test_app().oneshot(get("/sigils/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document() {
    let response = test_app().oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"].get("/api/proof/sigil").is_some());
    assert!(doc["paths"].get("/sigils/{id}").is_some());
}
