//! # Membership Proof Endpoints
//!
//! `POST /api/proof/sigil` proves knowledge of a secret whose Poseidon hash
//! equals the caller's expected hash. Proving is CPU-bound and runs on the
//! blocking pool under the configured timeout.
//!
//! `POST /api/proof/verify` checks a wire proof against the active key. When
//! a remote verifier is configured it is asked first and bounded by the
//! verifier timeout. Timeouts and failures resolve locally.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigil_zkp::groth16::SCHEME;
use sigil_zkp::{verify_with_fallback, VerificationSource, ZkError};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

pub const PROOF_API_PATH: &str = "/api/proof/sigil";
pub const VERIFY_API_PATH: &str = "/api/proof/verify";

// -- Request / Response DTOs --------------------------------------------------

/// Proof request. Numbers are accepted and stringified, as browsers often
/// send decimal hashes unquoted.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    #[schema(value_type = Option<String>)]
    pub secret: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub expected_hash: Option<Value>,
}

/// Render a scalar as its decimal or textual form. Objects and arrays are
/// treated as absent.
fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProofHints {
    pub scheme: String,
    pub api: String,
    pub explorer: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    pub zk_poseidon_hash: String,
    /// Base64 of the compressed Groth16 proof.
    pub zk_proof: String,
    pub zk_public_inputs: Vec<String>,
    pub proof_hints: ProofHints,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub zk_proof: String,
    pub zk_public_inputs: Vec<String>,
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.zk_proof.trim().is_empty() {
            return Err("zkProof must not be empty".to_string());
        }
        if self.zk_public_inputs.is_empty() {
            return Err("zkPublicInputs must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,
    pub scheme: String,
    /// SHA-256 fingerprint of the verifying key.
    pub verifying_key: String,
    /// Present when a remote verifier was configured but not used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route(PROOF_API_PATH, post(generate_proof))
        .route(VERIFY_API_PATH, post(verify_proof))
}

// -- Handlers -----------------------------------------------------------------

/// POST /api/proof/sigil: Generate a membership proof.
#[utoipa::path(
    post,
    path = "/api/proof/sigil",
    request_body = ProofRequest,
    responses(
        (status = 200, description = "Proof generated", body = ProofResponse),
        (status = 400, description = "Missing input or public input mismatch", body = crate::error::ErrorBody),
        (status = 503, description = "Proof generation timed out", body = crate::error::ErrorBody),
    ),
    tag = "proof"
)]
pub(crate) async fn generate_proof(
    State(state): State<AppState>,
    body: Result<Json<ProofRequest>, JsonRejection>,
) -> Result<Json<ProofResponse>, AppError> {
    let req = extract_json(body)?;
    let secret = scalar_text(req.secret.as_ref());
    let expected = scalar_text(req.expected_hash.as_ref());
    if secret.is_empty() {
        return Err(ZkError::MissingInput("secret").into());
    }
    if expected.is_empty() {
        return Err(ZkError::MissingInput("expectedHash").into());
    }

    let prover = state.prover.clone();
    let budget = state.config.proof_timeout();
    let task = tokio::task::spawn_blocking(move || prover.prove(&secret, &expected));
    let proof = match tokio::time::timeout(budget, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => {
            return Err(AppError::Internal(format!("proof task failed: {join_err}")))
        }
        Err(_) => {
            tracing::warn!(budget_ms = budget.as_millis() as u64, "proof generation timed out");
            return Err(AppError::Timeout(format!(
                "proof generation exceeded {}ms",
                budget.as_millis()
            )));
        }
    };

    let hash = proof
        .public_signals
        .first()
        .cloned()
        .ok_or_else(|| AppError::Internal("prover returned no public signals".to_string()))?;
    Ok(Json(ProofResponse {
        proof_hints: ProofHints {
            scheme: SCHEME.to_string(),
            api: PROOF_API_PATH.to_string(),
            explorer: format!("/keystream/hash/{hash}"),
        },
        zk_poseidon_hash: hash,
        zk_proof: proof.proof,
        zk_public_inputs: proof.public_signals,
    }))
}

/// POST /api/proof/verify: Verify a membership proof.
#[utoipa::path(
    post,
    path = "/api/proof/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Verification verdict", body = VerifyResponse),
        (status = 400, description = "Proof could not be decoded", body = crate::error::ErrorBody),
        (status = 422, description = "Empty proof or inputs", body = crate::error::ErrorBody),
    ),
    tag = "proof"
)]
pub(crate) async fn verify_proof(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let verifying_key = state.prover.keys().fingerprint()?;

    let (verified, fallback_reason) = match state.remote_verifier.clone() {
        Some(remote) => {
            let future = remote.verify(req.zk_public_inputs.clone(), req.zk_proof.clone());
            let prover = state.prover.clone();
            let outcome = verify_with_fallback(future, state.config.verifier_timeout(), || {
                prover.verify(&req.zk_public_inputs, &req.zk_proof)
            })
            .await?;
            let reason = match outcome.source {
                VerificationSource::Remote => None,
                VerificationSource::LocalFallback { reason } => Some(reason),
            };
            (outcome.verified, reason)
        }
        None => (
            state.prover.verify(&req.zk_public_inputs, &req.zk_proof)?,
            None,
        ),
    };

    Ok(Json(VerifyResponse {
        verified,
        scheme: SCHEME.to_string(),
        verifying_key,
        fallback_reason,
    }))
}
