//! # Sigil Sealing
//!
//! `POST /api/sigils/seal` validates a prophecy submission, renders its
//! artifact and keeps it for retrieval under `GET /sigils/{id}`. Resealing
//! the same id replaces the stored document.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::prophecy::seal_prophecy;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SealResponse {
    pub sigil_id: String,
    pub svg: String,
    /// SHA-256 of `svg`, lowercase hex.
    pub svg_hash: String,
    pub canonical_hash: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/sigils/seal", post(seal_sigil))
}

/// POST /api/sigils/seal: Seal a prophecy into an SVG sigil.
#[utoipa::path(
    post,
    path = "/api/sigils/seal",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Sigil sealed and stored", body = SealResponse),
        (status = 400, description = "Invalid payload, missing fields or hash mismatch", body = crate::error::ErrorBody),
    ),
    tag = "sigils"
)]
pub(crate) async fn seal_sigil(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SealResponse>, AppError> {
    let body = extract_json(body)?;
    let sealed = seal_prophecy(&body)?;
    if state
        .sigils
        .insert(sealed.sigil_id.clone(), sealed.svg.clone())
        .is_some()
    {
        tracing::debug!(sigil_id = %sealed.sigil_id, "replaced stored sigil");
    }
    Ok(Json(SealResponse {
        sigil_id: sealed.sigil_id,
        svg: sealed.svg,
        svg_hash: sealed.svg_hash,
        canonical_hash: sealed.canonical_hash,
    }))
}
