//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sigil API",
        version = "0.1.0",
        description = "Membership proofs over Poseidon hashes, prophecy sealing and sigil retrieval.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::proof::generate_proof,
        crate::routes::proof::verify_proof,
        crate::routes::seal::seal_sigil,
        crate::routes::sigils::get_sigil,
    ),
    components(schemas(
        crate::routes::proof::ProofRequest,
        crate::routes::proof::ProofResponse,
        crate::routes::proof::ProofHints,
        crate::routes::proof::VerifyRequest,
        crate::routes::proof::VerifyResponse,
        crate::routes::seal::SealResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "proof", description = "Groth16 membership proofs"),
        (name = "sigils", description = "Sealed sigil artifacts"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
