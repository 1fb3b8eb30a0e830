//! # Sigil Retrieval

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml; charset=utf-8";

pub fn router() -> Router<AppState> {
    Router::new().route("/sigils/{id}", get(get_sigil))
}

/// GET /sigils/{id}: Fetch a sealed sigil document.
#[utoipa::path(
    get,
    path = "/sigils/{id}",
    params(("id" = String, Path, description = "Sigil ID")),
    responses(
        (status = 200, description = "SVG document", content_type = "image/svg+xml", body = String),
        (status = 404, description = "Unknown sigil", body = crate::error::ErrorBody),
    ),
    tag = "sigils"
)]
pub(crate) async fn get_sigil(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let svg = state
        .sigils
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("sigil {id}")))?;
    Ok(([(header::CONTENT_TYPE, SVG_CONTENT_TYPE)], svg))
}
