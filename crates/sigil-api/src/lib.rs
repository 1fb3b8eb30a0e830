//! # sigil-api: HTTP Shell for the Sigil Engine
//!
//! ## API Surface
//!
//! | Route                  | Module                | Purpose                     |
//! |------------------------|-----------------------|-----------------------------|
//! | `POST /api/proof/sigil`  | [`routes::proof`]   | Generate a membership proof |
//! | `POST /api/proof/verify` | [`routes::proof`]   | Verify a membership proof   |
//! | `POST /api/sigils/seal`  | [`routes::seal`]    | Seal a prophecy             |
//! | `GET /sigils/{id}`       | [`routes::sigils`]  | Fetch a sealed SVG          |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → BodyLimit → Handler
//! ```
//!
//! Health probes and `/metrics` sit outside the body limit.

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod prophecy;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::proof::router())
        .merge(routes::seal::router())
        .merge(routes::sigils::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics));

    Router::new()
        .merge(ops)
        .merge(api)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}

/// GET /metrics: Prometheus text exposition, or 404 when no recorder is
/// installed.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
