//! # Request Metrics
//!
//! Records every request through the `metrics` facade. Without an installed
//! recorder the macros are no-ops, so the middleware is always mounted.
//!
//! | Metric                            | Kind      | Labels                     |
//! |-----------------------------------|-----------|----------------------------|
//! | `sigil_http_requests_total`       | counter   | method, route, status      |
//! | `sigil_http_errors_total`         | counter   | method, route, status      |
//! | `sigil_http_request_duration_seconds` | histogram | method, route          |

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

pub const REQUESTS_TOTAL: &str = "sigil_http_requests_total";
pub const ERRORS_TOTAL: &str = "sigil_http_errors_total";
pub const REQUEST_DURATION: &str = "sigil_http_request_duration_seconds";

/// Label for requests that matched no route. Keeps cardinality bounded.
const UNMATCHED: &str = "unmatched";

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED.to_string());
    let method = request.method().as_str().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let labels = [
        ("method", method.clone()),
        ("route", route.clone()),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!(REQUESTS_TOTAL, &labels).increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(ERRORS_TOTAL, &labels).increment(1);
    }
    metrics::histogram!(REQUEST_DURATION, "method" => method, "route" => route)
        .record(started.elapsed().as_secs_f64());

    response
}
