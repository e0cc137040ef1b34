//! Health check endpoint for liveness probes.

use axum::http::StatusCode;

/// Health check handler.
///
/// Returns 200 OK with the text "OK" whenever the server is up and
/// accepting connections. Intended for load balancers and orchestration
/// liveness probes.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
