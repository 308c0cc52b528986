//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Health endpoint body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `ready`.
    pub status: String,

    /// Build version.
    pub version: String,
}

impl HealthResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Liveness check.
///
/// Returns 200 OK while the process is serving requests. Upstream
/// platforms are not contacted.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "version": "0.1.0"
/// }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse::new("ok")))
}

/// Readiness check.
///
/// There is no datastore to warm up: configuration is validated before the
/// listener binds, so a process that answers is ready.
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
#[allow(clippy::unused_async)]
pub async fn readiness_check() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse::new("ready")))
}
