//! Router configuration.

use crate::api::{auth, live, session};
use crate::cookies::CALLBACK_PATH;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use ticket_gate_auth::{StreamSessionProvider, TicketingProvider};
use ticket_gate_web::handlers::{health_check, readiness_check};
use ticket_gate_web::correlation_id_layer;

/// Build the complete Axum router.
///
/// Routes:
/// - `GET /health`, `GET /ready`
/// - `GET /oauth2/login`, `GET /oauth2/callback`, `POST /logout`
/// - `GET /session` (alias `GET /verify`)
/// - `GET /live`
pub fn build_router<T, S>(state: AppState<T, S>, cors: CorsLayer) -> Router
where
    T: TicketingProvider + 'static,
    S: StreamSessionProvider + 'static,
{
    Router::new()
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Phase A
        .route("/oauth2/login", get(auth::login::<T, S>))
        .route(CALLBACK_PATH, get(auth::callback::<T, S>))
        .route("/logout", post(auth::logout::<T, S>))
        // Phase B
        .route("/session", get(session::session::<T, S>))
        .route("/verify", get(session::session::<T, S>))
        .route("/live", get(live::live::<T, S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(cors)
}

/// CORS for a front-end served from other origins.
///
/// Credentials (cookies) are allowed, so origins are always listed
/// explicitly. With no origins configured only same-origin requests work.
#[must_use]
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-correlation-id"),
        ])
        .expose_headers([HeaderName::from_static("x-correlation-id"), header::RETRY_AFTER])
}

