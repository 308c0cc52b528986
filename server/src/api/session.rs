//! Playback authorization endpoint.

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ticket_gate_auth::{PlaybackOutcome, Reason, StreamSessionProvider, TicketingProvider};
use ticket_gate_web::CredentialToken;

/// Body of every `/session` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Whether the player may start
    pub authorized: bool,
    /// Playback address when authorized
    pub playback_url: Option<String>,
    /// Reason code when not authorized
    pub reason: Option<String>,
}

impl From<&PlaybackOutcome> for SessionResponse {
    fn from(outcome: &PlaybackOutcome) -> Self {
        Self {
            authorized: outcome.is_authorized(),
            playback_url: outcome.playback_url().map(str::to_string),
            reason: outcome.reason().map(|reason| reason.as_str().to_string()),
        }
    }
}

/// HTTP status for a playback outcome.
///
/// Credential problems are 401, a missing purchase is 403. Upstream
/// failures stay distinguishable: 502 when retrying will not help, 503 when
/// it may.
#[must_use]
pub const fn status_for(outcome: &PlaybackOutcome) -> StatusCode {
    match outcome {
        PlaybackOutcome::Authorized { .. } => StatusCode::OK,
        PlaybackOutcome::Denied(reason) => match reason {
            Reason::MissingCredential | Reason::CredentialExpired | Reason::CredentialInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Reason::PurchaseRequired => StatusCode::FORBIDDEN,
            Reason::UpstreamRejected => StatusCode::BAD_GATEWAY,
            Reason::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Reason::LoginFailed | Reason::InvalidRequest => StatusCode::BAD_REQUEST,
        },
    }
}

/// Authorize playback for the presented credential.
///
/// # Endpoint
///
/// ```text
/// GET /session
/// ```
///
/// The credential is read from the `tg_credential` cookie, a bearer
/// token, or the `token` query parameter.
///
/// # Response
///
/// ```json
/// {
///   "authorized": true,
///   "playback_url": "https://cdn.example.com/hls/abc/index.m3u8",
///   "reason": null
/// }
/// ```
pub async fn session<T, S>(
    State(state): State<AppState<T, S>>,
    CredentialToken(token): CredentialToken,
) -> Response
where
    T: TicketingProvider + 'static,
    S: StreamSessionProvider + 'static,
{
    let outcome = state.bridge.authorize_playback(token.as_deref()).await;
    let status = status_for(&outcome);

    let mut response = (
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Json(SessionResponse::from(&outcome)),
    )
        .into_response();

    if outcome.reason().is_some_and(Reason::is_retryable) {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_gate_core::{SessionId, Subject};

    #[test]
    fn test_status_mapping() {
        let authorized = PlaybackOutcome::Authorized {
            playback_url: "https://cdn.example.com/x".to_string(),
            session_id: SessionId::new("x"),
            subject: Subject::from_email("fan@example.com"),
        };

        assert_eq!(status_for(&authorized), StatusCode::OK);
        assert_eq!(
            status_for(&PlaybackOutcome::Denied(Reason::CredentialExpired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&PlaybackOutcome::Denied(Reason::PurchaseRequired)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&PlaybackOutcome::Denied(Reason::UpstreamUnavailable)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&PlaybackOutcome::Denied(Reason::UpstreamRejected)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_denied_body_has_no_url() {
        let body = SessionResponse::from(&PlaybackOutcome::Denied(Reason::PurchaseRequired));

        assert!(!body.authorized);
        assert_eq!(body.playback_url, None);
        assert_eq!(body.reason.as_deref(), Some("purchase_required"));
    }
}
