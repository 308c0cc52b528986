//! Upstream provider traits.
//!
//! These traits abstract the two third-party platforms the bridge talks to,
//! so the bridge can be driven by HTTP clients in production and by mocks in
//! tests.
//!
//! Implementations perform a single attempt per call and classify failures
//! into the shared [`GateError`] taxonomy; timeouts and the single retry are
//! applied by the bridge.

use std::fmt;
use std::future::Future;
use ticket_gate_core::{
    GateError, OrderRecord, Result, SessionId, StreamId, Subject, UpstreamService, UserProfile,
};

pub mod stream;
pub mod ticketing;

pub use stream::{HttpStreamSessionProvider, StreamPlatformConfig};
pub use ticketing::{HttpTicketingProvider, TicketingApiConfig};

/// OAuth2 access token returned by the SSO code exchange.
///
/// Scoped to one login; never persisted or logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw access token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Ticketing platform: SSO and orders API.
pub trait TicketingProvider: Send + Sync {
    /// Build the SSO authorize URL the browser is redirected to.
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String;

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// - [`GateError::UpstreamAuth`]: the SSO rejected the code (non-2xx)
    /// - [`GateError::UpstreamUnavailable`]: network failure or 5xx
    /// - [`GateError::UpstreamProtocol`]: response carried no access token
    fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> impl Future<Output = Result<AccessToken>> + Send;

    /// Fetch the user's profile with bearer auth.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`TicketingProvider::exchange_code`]; a rejected
    /// token is [`GateError::UpstreamAuth`].
    fn fetch_profile(
        &self,
        access_token: &AccessToken,
    ) -> impl Future<Output = Result<UserProfile>> + Send;

    /// List the orders placed with an email, using the static API token.
    ///
    /// No orders is an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`TicketingProvider::exchange_code`].
    fn fetch_orders(&self, email: &str) -> impl Future<Output = Result<Vec<OrderRecord>>> + Send;
}

/// Streaming-authorization platform.
pub trait StreamSessionProvider: Send + Sync {
    /// Register a user for a stream.
    ///
    /// Idempotent: an already registered user is success.
    ///
    /// # Errors
    ///
    /// - [`GateError::UpstreamAuth`]: the platform rejected the registration
    /// - [`GateError::UpstreamUnavailable`]: network failure or 5xx
    fn register_user(
        &self,
        stream_id: &StreamId,
        user: &Subject,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Open a new playback session for a registered user.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`StreamSessionProvider::register_user`];
    /// [`GateError::UpstreamProtocol`] when no session id is returned.
    fn open_session(
        &self,
        stream_id: &StreamId,
        user: &Subject,
    ) -> impl Future<Output = Result<SessionId>> + Send;
}

/// Classify a non-success HTTP status.
///
/// 5xx is transient; anything else is a deterministic rejection.
pub(crate) fn status_error(service: UpstreamService, status: reqwest::StatusCode) -> GateError {
    if status.is_server_error() {
        GateError::UpstreamUnavailable {
            service,
            detail: format!("status {}", status.as_u16()),
        }
    } else {
        GateError::UpstreamAuth {
            service,
            status: status.as_u16(),
        }
    }
}

/// Classify a transport failure.
///
/// Connect errors and timeouts are transient; a body that cannot be
/// decoded is a protocol error.
pub(crate) fn transport_error(service: UpstreamService, err: &reqwest::Error) -> GateError {
    if err.is_decode() {
        GateError::UpstreamProtocol {
            service,
            detail: err.to_string(),
        }
    } else {
        GateError::UpstreamUnavailable {
            service,
            detail: err.to_string(),
        }
    }
}

/// Build a reqwest client with a whole-request deadline.
pub(crate) fn build_client(
    timeout: std::time::Duration,
) -> std::result::Result<reqwest::Client, ticket_gate_core::ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ticket_gate_core::ConfigError::invalid("UPSTREAM_TIMEOUT_MS", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error(UpstreamService::Sso, reqwest::StatusCode::UNAUTHORIZED),
            GateError::UpstreamAuth { status: 401, .. }
        ));
        assert!(matches!(
            status_error(UpstreamService::Orders, reqwest::StatusCode::NOT_FOUND),
            GateError::UpstreamAuth { status: 404, .. }
        ));
        assert!(
            status_error(UpstreamService::StreamPlatform, reqwest::StatusCode::BAD_GATEWAY)
                .is_retryable()
        );
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("secret-token");
        assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
        assert_eq!(token.secret(), "secret-token");
    }
}
