//! # Ticket Gate Auth
//!
//! Credential handling, upstream providers and the authorization bridge.
//!
//! ## Components
//!
//! - [`credential`]: signs and verifies session credentials and OAuth state
//! - [`authorization`]: in-flight OAuth2 requests and the `state` nonce
//! - [`providers`]: ticketing and streaming platform traits with HTTP clients
//! - [`bridge`]: the two-phase state machine driving everything
//! - `mocks`: in-memory providers (feature `test-utils`, on by default)
//!
//! ## Flow
//!
//! ```text
//! browser ──/oauth2/login──▶ begin_login ──▶ SSO authorize
//! SSO ─────/oauth2/callback─▶ complete_login ─▶ code → profile → orders → credential
//! browser ──/session───────▶ authorize_playback ─▶ verify → register → open → URL
//! ```

#![forbid(unsafe_code)]

pub mod authorization;
pub mod bridge;
pub mod credential;
pub mod providers;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use authorization::AuthorizationRequest;
pub use bridge::{
    AuthorizationBridge, CallbackParams, LoginOutcome, LoginStart, LoginSuccess, PlaybackOutcome,
    Reason,
};
pub use credential::{CredentialCodec, IssuedCredential, SessionClaims};
pub use providers::{
    AccessToken, HttpStreamSessionProvider, HttpTicketingProvider, StreamPlatformConfig,
    StreamSessionProvider, TicketingApiConfig, TicketingProvider,
};

#[cfg(test)]
pub(crate) mod testing {
    use crate::bridge::AuthorizationBridge;
    use crate::credential::CredentialCodec;
    use crate::providers::{StreamSessionProvider, TicketingProvider};
    use std::sync::Arc;
    use std::time::Duration;
    use ticket_gate_core::EligibilityPolicy;
    use ticket_gate_runtime::RetryPolicy;
    use ticket_gate_testing::{ManualClock, test_credential_config, test_stream_binding};

    /// Bridge over the given providers with a controllable clock and fast retries.
    #[allow(clippy::unwrap_used)]
    pub fn test_bridge<T, S>(ticketing: T, streams: S) -> (AuthorizationBridge<T, S>, Arc<ManualClock>)
    where
        T: TicketingProvider,
        S: StreamSessionProvider,
    {
        let clock = Arc::new(ManualClock::default());
        let codec = CredentialCodec::new(test_credential_config(), clock.clone()).unwrap();
        let retry = RetryPolicy::upstream(Duration::from_millis(50), Duration::from_millis(5));

        let bridge = AuthorizationBridge::new(
            ticketing,
            streams,
            codec,
            EligibilityPolicy::default(),
            test_stream_binding(),
            "https://gate.example.com/oauth2/callback",
        )
        .with_retry_policy(retry);

        (bridge, clock)
    }
}
