//! The authorization bridge.
//!
//! Ties the ticketing SSO, the orders API, the credential codec and the
//! streaming platform together across two independent phases:
//!
//! ```text
//! Phase A (login/callback)
//!   AwaitingCode → ExchangingCode → FetchingProfile → CheckingOrders
//!                → IssuingCredential → Redirecting
//!
//! Phase B (verify/session)
//!   AwaitingCredential → Verifying → CheckingEligibility → RegisteringUpstream
//!                      → OpeningSession → ResolvingAddress → Responding
//! ```
//!
//! No state is kept between requests: everything durable lives in the
//! signed credential or on the upstream platforms. Each upstream call gets a
//! per-attempt timeout and at most one retry on transient failure.

use crate::credential::CredentialCodec;
use crate::providers::{StreamSessionProvider, TicketingProvider};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Instant;
use ticket_gate_core::{
    CredentialError, EligibilityPolicy, GateError, Result, StreamBindingConfig, UpstreamService,
};
use ticket_gate_runtime::metrics::record_upstream_call;
use ticket_gate_runtime::{RetryPolicy, retry_with_predicate};

pub mod login;
pub mod playback;

pub use login::{CallbackParams, LoginOutcome, LoginStart, LoginSuccess};
pub use playback::PlaybackOutcome;

/// User-facing outcome code.
///
/// The only failure detail that ever reaches the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// SSO login did not complete.
    LoginFailed,
    /// Malformed or forged inbound request.
    InvalidRequest,
    /// No credential was presented.
    MissingCredential,
    /// The credential is past its expiry.
    CredentialExpired,
    /// The credential is malformed, forged or bound to another stream.
    CredentialInvalid,
    /// No qualifying ticket purchase.
    PurchaseRequired,
    /// An upstream is down or slow; the caller may retry.
    UpstreamUnavailable,
    /// An upstream refused the request; retrying will not help.
    UpstreamRejected,
}

impl Reason {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginFailed => "login_failed",
            Self::InvalidRequest => "invalid_request",
            Self::MissingCredential => "missing_credential",
            Self::CredentialExpired => "credential_expired",
            Self::CredentialInvalid => "credential_invalid",
            Self::PurchaseRequired => "purchase_required",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::UpstreamRejected => "upstream_rejected",
        }
    }

    /// Map a bridge error onto the closed reason set.
    #[must_use]
    pub const fn from_error(error: &GateError) -> Self {
        match error {
            GateError::InvalidRequest { .. } => Self::InvalidRequest,
            GateError::UpstreamAuth { .. } | GateError::UpstreamProtocol { .. } => {
                Self::UpstreamRejected
            }
            GateError::UpstreamUnavailable { .. } | GateError::Config(_) => {
                Self::UpstreamUnavailable
            }
            GateError::Credential(CredentialError::Expired) => Self::CredentialExpired,
            GateError::Credential(_) => Self::CredentialInvalid,
        }
    }

    /// Whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::UpstreamUnavailable)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The playback-authorization orchestrator.
///
/// Generic over its two upstream providers so tests can drive it with
/// mocks. Immutable after construction; share it behind an `Arc`.
pub struct AuthorizationBridge<T, S> {
    ticketing: T,
    streams: S,
    codec: CredentialCodec,
    policy: EligibilityPolicy,
    binding: StreamBindingConfig,
    redirect_uri: String,
    retry: RetryPolicy,
}

impl<T, S> AuthorizationBridge<T, S>
where
    T: TicketingProvider,
    S: StreamSessionProvider,
{
    /// Create a bridge with the default upstream retry policy.
    #[must_use]
    pub fn new(
        ticketing: T,
        streams: S,
        codec: CredentialCodec,
        policy: EligibilityPolicy,
        binding: StreamBindingConfig,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            ticketing,
            streams,
            codec,
            policy,
            binding,
            redirect_uri: redirect_uri.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the upstream retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stream binding this bridge authorizes.
    #[must_use]
    pub const fn binding(&self) -> &StreamBindingConfig {
        &self.binding
    }

    /// Credential codec.
    #[must_use]
    pub const fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    /// Ticketing provider.
    #[must_use]
    pub const fn ticketing(&self) -> &T {
        &self.ticketing
    }

    /// Streaming platform provider.
    #[must_use]
    pub const fn streams(&self) -> &S {
        &self.streams
    }

    /// Run one upstream operation under the retry policy and record it.
    async fn call_upstream<R, F, Fut>(
        &self,
        service: UpstreamService,
        operation: &'static str,
        call: F,
    ) -> Result<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let started = Instant::now();
        let result = retry_with_predicate(&self.retry, call, GateError::is_retryable, |deadline| {
            GateError::UpstreamUnavailable {
                service,
                detail: format!("timed out after {}ms", deadline.as_millis()),
            }
        })
        .await;

        let label = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_retryable() => "unavailable",
            Err(_) => "rejected",
        };
        record_upstream_call(service.as_str(), operation, label, started.elapsed());

        if let Err(error) = &result {
            tracing::warn!(%service, operation, %error, "Upstream call failed");
        }
        result
    }
}

impl<T, S> fmt::Debug for AuthorizationBridge<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationBridge")
            .field("binding", &self.binding)
            .field("policy", &self.policy)
            .field("redirect_uri", &self.redirect_uri)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        assert_eq!(
            Reason::from_error(&GateError::Credential(CredentialError::Expired)),
            Reason::CredentialExpired
        );
        assert_eq!(
            Reason::from_error(&GateError::Credential(CredentialError::Signature)),
            Reason::CredentialInvalid
        );
        assert_eq!(
            Reason::from_error(&GateError::UpstreamAuth {
                service: UpstreamService::StreamPlatform,
                status: 403,
            }),
            Reason::UpstreamRejected
        );
        assert_eq!(
            Reason::from_error(&GateError::UpstreamUnavailable {
                service: UpstreamService::StreamPlatform,
                detail: "timeout".to_string(),
            }),
            Reason::UpstreamUnavailable
        );
    }

    #[test]
    fn test_reason_wire_format() {
        assert_eq!(
            serde_json::to_string(&Reason::PurchaseRequired).ok().as_deref(),
            Some("\"purchase_required\"")
        );
        assert_eq!(Reason::UpstreamUnavailable.to_string(), "upstream_unavailable");
        assert!(Reason::UpstreamUnavailable.is_retryable());
        assert!(!Reason::PurchaseRequired.is_retryable());
    }
}
