//! Error types for the playback-authorization bridge.

use std::fmt;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, GateError>;

/// Third-party service an upstream error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamService {
    /// Ticketing platform single sign-on (token and userinfo endpoints).
    Sso,
    /// Ticketing platform orders API.
    Orders,
    /// Streaming-authorization platform.
    StreamPlatform,
}

impl UpstreamService {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sso => "sso",
            Self::Orders => "orders",
            Self::StreamPlatform => "stream_platform",
        }
    }
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy shared by every bridge component.
///
/// Business-rule rejections (not eligible, expired credential) are never
/// represented as server faults: the HTTP layer maps each variant to a small
/// enumerated reason code and never forwards upstream bodies to the browser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    // ═══════════════════════════════════════════════════════════
    // Inbound Request Errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed or forged inbound request (missing/mismatched `state`, no code).
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected (logged, not shown to users)
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Upstream Errors
    // ═══════════════════════════════════════════════════════════

    /// Upstream rejected our credentials, token or request (4xx).
    #[error("{service} rejected the request (status {status})")]
    UpstreamAuth {
        /// Rejecting service
        service: UpstreamService,
        /// HTTP status returned by the service
        status: u16,
    },

    /// Network failure, timeout or 5xx from an upstream.
    #[error("{service} is unavailable: {detail}")]
    UpstreamUnavailable {
        /// Unreachable service
        service: UpstreamService,
        /// Transport-level detail (never shown to users)
        detail: String,
    },

    /// Upstream answered successfully but the payload was unusable.
    #[error("{service} returned an unexpected response: {detail}")]
    UpstreamProtocol {
        /// Misbehaving service
        service: UpstreamService,
        /// What was wrong with the payload
        detail: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Credential & Configuration Errors
    // ═══════════════════════════════════════════════════════════

    /// Session credential failed verification.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Process configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GateError {
    /// Build an [`GateError::InvalidRequest`].
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the caller may retry the same request.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ticket_gate_core::{GateError, UpstreamService};
    /// let err = GateError::UpstreamUnavailable {
    ///     service: UpstreamService::StreamPlatform,
    ///     detail: "timeout".to_string(),
    /// };
    /// assert!(err.is_retryable());
    /// assert!(!GateError::invalid_request("bad state").is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Returns `true` if this error indicates a possible forgery attempt.
    #[must_use]
    pub const fn is_security_issue(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. } | Self::Credential(CredentialError::Signature)
        )
    }

    /// The upstream service involved, if any.
    #[must_use]
    pub const fn service(&self) -> Option<UpstreamService> {
        match self {
            Self::UpstreamAuth { service, .. }
            | Self::UpstreamUnavailable { service, .. }
            | Self::UpstreamProtocol { service, .. } => Some(*service),
            _ => None,
        }
    }
}

/// Session credential verification failures.
///
/// All variants mean "not authorized"; none of them is a server fault.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    /// Current time is past the credential's `exp`.
    #[error("Credential has expired")]
    Expired,

    /// Token is not a structurally valid credential.
    #[error("Credential is malformed")]
    Malformed,

    /// Signature does not verify with the process signing key.
    #[error("Credential signature is invalid")]
    Signature,
}

/// Startup configuration failures. The process must refuse to start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("Missing required configuration: {key}")]
    Missing {
        /// Setting name (environment variable)
        key: String,
    },

    /// A setting is present but unusable.
    #[error("Invalid configuration for {key}: {reason}")]
    Invalid {
        /// Setting name (environment variable)
        key: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Build a [`ConfigError::Missing`].
    #[must_use]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    /// Build a [`ConfigError::Invalid`].
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        let unavailable = GateError::UpstreamUnavailable {
            service: UpstreamService::Sso,
            detail: "connect refused".to_string(),
        };
        let rejected = GateError::UpstreamAuth {
            service: UpstreamService::Sso,
            status: 401,
        };

        assert!(unavailable.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(!GateError::Credential(CredentialError::Expired).is_retryable());
        assert!(!GateError::Config(ConfigError::missing("JWT_SECRET")).is_retryable());
    }

    #[test]
    fn test_security_classification() {
        assert!(GateError::invalid_request("state mismatch").is_security_issue());
        assert!(GateError::Credential(CredentialError::Signature).is_security_issue());
        assert!(!GateError::Credential(CredentialError::Expired).is_security_issue());
    }

    #[test]
    fn test_display_does_not_leak_detail_for_credentials() {
        assert_eq!(
            GateError::Credential(CredentialError::Malformed).to_string(),
            "Credential is malformed"
        );
        assert_eq!(
            GateError::UpstreamAuth {
                service: UpstreamService::Orders,
                status: 403
            }
            .to_string(),
            "orders rejected the request (status 403)"
        );
    }

    #[test]
    fn test_service_accessor() {
        let err = GateError::UpstreamProtocol {
            service: UpstreamService::StreamPlatform,
            detail: "missing session_id".to_string(),
        };
        assert_eq!(err.service(), Some(UpstreamService::StreamPlatform));
        assert_eq!(GateError::invalid_request("x").service(), None);
    }
}
