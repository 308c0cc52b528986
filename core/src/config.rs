//! Static bridge configuration.
//!
//! These structures are built once at startup, validated, and then only read.
//! Loading them from the environment is the server binary's job.

use crate::error::ConfigError;
use crate::types::{SessionId, StreamId};
use chrono::Duration;
use std::fmt;

/// Placeholder replaced by the playback session id in the address template.
pub const SESSION_ID_PLACEHOLDER: &str = "{session_id}";

/// Placeholder replaced by the stream id in the address template.
pub const STREAM_ID_PLACEHOLDER: &str = "{stream_id}";

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted credential or state lifetime, in days.
pub const MAX_LIFETIME_DAYS: i64 = 365;

/// Operator-configured binding between this process and one live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBindingConfig {
    /// Stream the bridge authorizes playback for.
    pub stream_id: StreamId,

    /// Human-readable stream title shown by the front-end.
    pub title: Option<String>,

    /// Authenticated playback address template.
    ///
    /// Must contain `{session_id}`; may contain `{stream_id}`.
    /// Example: `https://live.example.com/{stream_id}/{session_id}/index.m3u8`
    authenticated_url: String,
}

impl StreamBindingConfig {
    /// Create a stream binding.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the stream id is empty or the address
    /// template is not an absolute http(s) URL containing `{session_id}`.
    pub fn new(
        stream_id: impl Into<String>,
        authenticated_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let stream_id = stream_id.into();
        if stream_id.trim().is_empty() {
            return Err(ConfigError::missing("STREAM_ID"));
        }

        let authenticated_url = authenticated_url.into();
        if !authenticated_url.contains(SESSION_ID_PLACEHOLDER) {
            return Err(ConfigError::invalid(
                "AUTHENTICATED_URL",
                format!("template must contain {SESSION_ID_PLACEHOLDER}"),
            ));
        }
        if !(authenticated_url.starts_with("https://") || authenticated_url.starts_with("http://")) {
            return Err(ConfigError::invalid(
                "AUTHENTICATED_URL",
                "template must be an absolute http(s) URL",
            ));
        }

        Ok(Self {
            stream_id: StreamId::new(stream_id),
            title: None,
            authenticated_url,
        })
    }

    /// Set the stream title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Raw address template.
    #[must_use]
    pub fn authenticated_url(&self) -> &str {
        &self.authenticated_url
    }

    /// Compose the playback address for a session. Pure string composition.
    ///
    /// # Example
    ///
    /// ```
    /// # use ticket_gate_core::{StreamBindingConfig, SessionId};
    /// let binding = StreamBindingConfig::new(
    ///     "live-1",
    ///     "https://cdn.example.com/{stream_id}/{session_id}/index.m3u8",
    /// ).unwrap();
    /// assert_eq!(
    ///     binding.playback_url(&SessionId::new("s 1")),
    ///     "https://cdn.example.com/live-1/s%201/index.m3u8",
    /// );
    /// ```
    #[must_use]
    pub fn playback_url(&self, session_id: &SessionId) -> String {
        self.authenticated_url
            .replace(STREAM_ID_PLACEHOLDER, &urlencoding::encode(self.stream_id.as_str()))
            .replace(SESSION_ID_PLACEHOLDER, &urlencoding::encode(session_id.as_str()))
    }
}

/// Session credential signing configuration.
#[derive(Clone)]
pub struct CredentialConfig {
    secret: Vec<u8>,

    /// `iss` claim written into and required from every token.
    pub issuer: String,

    /// Default credential lifetime.
    ///
    /// Default: 5 minutes
    pub ttl: Duration,

    /// Upper bound for any credential lifetime; requested TTLs are clamped.
    ///
    /// Default: 24 hours
    pub max_ttl: Duration,

    /// Lifetime of the OAuth `state` token between login and callback.
    ///
    /// Default: 10 minutes
    pub state_ttl: Duration,
}

impl CredentialConfig {
    /// Create credential configuration from a signing secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the secret is empty and
    /// [`ConfigError::Invalid`] if it is shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::missing("JWT_SECRET"));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                "JWT_SECRET",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }

        Ok(Self {
            secret,
            issuer: "ticket-gate".to_string(),
            ttl: Duration::minutes(5),
            max_ttl: Duration::hours(24),
            state_ttl: Duration::minutes(10),
        })
    }

    /// Set the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set the default credential lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the maximum credential lifetime.
    #[must_use]
    pub const fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = max_ttl;
        self
    }

    /// Set the OAuth state lifetime.
    #[must_use]
    pub const fn with_state_ttl(mut self, state_ttl: Duration) -> Self {
        self.state_ttl = state_ttl;
        self
    }

    /// Check the lifetimes are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for non-positive lifetimes, lifetimes
    /// above [`MAX_LIFETIME_DAYS`], or a default TTL above the maximum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ceiling = Duration::days(MAX_LIFETIME_DAYS);
        for (var, lifetime) in [
            ("JWT_TTL", self.ttl),
            ("JWT_MAX_TTL", self.max_ttl),
            ("OAUTH_STATE_TTL", self.state_ttl),
        ] {
            if lifetime > ceiling {
                return Err(ConfigError::invalid(
                    var,
                    format!("must not exceed {MAX_LIFETIME_DAYS} days"),
                ));
            }
        }
        if self.ttl <= Duration::zero() {
            return Err(ConfigError::invalid("JWT_TTL", "must be positive"));
        }
        if self.max_ttl <= Duration::zero() {
            return Err(ConfigError::invalid("JWT_MAX_TTL", "must be positive"));
        }
        if self.ttl > self.max_ttl {
            return Err(ConfigError::invalid("JWT_TTL", "must not exceed JWT_MAX_TTL"));
        }
        if self.state_ttl <= Duration::zero() {
            return Err(ConfigError::invalid("OAUTH_STATE_TTL", "must be positive"));
        }
        Ok(())
    }

    /// Signing secret bytes.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Clamp a requested lifetime to `(0, max_ttl]`.
    #[must_use]
    pub fn clamp_ttl(&self, requested: Duration) -> Duration {
        if requested <= Duration::zero() {
            self.ttl.min(self.max_ttl)
        } else {
            requested.min(self.max_ttl)
        }
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("max_ttl", &self.max_ttl)
            .field("state_ttl", &self.state_ttl)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_stream_binding_requires_session_placeholder() {
        let err = StreamBindingConfig::new("live", "https://cdn.example.com/live.m3u8").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "AUTHENTICATED_URL"));
    }

    #[test]
    fn test_stream_binding_rejects_relative_template() {
        assert!(StreamBindingConfig::new("live", "/hls/{session_id}").is_err());
        assert!(StreamBindingConfig::new("  ", "https://x/{session_id}").is_err());
    }

    #[test]
    fn test_playback_url_substitution() {
        let binding =
            StreamBindingConfig::new("live-1", "https://cdn.example.com/hls/{session_id}/master.m3u8")
                .unwrap()
                .with_title("Main stage");

        assert_eq!(
            binding.playback_url(&SessionId::new("abc123")),
            "https://cdn.example.com/hls/abc123/master.m3u8"
        );
        assert_eq!(binding.title.as_deref(), Some("Main stage"));
    }

    #[test]
    fn test_playback_url_encodes_session_id() {
        let binding = StreamBindingConfig::new("live", "https://cdn.example.com/{session_id}").unwrap();
        assert_eq!(
            binding.playback_url(&SessionId::new("a/b?c")),
            "https://cdn.example.com/a%2Fb%3Fc"
        );
    }

    #[test]
    fn test_credential_config_secret_rules() {
        assert_eq!(
            CredentialConfig::new("").unwrap_err(),
            ConfigError::missing("JWT_SECRET")
        );
        assert!(matches!(
            CredentialConfig::new("short").unwrap_err(),
            ConfigError::Invalid { .. }
        ));
        assert!(CredentialConfig::new(SECRET).is_ok());
    }

    #[test]
    fn test_credential_config_builder_and_validation() {
        let config = CredentialConfig::new(SECRET)
            .unwrap()
            .with_issuer("gate")
            .with_ttl(Duration::minutes(15))
            .with_max_ttl(Duration::hours(1))
            .with_state_ttl(Duration::minutes(3));

        assert_eq!(config.issuer, "gate");
        assert!(config.validate().is_ok());

        let inverted = config.clone().with_ttl(Duration::hours(2));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_credential_config_rejects_unbounded_lifetimes() {
        let huge = Duration::try_seconds(i64::MAX / 1000).unwrap();
        let config = CredentialConfig::new(SECRET)
            .unwrap()
            .with_max_ttl(huge)
            .with_ttl(huge);
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { ref key, .. } if key == "JWT_TTL"
        ));

        let year = Duration::days(MAX_LIFETIME_DAYS);
        let bounded = CredentialConfig::new(SECRET)
            .unwrap()
            .with_max_ttl(year)
            .with_ttl(year);
        assert!(bounded.validate().is_ok());

        let state = bounded.with_state_ttl(year + Duration::seconds(1));
        assert!(matches!(
            state.validate().unwrap_err(),
            ConfigError::Invalid { ref key, .. } if key == "OAUTH_STATE_TTL"
        ));
    }

    #[test]
    fn test_clamp_ttl() {
        let config = CredentialConfig::new(SECRET)
            .unwrap()
            .with_max_ttl(Duration::hours(1));

        assert_eq!(config.clamp_ttl(Duration::hours(5)), Duration::hours(1));
        assert_eq!(config.clamp_ttl(Duration::minutes(10)), Duration::minutes(10));
        assert_eq!(config.clamp_ttl(Duration::zero()), Duration::minutes(5));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = CredentialConfig::new(SECRET).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("<redacted>"));
    }
}
