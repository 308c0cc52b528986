//! Session credential codec.
//!
//! Credentials are HS256 JWTs signed with the process-wide secret. Two token
//! kinds share the key and are told apart by a `typ` claim:
//!
//! - `session`: proof of identity and purchase eligibility for one stream
//! - `oauth_state`: the short-lived [`AuthorizationRequest`] carried in a
//!   cookie between login and callback
//!
//! A token of one kind is never accepted as the other.
//!
//! # Verification order
//!
//! 1. Structure: three segments, decodable JSON payload with `typ` and `exp`
//!    (otherwise [`CredentialError::Malformed`])
//! 2. Expiry against the injected [`Clock`] (otherwise
//!    [`CredentialError::Expired`], whatever the signature)
//! 3. Signature and issuer (otherwise [`CredentialError::Signature`] or
//!    [`CredentialError::Malformed`])
//!
//! Verification is pure: no I/O, no shared mutable state.

use crate::authorization::AuthorizationRequest;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use ticket_gate_core::{
    Clock, ConfigError, CredentialConfig, CredentialError, GateError, Result, StreamId, Subject,
};
use uuid::Uuid;

/// Claims of a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issuer.
    pub iss: String,

    /// Subject registered with the streaming platform (normalized email).
    pub sub: Subject,

    /// Stream this credential is bound to.
    pub stream_id: StreamId,

    /// Issued-at (Unix seconds).
    pub iat: i64,

    /// Expiry (Unix seconds).
    pub exp: i64,

    /// Unique token id, fresh per issuance.
    pub jti: String,

    /// Purchase eligibility decided at issuance.
    pub eligible: bool,
}

impl SessionClaims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Claims of an OAuth state token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StateClaims {
    iss: String,
    nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    return_to: Option<String>,
    iat: i64,
    exp: i64,
}

/// Every token kind signed by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
enum TokenClaims {
    Session(SessionClaims),
    OauthState(StateClaims),
}

/// Fields read before the signature is checked.
#[derive(Deserialize)]
struct Envelope {
    typ: String,
    exp: i64,
}

/// A freshly signed session credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// Compact JWT handed to the front-end.
    pub token: String,

    /// Claims encoded in `token`.
    pub claims: SessionClaims,
}

impl IssuedCredential {
    /// Remaining lifetime in whole seconds at issuance.
    #[must_use]
    pub const fn lifetime_seconds(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

/// Signs and verifies session credentials and OAuth state tokens.
///
/// Built once at startup; read-only afterwards and shared behind an `Arc`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ticket_gate_auth::CredentialCodec;
/// use ticket_gate_core::{CredentialConfig, StreamId, Subject, SystemClock};
///
/// let config = CredentialConfig::new("0123456789abcdef0123456789abcdef").unwrap();
/// let codec = CredentialCodec::new(config, Arc::new(SystemClock)).unwrap();
///
/// let issued = codec
///     .issue(&Subject::from_email("fan@example.com"), &StreamId::new("live-1"), true, None)
///     .unwrap();
/// let claims = codec.verify(&issued.token).unwrap();
/// assert!(claims.eligible);
/// ```
pub struct CredentialCodec {
    config: CredentialConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl CredentialCodec {
    /// Build a codec from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configured lifetimes are unusable.
    pub fn new(config: CredentialConfig, clock: Arc<dyn Clock>) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock before decoding.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        validation.set_issuer(&[config.issuer.as_str()]);

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret()),
            decoding: DecodingKey::from_secret(config.secret()),
            validation,
            config,
            clock,
        })
    }

    /// Credential settings.
    #[must_use]
    pub const fn config(&self) -> &CredentialConfig {
        &self.config
    }

    /// Current time according to the codec's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a session credential.
    ///
    /// `ttl` defaults to the configured lifetime and is clamped to the
    /// configured maximum. Every call produces a new `jti`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Config`] if signing fails.
    pub fn issue(
        &self,
        subject: &Subject,
        stream_id: &StreamId,
        eligible: bool,
        ttl: Option<Duration>,
    ) -> Result<IssuedCredential> {
        let ttl = self.config.clamp_ttl(ttl.unwrap_or(self.config.ttl));
        let now = self.clock.now();

        let claims = SessionClaims {
            iss: self.config.issuer.clone(),
            sub: subject.clone(),
            stream_id: stream_id.clone(),
            iat: now.timestamp(),
            exp: expiry(now, ttl, "JWT_TTL")?,
            jti: Uuid::new_v4().to_string(),
            eligible,
        };

        let token = self.sign(&TokenClaims::Session(claims.clone()))?;

        tracing::debug!(
            jti = %claims.jti,
            stream_id = %claims.stream_id,
            eligible,
            exp = claims.exp,
            "Issued session credential"
        );

        Ok(IssuedCredential { token, claims })
    }

    /// Verify a session credential.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Malformed`]: not a session credential
    /// - [`CredentialError::Expired`]: the clock is past `exp`
    /// - [`CredentialError::Signature`]: not signed with this process's key
    pub fn verify(&self, token: &str) -> std::result::Result<SessionClaims, CredentialError> {
        match self.open(token, "session")? {
            TokenClaims::Session(claims) => Ok(claims),
            TokenClaims::OauthState(_) => Err(CredentialError::Malformed),
        }
    }

    /// Seal an authorization request into a state token.
    ///
    /// The token expires `state_ttl` after the request was created.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Config`] if signing fails.
    pub fn seal_state(&self, request: &AuthorizationRequest) -> Result<String> {
        let exp = expiry(request.created_at, self.config.state_ttl, "OAUTH_STATE_TTL")?;
        let claims = StateClaims {
            iss: self.config.issuer.clone(),
            nonce: request.state.clone(),
            return_to: request.return_to.clone(),
            iat: request.created_at.timestamp(),
            exp,
        };
        self.sign(&TokenClaims::OauthState(claims))
    }

    /// Open a state token back into the authorization request it carries.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`CredentialCodec::verify`].
    pub fn open_state(&self, token: &str) -> std::result::Result<AuthorizationRequest, CredentialError> {
        match self.open(token, "oauth_state")? {
            TokenClaims::OauthState(claims) => {
                let created_at = Utc
                    .timestamp_opt(claims.iat, 0)
                    .single()
                    .ok_or(CredentialError::Malformed)?;
                Ok(AuthorizationRequest {
                    state: claims.nonce,
                    return_to: claims.return_to,
                    created_at,
                })
            }
            TokenClaims::Session(_) => Err(CredentialError::Malformed),
        }
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| GateError::Config(ConfigError::invalid("JWT_SECRET", e.to_string())))
    }

    fn open(&self, token: &str, expected_typ: &str) -> std::result::Result<TokenClaims, CredentialError> {
        let envelope = peek_envelope(token)?;
        if envelope.typ != expected_typ {
            return Err(CredentialError::Malformed);
        }

        if self.clock.now().timestamp() > envelope.exp {
            return Err(CredentialError::Expired);
        }

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    CredentialError::Signature
                }
                ErrorKind::ExpiredSignature => CredentialError::Expired,
                _ => CredentialError::Malformed,
            })
    }
}

/// `start + ttl` as a unix timestamp.
fn expiry(start: DateTime<Utc>, ttl: Duration, key: &str) -> Result<i64> {
    start
        .checked_add_signed(ttl)
        .map(|exp| exp.timestamp())
        .ok_or_else(|| GateError::Config(ConfigError::invalid(key, "lifetime out of range")))
}

/// Decode the payload segment without checking the signature.
fn peek_envelope(token: &str) -> std::result::Result<Envelope, CredentialError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(CredentialError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| CredentialError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| CredentialError::Malformed)
}

impl fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
