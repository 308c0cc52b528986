//! In-flight OAuth2 authorization requests.
//!
//! An [`AuthorizationRequest`] is created when the user is sent to the SSO
//! and consumed on the callback. It is never stored server-side: the
//! [`CredentialCodec`](crate::CredentialCodec) seals it into a short-lived
//! signed token that rides in a cookie, and the callback compares the
//! returned `state` against it in constant time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;

/// Longest accepted post-login return path.
const MAX_RETURN_TO_LEN: usize = 512;

/// One OAuth2 authorization-code exchange in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Anti-forgery nonce sent as the OAuth `state` parameter.
    pub state: String,

    /// Front-end path to land on after login.
    pub return_to: Option<String>,

    /// When the user was sent to the SSO.
    pub created_at: DateTime<Utc>,
}

impl AuthorizationRequest {
    /// Start a new authorization request with a fresh 256-bit nonce.
    ///
    /// `return_to` is kept only if it is a safe same-origin path.
    #[must_use]
    pub fn new(created_at: DateTime<Utc>, return_to: Option<&str>) -> Self {
        Self {
            state: generate_nonce(),
            return_to: return_to.and_then(sanitize_return_to),
            created_at,
        }
    }

    /// Compare a presented `state` with this request's nonce in constant time.
    #[must_use]
    pub fn matches_state(&self, presented: &str) -> bool {
        constant_time_eq::constant_time_eq(self.state.as_bytes(), presented.as_bytes())
    }
}

/// Generate a cryptographically secure nonce (base64url, 43 characters).
fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let mut random_bytes = [0u8; 32];
    rng.fill_bytes(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Accept only absolute paths on the front-end's own origin.
///
/// # Examples
///
/// ```
/// use ticket_gate_auth::authorization::sanitize_return_to;
///
/// assert_eq!(sanitize_return_to("/watch?track=1").as_deref(), Some("/watch?track=1"));
/// assert_eq!(sanitize_return_to("//evil.example.com"), None);
/// assert_eq!(sanitize_return_to("https://evil.example.com"), None);
/// ```
#[must_use]
pub fn sanitize_return_to(path: &str) -> Option<String> {
    let path = path.trim();
    let safe = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && path.len() <= MAX_RETURN_TO_LEN
        && !path.chars().any(char::is_control);
    safe.then(|| path.to_string())
}
