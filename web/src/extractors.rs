//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id
//! - `CredentialToken`: the session credential, wherever the browser put it
//!
//! # Examples
//!
//! ```ignore
//! use ticket_gate_web::extractors::{CorrelationId, CredentialToken};
//!
//! async fn handler(correlation_id: CorrelationId, token: CredentialToken) -> String {
//!     tracing::info!(correlation_id = %correlation_id.0, "Processing request");
//!     format!("credential present: {}", token.0.is_some())
//! }
//! ```

use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

/// Cookie holding the session credential.
pub const CREDENTIAL_COOKIE: &str = "tg_credential";

/// Correlation ID for request tracing.
///
/// Uses the id stored by the correlation middleware, then the
/// `X-Correlation-ID` header, then a fresh UUID v4.
///
/// # Example
///
/// ```ignore
/// async fn handler(correlation_id: CorrelationId) -> String {
///     format!("Request ID: {}", correlation_id.0)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Session credential presented by the caller, if any.
///
/// # Priority
///
/// 1. `tg_credential` cookie
/// 2. `Authorization: Bearer <token>`
/// 3. `token` query parameter
///
/// Empty values count as absent. Never rejects: a missing credential is a
/// business outcome, not a malformed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialToken(pub Option<String>);

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for CredentialToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = from_cookie(&parts.headers)
            .or_else(|| from_bearer(&parts.headers))
            .or_else(|| parts.uri.query().and_then(from_query));

        Ok(Self(token))
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn from_cookie(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(CREDENTIAL_COOKIE)
        .and_then(|cookie| non_empty(cookie.value()))
}

fn from_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .and_then(|(_, token)| non_empty(token))
}

fn from_query(query: &str) -> Option<String> {
    serde_urlencoded::from_str::<TokenQuery>(query)
        .ok()
        .and_then(|q| q.token)
        .as_deref()
        .and_then(non_empty)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract_token(req: Request<()>) -> Option<String> {
        let (mut parts, ()) = req.into_parts();
        CredentialToken::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract")
            .0
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        parts.extensions.insert(stored);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let req = Request::builder().body(()).expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn test_credential_from_cookie() {
        let req = Request::builder()
            .header(header::COOKIE, "theme=dark; tg_credential=abc.def.ghi")
            .body(())
            .unwrap();

        assert_eq!(extract_token(req).await.as_deref(), Some("abc.def.ghi"));
    }

    #[tokio::test]
    async fn test_credential_from_bearer() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc.def.ghi")
            .body(())
            .unwrap();

        assert_eq!(extract_token(req).await.as_deref(), Some("abc.def.ghi"));
    }

    #[tokio::test]
    async fn test_bearer_scheme_is_case_insensitive() {
        for value in ["bearer abc.def.ghi", "BEARER abc.def.ghi"] {
            let req = Request::builder()
                .header(header::AUTHORIZATION, value)
                .body(())
                .unwrap();

            assert_eq!(extract_token(req).await.as_deref(), Some("abc.def.ghi"));
        }
    }

    #[tokio::test]
    async fn test_credential_from_query() {
        let req = Request::builder()
            .uri("/session?token=abc.def.ghi&x=1")
            .body(())
            .unwrap();

        assert_eq!(extract_token(req).await.as_deref(), Some("abc.def.ghi"));
    }

    #[tokio::test]
    async fn test_cookie_wins_over_bearer_and_query() {
        let req = Request::builder()
            .uri("/session?token=from-query")
            .header(header::COOKIE, "tg_credential=from-cookie")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(())
            .unwrap();

        assert_eq!(extract_token(req).await.as_deref(), Some("from-cookie"));
    }

    #[tokio::test]
    async fn test_empty_values_are_absent() {
        let req = Request::builder()
            .uri("/session?token=")
            .header(header::COOKIE, "tg_credential=")
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap();

        assert_eq!(extract_token(req).await, None);
    }
}
