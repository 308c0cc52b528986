//! Per-request context: correlation id, bridge phase and a request span.
//!
//! Every request gets an `http_request` span carrying
//!
//! - `correlation_id`: from `X-Correlation-ID` when it is a UUID, else fresh
//! - `phase`: which part of the bridge the path belongs to ([`Phase`])
//! - `path`: the path only; the query may hold a `token`
//! - `status`: filled in once the handler answers
//!
//! The id is stored in request extensions for the [`CorrelationId`]
//! extractor and echoed back in the response header.
//!
//! [`CorrelationId`]: crate::extractors::CorrelationId

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Part of the bridge a request path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// SSO login, callback and logout.
    Login,
    /// Credential check and playback session.
    Playback,
    /// Stream information for the player page.
    Live,
    /// Liveness and readiness probes.
    Health,
    /// Anything else (answered 404 by the router).
    Other,
}

impl Phase {
    /// Classify a request path.
    #[must_use]
    pub fn of_path(path: &str) -> Self {
        match path {
            "/session" | "/verify" => Self::Playback,
            "/logout" => Self::Login,
            "/live" => Self::Live,
            "/health" | "/ready" => Self::Health,
            _ if path.starts_with("/oauth2/") => Self::Login,
            _ => Self::Other,
        }
    }

    /// Span field value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Playback => "playback",
            Self::Live => "live",
            Self::Health => "health",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer installing [`RequestContext`] on a router.
#[must_use]
pub const fn correlation_id_layer() -> RequestContextLayer {
    RequestContextLayer
}

/// See [`correlation_id_layer`].
#[derive(Clone, Copy, Debug)]
pub struct RequestContextLayer;

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContext<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContext { inner }
    }
}

/// Service wrapper opening the request span.
#[derive(Clone, Debug)]
pub struct RequestContext<S> {
    inner: S,
}

impl<S> Service<Request> for RequestContext<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = incoming_id(&req).unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(correlation_id);

        let phase = Phase::of_path(req.uri().path());
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            phase = %phase,
            method = %req.method(),
            path = %req.uri().path(),
            status = tracing::field::Empty,
        );

        let handled = self.inner.call(req);
        Box::pin(async move {
            let mut response = handled.instrument(span.clone()).await?;
            span.record("status", response.status().as_u16());

            if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

fn incoming_id(req: &Request) -> Option<Uuid> {
    let raw = req.headers().get(CORRELATION_ID_HEADER)?.to_str().ok()?;
    Uuid::parse_str(raw).ok()
}
