//! Login, callback and logout endpoints.
//!
//! # Flow
//!
//! ```text
//! GET /oauth2/login?return_to=/watch
//!   → Set-Cookie: tg_oauth_state (path /oauth2/callback)
//!   → 303 to the SSO authorize endpoint
//! GET /oauth2/callback?code=..&state=..
//!   → Set-Cookie: tg_credential, clears tg_oauth_state
//!   → 303 to {FRONTEND_URL}{return_to}?token=..   (or ?reason=login_failed)
//! POST /logout
//!   → clears tg_credential, 204
//! ```

use crate::config::FrontendConfig;
use crate::cookies::{self, STATE_COOKIE};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use ticket_gate_auth::{CallbackParams, LoginOutcome, StreamSessionProvider, TicketingProvider};
use ticket_gate_web::{AppError, CorrelationId};

/// Query of `/oauth2/login`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Front-end path to land on after login
    pub return_to: Option<String>,
}

/// Start an SSO login.
///
/// # Endpoint
///
/// ```text
/// GET /oauth2/login?return_to=/watch
/// ```
///
/// # Errors
///
/// Returns a 500 [`AppError`] if the state token cannot be signed.
pub async fn login<T, S>(
    State(state): State<AppState<T, S>>,
    correlation_id: CorrelationId,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<(CookieJar, Redirect), AppError>
where
    T: TicketingProvider + 'static,
    S: StreamSessionProvider + 'static,
{
    let start = state.bridge.begin_login(query.return_to.as_deref())?;
    let ttl = state.bridge.codec().config().state_ttl.num_seconds();

    tracing::info!(
        correlation_id = %correlation_id.0,
        has_return_to = start.request.return_to.is_some(),
        "Redirecting to SSO"
    );

    let jar = jar.add(cookies::state_cookie(start.state_token, ttl, &state.frontend));
    Ok((jar, Redirect::to(&start.authorize_url)))
}

/// Complete an SSO login.
///
/// # Endpoint
///
/// ```text
/// GET /oauth2/callback?code=..&state=..
/// ```
///
/// Always clears the state cookie. A forged, replayed or incomplete
/// callback answers 400; every other failure redirects to the front-end
/// with `reason=login_failed`.
pub async fn callback<T, S>(
    State(state): State<AppState<T, S>>,
    correlation_id: CorrelationId,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response
where
    T: TicketingProvider + 'static,
    S: StreamSessionProvider + 'static,
{
    let state_token = jar.get(STATE_COOKIE).map(|cookie| cookie.value().to_string());
    let jar = jar.add(cookies::clear_state_cookie(&state.frontend));

    match state.bridge.complete_login(&params, state_token.as_deref()).await {
        Ok(LoginOutcome::Authenticated(success)) => {
            let token = success.credential.token.clone();
            let lifetime = success.credential.lifetime_seconds();

            tracing::info!(
                correlation_id = %correlation_id.0,
                jti = %success.credential.claims.jti,
                eligible = success.credential.claims.eligible,
                "Login completed"
            );

            let embedded = state
                .frontend
                .embed_token_in_redirect
                .then_some(("token", token.as_str()));
            let location = frontend_location(
                &state.frontend,
                success.return_to.as_deref(),
                embedded.as_slice(),
            );

            let jar = jar.add(cookies::credential_cookie(token, lifetime, &state.frontend));
            (jar, Redirect::to(&location)).into_response()
        }
        Ok(LoginOutcome::Failed { reason, return_to }) => {
            tracing::info!(
                correlation_id = %correlation_id.0,
                reason = %reason,
                "Login failed"
            );

            let location = frontend_location(
                &state.frontend,
                return_to.as_deref(),
                &[("reason", reason.as_str())],
            );
            (jar, Redirect::to(&location)).into_response()
        }
        Err(error) => {
            tracing::debug!(correlation_id = %correlation_id.0, "Answering callback with 400");
            (jar, AppError::from(error)).into_response()
        }
    }
}

/// Forget the credential cookie.
///
/// # Endpoint
///
/// ```text
/// POST /logout
/// ```
///
/// Stateless: a copy of the credential held elsewhere stays valid until it
/// expires.
#[allow(clippy::unused_async)]
pub async fn logout<T, S>(
    State(state): State<AppState<T, S>>,
    jar: CookieJar,
) -> (CookieJar, StatusCode)
where
    T: TicketingProvider + 'static,
    S: StreamSessionProvider + 'static,
{
    (
        jar.add(cookies::clear_credential_cookie(&state.frontend)),
        StatusCode::NO_CONTENT,
    )
}

/// Front-end address for `return_to` with extra query parameters.
///
/// `return_to` is already restricted to a local path; it defaults to `/`.
#[must_use]
pub fn frontend_location(
    frontend: &FrontendConfig,
    return_to: Option<&str>,
    params: &[(&str, &str)],
) -> String {
    let target = return_to.unwrap_or("/");
    let (path, fragment) = target
        .split_once('#')
        .map_or((target, None), |(path, fragment)| (path, Some(fragment)));

    let mut location = format!("{}{path}", frontend.url);
    if !params.is_empty() {
        location.push(if path.contains('?') { '&' } else { '?' });
        location.push_str(&serde_urlencoded::to_string(params).unwrap_or_default());
    }
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}
