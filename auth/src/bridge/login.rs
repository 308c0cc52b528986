//! Phase A: login initiation and the OAuth2 callback.

use super::{AuthorizationBridge, Reason};
use crate::authorization::AuthorizationRequest;
use crate::credential::IssuedCredential;
use crate::providers::{AccessToken, StreamSessionProvider, TicketingProvider};
use serde::Deserialize;
use ticket_gate_core::{GateError, Result, UpstreamService, UserProfile};
use ticket_gate_runtime::metrics::{LOGINS_TOTAL, counter};

/// Where to send the browser to start a login.
#[derive(Debug, Clone)]
pub struct LoginStart {
    /// SSO authorize URL.
    pub authorize_url: String,

    /// Sealed [`AuthorizationRequest`] to store in the state cookie.
    pub state_token: String,

    /// The request that was sealed.
    pub request: AuthorizationRequest,
}

/// Query parameters of the SSO redirect back to the callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,

    /// Anti-forgery state echoed by the SSO.
    pub state: Option<String>,

    /// SSO-side error (e.g. `access_denied`).
    pub error: Option<String>,
}

/// A completed login.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    /// Credential to hand to the front-end.
    pub credential: IssuedCredential,

    /// Profile the credential was issued for.
    pub profile: UserProfile,

    /// Front-end path requested at login start.
    pub return_to: Option<String>,
}

/// Result of a callback with a valid `state`.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// A credential was issued (eligible or not).
    Authenticated(LoginSuccess),

    /// No credential was issued; the browser gets a generic signal.
    Failed {
        /// Always [`Reason::LoginFailed`] today.
        reason: Reason,
        /// Front-end path requested at login start.
        return_to: Option<String>,
    },
}

/// Steps of the callback state machine after `state` validation.
enum LoginStep {
    ExchangingCode,
    FetchingProfile(AccessToken),
    CheckingOrders(UserProfile),
    IssuingCredential { profile: UserProfile, eligible: bool },
    Redirecting(LoginSuccess),
}

impl LoginStep {
    const fn name(&self) -> &'static str {
        match self {
            Self::ExchangingCode => "exchanging_code",
            Self::FetchingProfile(_) => "fetching_profile",
            Self::CheckingOrders(_) => "checking_orders",
            Self::IssuingCredential { .. } => "issuing_credential",
            Self::Redirecting(_) => "redirecting",
        }
    }
}

impl<T, S> AuthorizationBridge<T, S>
where
    T: TicketingProvider,
    S: StreamSessionProvider,
{
    /// Start a login: create and seal an authorization request.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Config`] if the state token cannot be signed.
    pub fn begin_login(&self, return_to: Option<&str>) -> Result<LoginStart> {
        let request = AuthorizationRequest::new(self.codec.now(), return_to);
        let state_token = self.codec.seal_state(&request)?;
        let authorize_url = self
            .ticketing
            .authorization_url(&request.state, &self.redirect_uri);

        tracing::debug!(return_to = ?request.return_to, "Login started");

        Ok(LoginStart {
            authorize_url,
            state_token,
            request,
        })
    }

    /// Complete a login from the SSO callback.
    ///
    /// `state_token` is the sealed request from the state cookie.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidRequest`] when the `state` is missing,
    /// expired, forged or does not match, or when neither a code nor an SSO
    /// error is present. Every other failure is a
    /// [`LoginOutcome::Failed`].
    pub async fn complete_login(
        &self,
        params: &CallbackParams,
        state_token: Option<&str>,
    ) -> Result<LoginOutcome> {
        let request = match self.check_state(params, state_token) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(%error, "Rejected OAuth callback");
                counter!(LOGINS_TOTAL, "outcome" => "invalid_request").increment(1);
                return Err(error);
            }
        };
        let return_to = request.return_to;

        if let Some(sso_error) = &params.error {
            tracing::info!(sso_error = %sso_error, "SSO reported a login error");
            counter!(LOGINS_TOTAL, "outcome" => "failed").increment(1);
            return Ok(LoginOutcome::Failed {
                reason: Reason::LoginFailed,
                return_to,
            });
        }

        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            counter!(LOGINS_TOTAL, "outcome" => "invalid_request").increment(1);
            return Err(GateError::invalid_request("callback without code"));
        };

        match self.run_login(code, return_to.clone()).await {
            Ok(success) => {
                let outcome = if success.credential.claims.eligible {
                    "authorized"
                } else {
                    "not_eligible"
                };
                counter!(LOGINS_TOTAL, "outcome" => outcome).increment(1);
                tracing::info!(
                    jti = %success.credential.claims.jti,
                    eligible = success.credential.claims.eligible,
                    "Login completed"
                );
                Ok(LoginOutcome::Authenticated(success))
            }
            Err(error) => {
                counter!(LOGINS_TOTAL, "outcome" => "failed").increment(1);
                tracing::warn!(%error, "Login failed");
                Ok(LoginOutcome::Failed {
                    reason: Reason::LoginFailed,
                    return_to,
                })
            }
        }
    }

    fn check_state(
        &self,
        params: &CallbackParams,
        state_token: Option<&str>,
    ) -> Result<AuthorizationRequest> {
        let token = state_token.ok_or_else(|| GateError::invalid_request("missing state cookie"))?;
        let request = self
            .codec
            .open_state(token)
            .map_err(|e| GateError::invalid_request(format!("unusable state token: {e}")))?;

        let presented = params
            .state
            .as_deref()
            .ok_or_else(|| GateError::invalid_request("missing state parameter"))?;

        if !request.matches_state(presented) {
            return Err(GateError::invalid_request("state mismatch"));
        }
        Ok(request)
    }

    async fn run_login(&self, code: &str, return_to: Option<String>) -> Result<LoginSuccess> {
        let redirect_uri = self.redirect_uri.as_str();
        let mut step = LoginStep::ExchangingCode;

        loop {
            tracing::debug!(phase = step.name(), "Login step");

            step = match step {
                LoginStep::ExchangingCode => {
                    let token = self
                        .call_upstream(UpstreamService::Sso, "exchange_code", || {
                            self.ticketing.exchange_code(code, redirect_uri)
                        })
                        .await?;
                    LoginStep::FetchingProfile(token)
                }
                LoginStep::FetchingProfile(token) => {
                    let token = &token;
                    let profile = self
                        .call_upstream(UpstreamService::Sso, "fetch_profile", || {
                            self.ticketing.fetch_profile(token)
                        })
                        .await?;
                    LoginStep::CheckingOrders(profile)
                }
                LoginStep::CheckingOrders(profile) => {
                    let email = profile.email.as_str();
                    let orders = self
                        .call_upstream(UpstreamService::Orders, "fetch_orders", || {
                            self.ticketing.fetch_orders(email)
                        })
                        .await?;
                    let eligible = self.policy.evaluate(&orders);
                    tracing::debug!(orders = orders.len(), eligible, "Eligibility evaluated");
                    LoginStep::IssuingCredential { profile, eligible }
                }
                LoginStep::IssuingCredential { profile, eligible } => {
                    let credential = self.codec.issue(
                        &profile.subject(),
                        &self.binding.stream_id,
                        eligible,
                        None,
                    )?;
                    LoginStep::Redirecting(LoginSuccess {
                        credential,
                        profile,
                        return_to: return_to.clone(),
                    })
                }
                LoginStep::Redirecting(success) => return Ok(success),
            };
        }
    }
}
