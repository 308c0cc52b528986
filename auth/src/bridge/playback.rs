//! Phase B: credential verification and playback session orchestration.

use super::{AuthorizationBridge, Reason};
use crate::credential::SessionClaims;
use crate::providers::{StreamSessionProvider, TicketingProvider};
use ticket_gate_core::{CredentialError, GateError, Result, SessionId, Subject, UpstreamService};
use ticket_gate_runtime::metrics::{PLAYBACK_REQUESTS_TOTAL, counter};

/// Answer to a playback request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The user may watch; assign `playback_url` to the player.
    Authorized {
        /// One-time playback address.
        playback_url: String,
        /// Upstream session backing the address.
        session_id: SessionId,
        /// Credential subject.
        subject: Subject,
    },

    /// The user may not watch, or the upstream could not be reached.
    Denied(Reason),
}

impl PlaybackOutcome {
    /// Whether playback was authorized.
    #[must_use]
    pub const fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }

    /// Playback address, if authorized.
    #[must_use]
    pub fn playback_url(&self) -> Option<&str> {
        match self {
            Self::Authorized { playback_url, .. } => Some(playback_url),
            Self::Denied(_) => None,
        }
    }

    /// Denial reason, if denied.
    #[must_use]
    pub const fn reason(&self) -> Option<Reason> {
        match self {
            Self::Authorized { .. } => None,
            Self::Denied(reason) => Some(*reason),
        }
    }
}

enum PlaybackStep<'a> {
    AwaitingCredential(Option<&'a str>),
    Verifying(&'a str),
    CheckingEligibility(SessionClaims),
    RegisteringUpstream(Subject),
    OpeningSession(Subject),
    ResolvingAddress { subject: Subject, session_id: SessionId },
    Responding(PlaybackOutcome),
}

impl PlaybackStep<'_> {
    const fn name(&self) -> &'static str {
        match self {
            Self::AwaitingCredential(_) => "awaiting_credential",
            Self::Verifying(_) => "verifying",
            Self::CheckingEligibility(_) => "checking_eligibility",
            Self::RegisteringUpstream(_) => "registering_upstream",
            Self::OpeningSession(_) => "opening_session",
            Self::ResolvingAddress { .. } => "resolving_address",
            Self::Responding(_) => "responding",
        }
    }
}

impl<T, S> AuthorizationBridge<T, S>
where
    T: TicketingProvider,
    S: StreamSessionProvider,
{
    /// Verify a credential and produce a playback address.
    ///
    /// Never fails: credential problems, missing purchase and upstream
    /// failures all become [`PlaybackOutcome::Denied`]. Ineligible or
    /// invalid credentials make no upstream calls.
    pub async fn authorize_playback(&self, token: Option<&str>) -> PlaybackOutcome {
        let outcome = match self.run_playback(token).await {
            Ok(outcome) => outcome,
            Err(error) => {
                if error.is_security_issue() {
                    tracing::warn!(%error, "Rejected forged credential");
                } else {
                    tracing::info!(%error, "Playback denied");
                }
                PlaybackOutcome::Denied(Reason::from_error(&error))
            }
        };

        let label = outcome.reason().map_or("authorized", Reason::as_str);
        counter!(PLAYBACK_REQUESTS_TOTAL, "outcome" => label).increment(1);
        outcome
    }

    async fn run_playback(&self, token: Option<&str>) -> Result<PlaybackOutcome> {
        let stream_id = &self.binding.stream_id;
        let mut step = PlaybackStep::AwaitingCredential(token);

        loop {
            tracing::debug!(phase = step.name(), "Playback step");

            step = match step {
                PlaybackStep::AwaitingCredential(None) => {
                    return Ok(PlaybackOutcome::Denied(Reason::MissingCredential));
                }
                PlaybackStep::AwaitingCredential(Some(token)) => PlaybackStep::Verifying(token),
                PlaybackStep::Verifying(token) => {
                    let claims = self.codec.verify(token)?;
                    if &claims.stream_id != stream_id {
                        tracing::warn!(
                            jti = %claims.jti,
                            credential_stream = %claims.stream_id,
                            "Credential bound to another stream"
                        );
                        return Err(GateError::Credential(CredentialError::Malformed));
                    }
                    PlaybackStep::CheckingEligibility(claims)
                }
                PlaybackStep::CheckingEligibility(claims) => {
                    if !claims.eligible {
                        return Ok(PlaybackOutcome::Denied(Reason::PurchaseRequired));
                    }
                    tracing::debug!(jti = %claims.jti, subject = %claims.sub, "Credential accepted");
                    PlaybackStep::RegisteringUpstream(claims.sub)
                }
                PlaybackStep::RegisteringUpstream(subject) => {
                    let user = &subject;
                    self.call_upstream(UpstreamService::StreamPlatform, "register_user", || {
                        self.streams.register_user(stream_id, user)
                    })
                    .await?;
                    PlaybackStep::OpeningSession(subject)
                }
                PlaybackStep::OpeningSession(subject) => {
                    let user = &subject;
                    let session_id = self
                        .call_upstream(UpstreamService::StreamPlatform, "open_session", || {
                            self.streams.open_session(stream_id, user)
                        })
                        .await?;
                    PlaybackStep::ResolvingAddress {
                        subject,
                        session_id,
                    }
                }
                PlaybackStep::ResolvingAddress {
                    subject,
                    session_id,
                } => PlaybackStep::Responding(PlaybackOutcome::Authorized {
                    playback_url: self.binding.playback_url(&session_id),
                    session_id,
                    subject,
                }),
                PlaybackStep::Responding(outcome) => return Ok(outcome),
            };
        }
    }
}
