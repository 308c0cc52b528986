//! Streaming-authorization platform HTTP client.
//!
//! Every operation first obtains a client-credentials access token, then
//! calls the tenant-scoped HLS authorization API:
//!
//! - token: `POST {auth_base}/v2.0/{tenant}/oauth2/token`
//! - register: `POST {api_base}/v2.0/{tenant}/lives/{stream_id}/hlsauth/users`
//! - session: `POST {api_base}/v2.0/{tenant}/lives/{stream_id}/hlsauth/sessions`

use super::{StreamSessionProvider, build_client, status_error, transport_error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use ticket_gate_core::{
    ConfigError, GateError, Result, SessionId, StreamId, Subject, UpstreamService,
};

const SERVICE: UpstreamService = UpstreamService::StreamPlatform;

/// Streaming platform endpoints and credentials.
#[derive(Clone)]
pub struct StreamPlatformConfig {
    /// HLS authorization API base URL without trailing slash.
    pub api_base_url: String,

    /// Token endpoint base URL without trailing slash.
    ///
    /// Default: same as `api_base_url`
    pub auth_base_url: String,

    /// Tenant key.
    pub tenant_key: String,

    /// Client key for the client-credentials grant.
    pub client_key: String,

    client_secret: String,
}

impl StreamPlatformConfig {
    /// Create streaming platform configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is empty or the base URL is not
    /// http(s).
    pub fn new(
        api_base_url: impl Into<String>,
        tenant_key: impl Into<String>,
        client_key: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let api_base_url = normalize_base("STREAM_API_BASE_URL", api_base_url.into())?;
        let config = Self {
            auth_base_url: api_base_url.clone(),
            api_base_url,
            tenant_key: tenant_key.into(),
            client_key: client_key.into(),
            client_secret: client_secret.into(),
        };

        for (key, value) in [
            ("STREAM_TENANT_KEY", &config.tenant_key),
            ("STREAM_CLIENT_KEY", &config.client_key),
            ("STREAM_CLIENT_SECRET", &config.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::missing(key));
            }
        }

        Ok(config)
    }

    /// Use a separate host for token acquisition.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL is not http(s).
    pub fn with_auth_base_url(
        mut self,
        auth_base_url: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        self.auth_base_url = normalize_base("STREAM_AUTH_BASE_URL", auth_base_url.into())?;
        Ok(self)
    }

    fn token_endpoint(&self) -> String {
        format!("{}/v2.0/{}/oauth2/token", self.auth_base_url, self.tenant_key)
    }

    fn hlsauth_endpoint(&self, stream_id: &StreamId, resource: &str) -> String {
        format!(
            "{}/v2.0/{}/lives/{}/hlsauth/{resource}",
            self.api_base_url,
            self.tenant_key,
            urlencoding::encode(stream_id.as_str())
        )
    }
}

fn normalize_base(key: &str, url: String) -> std::result::Result<String, ConfigError> {
    let url = url.trim().trim_end_matches('/').to_string();
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url)
    } else {
        Err(ConfigError::invalid(key, "must be an absolute http(s) URL"))
    }
}

impl fmt::Debug for StreamPlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPlatformConfig")
            .field("api_base_url", &self.api_base_url)
            .field("auth_base_url", &self.auth_base_url)
            .field("tenant_key", &self.tenant_key)
            .field("client_key", &self.client_key)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// HTTP implementation of [`StreamSessionProvider`].
#[derive(Clone, Debug)]
pub struct HttpStreamSessionProvider {
    config: StreamPlatformConfig,
    http_client: Client,
}

impl HttpStreamSessionProvider {
    /// Create a client whose requests are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn new(
        config: StreamPlatformConfig,
        timeout: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            config,
            http_client: build_client(timeout)?,
        })
    }

    /// Obtain a client-credentials access token.
    async fn platform_token(&self) -> Result<String> {
        let resource = format!("{}/", self.config.auth_base_url);
        let params = [
            ("client_key", self.config.client_key.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("resource", resource.as_str()),
        ];

        let response = self
            .http_client
            .post(self.config.token_endpoint())
            .query(&params)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Platform token request rejected");
            return Err(status_error(SERVICE, status));
        }

        let token: PlatformTokenResponse = response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GateError::UpstreamProtocol {
                service: SERVICE,
                detail: "token response without access_token".to_string(),
            })
    }
}

impl StreamSessionProvider for HttpStreamSessionProvider {
    async fn register_user(&self, stream_id: &StreamId, user: &Subject) -> Result<()> {
        let token = self.platform_token().await?;
        let response = self
            .http_client
            .post(self.config.hlsauth_endpoint(stream_id, "users"))
            .bearer_auth(token)
            .json(&UserRequest {
                user_id: user.as_str(),
            })
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::CONFLICT {
            tracing::debug!(
                stream_id = %stream_id,
                already_registered = status == StatusCode::CONFLICT,
                "User registered for stream"
            );
            return Ok(());
        }

        tracing::warn!(status = status.as_u16(), stream_id = %stream_id, "User registration rejected");
        Err(status_error(SERVICE, status))
    }

    async fn open_session(&self, stream_id: &StreamId, user: &Subject) -> Result<SessionId> {
        let token = self.platform_token().await?;
        let response = self
            .http_client
            .post(self.config.hlsauth_endpoint(stream_id, "sessions"))
            .bearer_auth(token)
            .json(&UserRequest {
                user_id: user.as_str(),
            })
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), stream_id = %stream_id, "Session open rejected");
            return Err(status_error(SERVICE, status));
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        session
            .session_id
            .filter(|id| !id.is_empty())
            .map(SessionId::new)
            .ok_or_else(|| GateError::UpstreamProtocol {
                service: SERVICE,
                detail: "session response without session_id".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct PlatformTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct UserRequest<'a> {
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: Option<String>,
}
