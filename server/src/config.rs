//! Configuration management for the ticket-gate server.
//!
//! Loaded once from environment variables at startup, validated, and handed
//! to constructors by value. Nothing reads the environment after that.

use axum::http::HeaderValue;
use chrono::Duration as ChronoDuration;
use std::str::FromStr;
use std::time::Duration;
use ticket_gate_auth::{StreamPlatformConfig, TicketingApiConfig};
use ticket_gate_core::{
    ConfigError, CredentialConfig, EligibilityPolicy, OrderStatus, StreamBindingConfig,
};
use ticket_gate_runtime::RetryPolicy;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener, metrics and CORS settings
    pub server: ServerConfig,
    /// Where and how the browser is sent back after login
    pub frontend: FrontendConfig,
    /// Ticketing SSO and orders API
    pub ticketing: TicketingApiConfig,
    /// OAuth2 redirect URI registered with the SSO
    pub redirect_uri: String,
    /// Which orders grant access
    pub eligibility: EligibilityPolicy,
    /// Streaming platform API
    pub stream_platform: StreamPlatformConfig,
    /// The one stream this process authorizes
    pub binding: StreamBindingConfig,
    /// Credential signing settings
    pub credential: CredentialConfig,
    /// Upstream call budget
    pub upstream: UpstreamConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Whether to serve Prometheus metrics
    pub metrics_enabled: bool,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// Origins allowed to call the API with credentials (empty: same origin only)
    pub cors_allowed_origins: Vec<String>,
}

/// Front-end redirect and cookie settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendConfig {
    /// Front-end base URL, without trailing slash
    pub url: String,
    /// Mark cookies `Secure`
    pub cookie_secure: bool,
    /// Cookie `Domain` attribute
    pub cookie_domain: Option<String>,
    /// Append `?token=` to the post-login redirect for front-ends on another domain
    pub embed_token_in_redirect: bool,
}

impl FrontendConfig {
    /// Settings for a front-end at `url` with secure defaults.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            cookie_secure: true,
            cookie_domain: None,
            embed_token_in_redirect: true,
        }
    }
}

/// Upstream timeout and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Pause before the single retry
    pub retry_delay: Duration,
}

impl UpstreamConfig {
    /// Retry policy applied by the authorization bridge.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::upstream(self.timeout, self.retry_delay)
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing or invalid variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing or invalid variable.
    #[allow(clippy::too_many_lines)] // Config loading is naturally long but simple
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let cors_allowed_origins = env.list("CORS_ALLOWED_ORIGINS");
        for origin in &cors_allowed_origins {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::invalid(
                    "CORS_ALLOWED_ORIGINS",
                    format!("not a valid origin: {origin}"),
                ));
            }
        }

        let server = ServerConfig {
            host: env.or("HOST", "0.0.0.0"),
            port: env.parse_or("PORT", 8080)?,
            metrics_enabled: env.flag("METRICS_ENABLED", false)?,
            metrics_host: env.or("METRICS_HOST", "0.0.0.0"),
            metrics_port: env.parse_or("METRICS_PORT", 9090)?,
            shutdown_timeout: env.parse_or("SHUTDOWN_TIMEOUT", 30)?,
            cors_allowed_origins,
        };

        let frontend_url = env.required("FRONTEND_URL")?;
        require_http("FRONTEND_URL", &frontend_url)?;
        let frontend = FrontendConfig {
            cookie_secure: env.flag("COOKIE_SECURE", true)?,
            cookie_domain: env.optional("COOKIE_DOMAIN"),
            embed_token_in_redirect: env.flag("EMBED_TOKEN_IN_REDIRECT", true)?,
            ..FrontendConfig::new(frontend_url)
        };

        let ticketing = TicketingApiConfig::new(
            env.required("TICKETING_BASE_URL")?,
            env.required("TICKETING_ORGANIZER")?,
            env.required("TICKETING_CLIENT_ID")?,
            env.required("TICKETING_CLIENT_SECRET")?,
            env.required("TICKETING_API_TOKEN")?,
        )?
        .with_scopes(env.or("TICKETING_SCOPES", "profile"));

        let redirect_uri = env.required("TICKETING_REDIRECT_URI")?;
        require_http("TICKETING_REDIRECT_URI", &redirect_uri)?;

        let statuses: Vec<OrderStatus> = env
            .list("ELIGIBLE_ORDER_STATUSES")
            .iter()
            .map(|status| OrderStatus::from(status.clone()))
            .collect();
        let mut eligibility = if statuses.is_empty() {
            EligibilityPolicy::default()
        } else {
            EligibilityPolicy::new(statuses)
        };
        let items = env
            .list("TICKET_ITEM_IDS")
            .iter()
            .map(|item| {
                item.parse::<u64>().map_err(|_| {
                    ConfigError::invalid("TICKET_ITEM_IDS", format!("not a product id: {item}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !items.is_empty() {
            eligibility = eligibility.with_ticket_items(items);
        }
        if let Some(event) = env.optional("TICKETING_EVENT") {
            eligibility = eligibility.with_event(event);
        }

        let mut stream_platform = StreamPlatformConfig::new(
            env.required("STREAM_API_BASE_URL")?,
            env.required("STREAM_TENANT_KEY")?,
            env.required("STREAM_CLIENT_KEY")?,
            env.required("STREAM_CLIENT_SECRET")?,
        )?;
        if let Some(auth_base) = env.optional("STREAM_AUTH_BASE_URL") {
            stream_platform = stream_platform.with_auth_base_url(auth_base)?;
        }

        let mut binding =
            StreamBindingConfig::new(env.required("STREAM_ID")?, env.required("AUTHENTICATED_URL")?)?;
        if let Some(title) = env.optional("STREAM_TITLE") {
            binding = binding.with_title(title);
        }

        let credential = CredentialConfig::new(env.required("JWT_SECRET")?)?
            .with_issuer(env.or("JWT_ISSUER", "ticket-gate"))
            .with_ttl(env.seconds("JWT_TTL", 300)?)
            .with_max_ttl(env.seconds("JWT_MAX_TTL", 86_400)?)
            .with_state_ttl(env.seconds("OAUTH_STATE_TTL", 600)?);
        credential.validate()?;

        let upstream = UpstreamConfig {
            timeout: Duration::from_millis(env.parse_or("UPSTREAM_TIMEOUT_MS", 5000)?),
            retry_delay: Duration::from_millis(env.parse_or("UPSTREAM_RETRY_DELAY_MS", 200)?),
        };
        if upstream.timeout.is_zero() {
            return Err(ConfigError::invalid("UPSTREAM_TIMEOUT_MS", "must be positive"));
        }

        Ok(Self {
            server,
            frontend,
            ticketing,
            redirect_uri,
            eligibility,
            stream_platform,
            binding,
            credential,
            upstream,
        })
    }
}

fn require_http(key: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, "must be an absolute http(s) URL"))
    }
}

/// Typed accessors over a key lookup. Blank values count as unset.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::missing(key))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .parse()
                .map_err(|_| ConfigError::invalid(key, format!("cannot parse {value:?}")))
        })
    }

    fn seconds(&self, key: &str, default: i64) -> Result<ChronoDuration, ConfigError> {
        let secs = self.parse_or(key, default)?;
        ChronoDuration::try_seconds(secs).ok_or_else(|| ConfigError::invalid(key, "out of range"))
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key).map(|v| v.to_lowercase()).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off") => Ok(false),
            Some(other) => Err(ConfigError::invalid(key, format!("not a boolean: {other}"))),
        }
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.optional(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
