//! Ticketing platform HTTP client (pretix-style SSO and orders API).

use super::{AccessToken, TicketingProvider, build_client, status_error, transport_error};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use ticket_gate_core::{
    ConfigError, GateError, OrderRecord, OrderStatus, Result, UpstreamService, UserProfile,
};

/// Upper bound on order pages followed for one email.
pub const MAX_ORDER_PAGES: usize = 20;

/// Ticketing platform endpoints and credentials.
///
/// Endpoints derived from `base_url` and `organizer`:
///
/// - authorize: `{base}/{organizer}/oauth2/v1/authorize`
/// - token: `{base}/{organizer}/oauth2/v1/token`
/// - userinfo: `{base}/{organizer}/oauth2/v1/userinfo`
/// - orders: `{base}/api/v1/organizers/{organizer}/orders/?email=`
#[derive(Clone)]
pub struct TicketingApiConfig {
    /// Platform base URL without trailing slash.
    pub base_url: String,

    /// Organizer slug.
    pub organizer: String,

    /// OAuth client id.
    pub client_id: String,

    /// OAuth scopes (space separated).
    ///
    /// Default: `profile`
    pub scopes: String,

    client_secret: String,
    api_token: String,
}

impl TicketingApiConfig {
    /// Create ticketing configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is empty or the base URL is not
    /// http(s).
    pub fn new(
        base_url: impl Into<String>,
        organizer: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        api_token: impl Into<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigError::invalid(
                "TICKETING_BASE_URL",
                "must be an absolute http(s) URL",
            ));
        }

        let config = Self {
            base_url,
            organizer: organizer.into(),
            client_id: client_id.into(),
            scopes: "profile".to_string(),
            client_secret: client_secret.into(),
            api_token: api_token.into(),
        };

        for (key, value) in [
            ("TICKETING_ORGANIZER", &config.organizer),
            ("TICKETING_CLIENT_ID", &config.client_id),
            ("TICKETING_CLIENT_SECRET", &config.client_secret),
            ("TICKETING_API_TOKEN", &config.api_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::missing(key));
            }
        }

        Ok(config)
    }

    /// Set the requested OAuth scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    fn oauth_endpoint(&self, name: &str) -> String {
        format!("{}/{}/oauth2/v1/{name}", self.base_url, self.organizer)
    }

    fn orders_endpoint(&self, email: &str) -> String {
        format!(
            "{}/api/v1/organizers/{}/orders/?email={}",
            self.base_url,
            self.organizer,
            urlencoding::encode(email)
        )
    }
}

impl fmt::Debug for TicketingApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketingApiConfig")
            .field("base_url", &self.base_url)
            .field("organizer", &self.organizer)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("client_secret", &"<redacted>")
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// HTTP implementation of [`TicketingProvider`].
#[derive(Clone, Debug)]
pub struct HttpTicketingProvider {
    config: TicketingApiConfig,
    http_client: Client,
}

impl HttpTicketingProvider {
    /// Create a client whose requests are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn new(
        config: TicketingApiConfig,
        timeout: Duration,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            config,
            http_client: build_client(timeout)?,
        })
    }

    async fn fetch_orders_page(&self, url: &str) -> Result<OrdersPayload> {
        let service = UpstreamService::Orders;
        let response = self
            .http_client
            .get(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.config.api_token),
            )
            .send()
            .await
            .map_err(|e| transport_error(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Orders lookup rejected");
            return Err(status_error(service, status));
        }

        response.json().await.map_err(|e| transport_error(service, &e))
    }
}

impl TicketingProvider for HttpTicketingProvider {
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.config.oauth_endpoint("authorize"),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<AccessToken> {
        let service = UpstreamService::Sso;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(self.config.oauth_endpoint("token"))
            .form(&params)
            .send()
            .await
            .map_err(|e| transport_error(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "SSO token exchange rejected");
            return Err(status_error(service, status));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| transport_error(service, &e))?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(AccessToken::new(access_token)),
            _ => Err(GateError::UpstreamProtocol {
                service,
                detail: "token response without access_token".to_string(),
            }),
        }
    }

    async fn fetch_profile(&self, access_token: &AccessToken) -> Result<UserProfile> {
        let service = UpstreamService::Sso;
        let response = self
            .http_client
            .get(self.config.oauth_endpoint("userinfo"))
            .bearer_auth(access_token.secret())
            .send()
            .await
            .map_err(|e| transport_error(service, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "SSO userinfo rejected");
            return Err(status_error(service, status));
        }

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| transport_error(service, &e))?;

        let email = info
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .ok_or_else(|| GateError::UpstreamProtocol {
                service,
                detail: "userinfo without email".to_string(),
            })?;

        Ok(UserProfile {
            subject_id: info.sub.unwrap_or_else(|| email.clone()),
            email,
            display_name: info.name,
        })
    }

    async fn fetch_orders(&self, email: &str) -> Result<Vec<OrderRecord>> {
        let mut orders = Vec::new();
        let mut url = self.config.orders_endpoint(email);

        for page in 1..=MAX_ORDER_PAGES {
            let next = match self.fetch_orders_page(&url).await? {
                OrdersPayload::List(results) => {
                    orders.extend(results.into_iter().map(RawOrder::into_record));
                    None
                }
                OrdersPayload::Page { next, results } => {
                    orders.extend(results.into_iter().map(RawOrder::into_record));
                    next
                }
            };

            match next {
                None => return Ok(orders),
                Some(next) if same_origin(&self.config.base_url, &next) => url = next,
                Some(_) => {
                    return Err(GateError::UpstreamProtocol {
                        service: UpstreamService::Orders,
                        detail: "pagination link points at a foreign host".to_string(),
                    });
                }
            }

            if page == MAX_ORDER_PAGES {
                tracing::warn!(pages = MAX_ORDER_PAGES, "Order pagination truncated");
            }
        }

        Ok(orders)
    }
}

/// Whether `link` may receive the orders API token: same scheme, host and
/// port as `base`, and no userinfo.
fn same_origin(base: &str, link: &str) -> bool {
    let (Ok(base), Ok(link)) = (Url::parse(base), Url::parse(link)) else {
        return false;
    };

    link.username().is_empty()
        && link.password().is_none()
        && base.scheme() == link.scheme()
        && base.host_str() == link.host_str()
        && base.port_or_known_default() == link.port_or_known_default()
}

/// SSO token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// SSO userinfo response.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

/// Orders endpoint response: a page, or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrdersPayload {
    Page {
        #[serde(default)]
        next: Option<String>,
        results: Vec<RawOrder>,
    },
    List(Vec<RawOrder>),
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    code: String,
    status: OrderStatus,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    positions: Vec<RawPosition>,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    #[serde(default)]
    item: Option<u64>,
}

impl RawOrder {
    fn into_record(self) -> OrderRecord {
        OrderRecord {
            code: self.code,
            status: self.status,
            email: self.email,
            event: self.event,
            item_ids: self.positions.into_iter().filter_map(|p| p.item).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> TicketingApiConfig {
        TicketingApiConfig::new(
            "https://tickets.example.com/",
            "acme",
            "client-1",
            "client-secret",
            "api-token",
        )
        .unwrap()
    }

    #[test]
    fn test_config_requires_values() {
        assert_eq!(
            TicketingApiConfig::new("https://t.example.com", "acme", "id", "", "tok").unwrap_err(),
            ConfigError::missing("TICKETING_CLIENT_SECRET")
        );
        assert!(TicketingApiConfig::new("ftp://t", "acme", "id", "s", "tok").is_err());
    }

    #[test]
    fn test_endpoints() {
        let config = config();
        assert_eq!(
            config.oauth_endpoint("token"),
            "https://tickets.example.com/acme/oauth2/v1/token"
        );
        assert_eq!(
            config.orders_endpoint("a+b@example.com"),
            "https://tickets.example.com/api/v1/organizers/acme/orders/?email=a%2Bb%40example.com"
        );
    }

    #[test]
    fn test_authorization_url() {
        let provider = HttpTicketingProvider::new(config(), Duration::from_secs(5)).unwrap();
        let url = provider.authorization_url("nonce-1", "https://gate.example.com/oauth2/callback");
        assert_eq!(
            url,
            "https://tickets.example.com/acme/oauth2/v1/authorize?response_type=code\
             &client_id=client-1\
             &redirect_uri=https%3A%2F%2Fgate.example.com%2Foauth2%2Fcallback\
             &scope=profile&state=nonce-1"
        );
    }

    #[test]
    fn test_same_origin() {
        let base = "https://tickets.example.com";
        assert!(same_origin(base, "https://tickets.example.com/api/v1/orders/?page=2"));
        assert!(same_origin(base, "https://tickets.example.com:443/orders/?page=2"));

        assert!(!same_origin(base, "https://tickets.example.com.evil.net/orders/"));
        assert!(!same_origin(base, "https://tickets.example.com:8443/orders/"));
        assert!(!same_origin(base, "http://tickets.example.com/orders/"));
        assert!(!same_origin(base, "https://user:pw@tickets.example.com/orders/"));
        assert!(!same_origin(base, "/orders/?page=2"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("client-secret"));
        assert!(!rendered.contains("api-token"));
    }

    #[test]
    fn test_orders_payload_shapes() {
        let page: OrdersPayload = serde_json::from_str(
            r#"{"count":1,"next":null,"results":[
                {"code":"AB12C","status":"p","email":"fan@example.com","event":"live",
                 "positions":[{"item":42},{"item":null}]}
            ]}"#,
        )
        .unwrap();
        let OrdersPayload::Page { next, results } = page else {
            unreachable!("expected a page");
        };
        assert!(next.is_none());
        let record = results.into_iter().next().unwrap().into_record();
        assert_eq!(record.status, OrderStatus::Paid);
        assert_eq!(record.item_ids, vec![42]);

        let list: OrdersPayload =
            serde_json::from_str(r#"[{"code":"X","status":"n"}]"#).unwrap();
        assert!(matches!(list, OrdersPayload::List(ref orders) if orders.len() == 1));
    }
}
