//! Cookies set by the login flow.
//!
//! The state cookie only travels to the callback path; the credential
//! cookie travels everywhere. Both are `HttpOnly` and `SameSite=Lax`.

use crate::config::FrontendConfig;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

pub use ticket_gate_web::CREDENTIAL_COOKIE;

/// Cookie carrying the sealed OAuth state between login and callback.
pub const STATE_COOKIE: &str = "tg_oauth_state";

/// Path the SSO redirects back to.
pub const CALLBACK_PATH: &str = "/oauth2/callback";

fn build(
    name: &'static str,
    value: String,
    path: &'static str,
    max_age: Duration,
    frontend: &FrontendConfig,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .http_only(true)
        .secure(frontend.cookie_secure)
        .same_site(SameSite::Lax)
        .path(path)
        .max_age(max_age)
        .build();

    if let Some(domain) = &frontend.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookie
}

/// State cookie for a login in flight.
#[must_use]
pub fn state_cookie(token: String, ttl_seconds: i64, frontend: &FrontendConfig) -> Cookie<'static> {
    build(STATE_COOKIE, token, CALLBACK_PATH, Duration::seconds(ttl_seconds), frontend)
}

/// Removal cookie for the state cookie.
#[must_use]
pub fn clear_state_cookie(frontend: &FrontendConfig) -> Cookie<'static> {
    build(STATE_COOKIE, String::new(), CALLBACK_PATH, Duration::ZERO, frontend)
}

/// Credential cookie living as long as the credential.
#[must_use]
pub fn credential_cookie(
    token: String,
    lifetime_seconds: i64,
    frontend: &FrontendConfig,
) -> Cookie<'static> {
    build(CREDENTIAL_COOKIE, token, "/", Duration::seconds(lifetime_seconds), frontend)
}

/// Removal cookie for the credential cookie.
#[must_use]
pub fn clear_credential_cookie(frontend: &FrontendConfig) -> Cookie<'static> {
    build(CREDENTIAL_COOKIE, String::new(), "/", Duration::ZERO, frontend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cookie_is_scoped_to_callback() {
        let cookie = state_cookie("sealed".to_string(), 600, &FrontendConfig::new("https://live.example.com"));

        assert_eq!(cookie.name(), STATE_COOKIE);
        assert_eq!(cookie.path(), Some(CALLBACK_PATH));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(600)));
    }

    #[test]
    fn test_credential_cookie_honours_domain_and_secure_flag() {
        let mut frontend = FrontendConfig::new("http://localhost:3000");
        frontend.cookie_secure = false;
        frontend.cookie_domain = Some("example.com".to_string());

        let cookie = credential_cookie("jwt".to_string(), 300, &frontend);

        assert_eq!(cookie.value(), "jwt");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.domain(), Some("example.com"));
    }

    #[test]
    fn test_removal_cookies_expire_immediately() {
        let frontend = FrontendConfig::new("https://live.example.com");

        assert_eq!(clear_credential_cookie(&frontend).max_age(), Some(Duration::ZERO));
        assert_eq!(clear_state_cookie(&frontend).max_age(), Some(Duration::ZERO));
    }
}
