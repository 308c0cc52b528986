//! End-to-end tests of the HTTP surface with mock upstreams.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use ticket_gate_auth::mocks::{MockStreamSessionProvider, MockTicketingProvider};
use ticket_gate_auth::{AuthorizationBridge, CredentialCodec};
use ticket_gate_core::{EligibilityPolicy, StreamId, Subject};
use ticket_gate_runtime::RetryPolicy;
use ticket_gate_server::{AppState, FrontendConfig, build_router, cors_layer};
use ticket_gate_testing::{
    ManualClock, init_test_tracing, test_credential_config, test_stream_binding,
};
use tower::ServiceExt;

type MockState = AppState<MockTicketingProvider, MockStreamSessionProvider>;

struct TestApp {
    router: Router,
    state: MockState,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new(ticketing: MockTicketingProvider, streams: MockStreamSessionProvider) -> Self {
        init_test_tracing();
        let clock = Arc::new(ManualClock::default());
        let codec = CredentialCodec::new(test_credential_config(), clock.clone()).unwrap();
        let bridge = AuthorizationBridge::new(
            ticketing,
            streams,
            codec,
            EligibilityPolicy::default(),
            test_stream_binding(),
            "https://gate.example.com/oauth2/callback",
        )
        .with_retry_policy(RetryPolicy::upstream(
            Duration::from_millis(50),
            Duration::from_millis(5),
        ));

        let state = AppState::new(bridge, FrontendConfig::new("https://live.example.com"));
        let router = build_router(state.clone(), cors_layer(&[]));

        Self {
            router,
            state,
            clock,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Run `/oauth2/login`; returns the `state` nonce and the state cookie value.
    async fn start_login(&self) -> (String, String) {
        let response = self.get("/oauth2/login?return_to=/watch", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = location(&response);
        let nonce = location
            .split_once("state=")
            .map(|(_, nonce)| nonce.to_string())
            .expect("authorize URL carries state");
        let sealed = set_cookie(&response, "tg_oauth_state").expect("state cookie set");

        (nonce, sealed)
    }

    /// Full Phase A; returns the callback response.
    async fn login(&self, code: &str) -> Response<Body> {
        let (nonce, sealed) = self.start_login().await;
        self.get(
            &format!("/oauth2/callback?code={code}&state={nonce}"),
            Some(&format!("tg_oauth_state={sealed}")),
        )
        .await
    }

    async fn session_with_cookie(&self, token: &str) -> Response<Body> {
        self.get("/session", Some(&format!("tg_credential={token}"))).await
    }
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect has a location")
        .to_str()
        .unwrap()
        .to_string()
}

/// Value of the `Set-Cookie` header for `name`, if set to a non-empty value.
fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(cookie_name, _)| *cookie_name == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn clears_cookie(response: &Response<Body>, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&format!("{name}=;")) && value.contains("Max-Age=0"))
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_login_redirects_to_sso_with_state_cookie() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());

    let response = app.get("/oauth2/login", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("https://tickets.example.com/acme/oauth2/v1/authorize?"));

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("tg_oauth_state="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/oauth2/callback"));
}

#[tokio::test]
async fn test_scenario_code_exchange_rejected() {
    let app = TestApp::new(MockTicketingProvider::failing(), MockStreamSessionProvider::new());

    let response = app.login("bad-code").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://live.example.com/watch?reason=login_failed"
    );
    assert_eq!(set_cookie(&response, "tg_credential"), None);
    assert!(clears_cookie(&response, "tg_oauth_state"));
    assert_eq!(app.state.bridge.ticketing().orders_calls(), 0);
}

#[tokio::test]
async fn test_scenario_paid_order_gets_playback_url() {
    let app = TestApp::new(
        MockTicketingProvider::with_paid_order(),
        MockStreamSessionProvider::new(),
    );

    let callback = app.login("good-code").await;
    assert_eq!(callback.status(), StatusCode::SEE_OTHER);

    let token = set_cookie(&callback, "tg_credential").expect("credential cookie set");
    assert_eq!(
        location(&callback),
        format!("https://live.example.com/watch?token={token}")
    );
    let claims = app.state.bridge.codec().verify(&token).unwrap();
    assert!(claims.eligible);

    let response = app.session_with_cookie(&token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );

    let body = json_body(response).await;
    assert_eq!(body["authorized"], true);
    assert!(
        body["playback_url"]
            .as_str()
            .unwrap()
            .starts_with("https://cdn.example.com/hls/")
    );
    assert!(body["reason"].is_null());
    assert_eq!(app.state.bridge.streams().open_calls(), 1);
}

#[tokio::test]
async fn test_scenario_no_orders_requires_purchase() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());

    let callback = app.login("good-code").await;
    let token = set_cookie(&callback, "tg_credential").expect("credential cookie set");
    assert!(!app.state.bridge.codec().verify(&token).unwrap().eligible);

    let response = app.session_with_cookie(&token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = json_body(response).await;
    assert_eq!(body["authorized"], false);
    assert!(body["playback_url"].is_null());
    assert_eq!(body["reason"], "purchase_required");
    assert_eq!(app.state.bridge.streams().total_calls(), 0);
}

#[tokio::test]
async fn test_scenario_expired_credential_short_circuits() {
    let app = TestApp::new(
        MockTicketingProvider::with_paid_order(),
        MockStreamSessionProvider::new(),
    );

    let callback = app.login("good-code").await;
    let token = set_cookie(&callback, "tg_credential").unwrap();

    app.clock.advance(chrono::Duration::seconds(301));

    let response = app.session_with_cookie(&token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["authorized"], false);
    assert_eq!(body["reason"], "credential_expired");
    assert_eq!(app.state.bridge.streams().total_calls(), 0);
}

#[tokio::test]
async fn test_scenario_session_open_times_out_twice() {
    let app = TestApp::new(
        MockTicketingProvider::with_paid_order(),
        MockStreamSessionProvider::hanging(),
    );

    let callback = app.login("good-code").await;
    let token = set_cookie(&callback, "tg_credential").unwrap();

    let response = app.session_with_cookie(&token).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");

    let body = json_body(response).await;
    assert_eq!(body["authorized"], false);
    assert_eq!(body["reason"], "upstream_unavailable");
    assert_eq!(app.state.bridge.streams().open_calls(), 2);
}

#[tokio::test]
async fn test_callback_with_forged_state_is_rejected() {
    let app = TestApp::new(
        MockTicketingProvider::with_paid_order(),
        MockStreamSessionProvider::new(),
    );
    let (_nonce, sealed) = app.start_login().await;

    let response = app
        .get(
            "/oauth2/callback?code=good-code&state=not-the-nonce",
            Some(&format!("tg_oauth_state={sealed}")),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(clears_cookie(&response, "tg_oauth_state"));
    assert_eq!(app.state.bridge.ticketing().exchange_calls(), 0);
}

#[tokio::test]
async fn test_callback_without_state_cookie_is_rejected() {
    let app = TestApp::new(
        MockTicketingProvider::with_paid_order(),
        MockStreamSessionProvider::new(),
    );
    let (nonce, _sealed) = app.start_login().await;

    let response = app
        .get(&format!("/oauth2/callback?code=good-code&state={nonce}"), None)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.state.bridge.ticketing().exchange_calls(), 0);
}

#[tokio::test]
async fn test_callback_with_sso_error_redirects() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());
    let (nonce, sealed) = app.start_login().await;

    let response = app
        .get(
            &format!("/oauth2/callback?error=access_denied&state={nonce}"),
            Some(&format!("tg_oauth_state={sealed}")),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://live.example.com/watch?reason=login_failed"
    );
    assert_eq!(app.state.bridge.ticketing().exchange_calls(), 0);
}

#[tokio::test]
async fn test_session_without_credential() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());

    let response = app.get("/session", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert_eq!(body["reason"], "missing_credential");
}

#[tokio::test]
async fn test_session_accepts_query_token() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());
    let issued = app
        .state
        .bridge
        .codec()
        .issue(
            &Subject::from_email("fan@example.com"),
            &StreamId::new("live-1"),
            true,
            None,
        )
        .unwrap();

    let response = app
        .get(&format!("/verify?token={}", issued.token), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_sessions_for_one_credential() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());
    let issued = app
        .state
        .bridge
        .codec()
        .issue(
            &Subject::from_email("fan@example.com"),
            &StreamId::new("live-1"),
            true,
            None,
        )
        .unwrap();

    let requests = (0..8).map(|_| app.session_with_cookie(&issued.token));
    let responses = futures::future::join_all(requests).await;

    let mut urls = Vec::new();
    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        urls.push(body["playback_url"].as_str().unwrap().to_string());
    }
    urls.sort();
    urls.dedup();

    assert_eq!(urls.len(), 8);
    assert_eq!(app.state.bridge.streams().open_calls(), 8);
}

#[tokio::test]
async fn test_logout_clears_credential_cookie() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(clears_cookie(&response, "tg_credential"));
}

#[tokio::test]
async fn test_live_describes_bound_stream() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());

    let response = app.get("/live", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["stream_id"], "live-1");
    assert_eq!(body["title"], "Main Stage");
}

#[tokio::test]
async fn test_health_and_correlation_header() {
    let app = TestApp::new(MockTicketingProvider::new(), MockStreamSessionProvider::new());

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-correlation-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");

    let ready = app.get("/ready", None).await;
    assert_eq!(ready.status(), StatusCode::OK);
}
