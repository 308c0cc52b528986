//! Mock ticketing provider for testing.

use crate::providers::{AccessToken, TicketingProvider};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use ticket_gate_core::{GateError, OrderRecord, OrderStatus, Result, UpstreamService, UserProfile};

/// Mock ticketing provider.
///
/// Returns a configured profile and order list; each operation can be
/// scripted to fail. Clones share call counters.
#[derive(Debug, Clone)]
pub struct MockTicketingProvider {
    /// Profile returned by `fetch_profile`.
    pub profile: UserProfile,

    /// Orders returned by `fetch_orders`.
    pub orders: Vec<OrderRecord>,

    /// Error returned by `exchange_code`, if any.
    pub exchange_error: Option<GateError>,

    /// Error returned by `fetch_profile`, if any.
    pub profile_error: Option<GateError>,

    /// Error returned by `fetch_orders`, if any.
    pub orders_error: Option<GateError>,

    exchange_calls: Arc<AtomicUsize>,
    profile_calls: Arc<AtomicUsize>,
    orders_calls: Arc<AtomicUsize>,
}

impl MockTicketingProvider {
    /// Create a mock for `fan@example.com` with no orders.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profile: UserProfile {
                subject_id: "sso-user-1".to_string(),
                email: "fan@example.com".to_string(),
                display_name: Some("Test Fan".to_string()),
            },
            orders: Vec::new(),
            exchange_error: None,
            profile_error: None,
            orders_error: None,
            exchange_calls: Arc::new(AtomicUsize::new(0)),
            profile_calls: Arc::new(AtomicUsize::new(0)),
            orders_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock whose user holds one paid order.
    #[must_use]
    pub fn with_paid_order() -> Self {
        let mock = Self::new();
        let order = OrderRecord::new("PAID1", OrderStatus::Paid).with_email(&mock.profile.email);
        mock.with_orders(vec![order])
    }

    /// Create a mock whose SSO rejects every authorization code.
    #[must_use]
    pub fn failing() -> Self {
        Self::new().with_exchange_error(GateError::UpstreamAuth {
            service: UpstreamService::Sso,
            status: 401,
        })
    }

    /// Set the returned profile.
    #[must_use]
    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the returned orders.
    #[must_use]
    pub fn with_orders(mut self, orders: Vec<OrderRecord>) -> Self {
        self.orders = orders;
        self
    }

    /// Fail the code exchange.
    #[must_use]
    pub fn with_exchange_error(mut self, error: GateError) -> Self {
        self.exchange_error = Some(error);
        self
    }

    /// Fail the profile fetch.
    #[must_use]
    pub fn with_profile_error(mut self, error: GateError) -> Self {
        self.profile_error = Some(error);
        self
    }

    /// Fail the orders lookup.
    #[must_use]
    pub fn with_orders_error(mut self, error: GateError) -> Self {
        self.orders_error = Some(error);
        self
    }

    /// Number of `exchange_code` calls so far.
    #[must_use]
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_profile` calls so far.
    #[must_use]
    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_orders` calls so far.
    #[must_use]
    pub fn orders_calls(&self) -> usize {
        self.orders_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTicketingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketingProvider for MockTicketingProvider {
    fn authorization_url(&self, state: &str, redirect_uri: &str) -> String {
        format!(
            "https://tickets.example.com/acme/oauth2/v1/authorize?response_type=code&client_id=mock&redirect_uri={}&state={}",
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> impl Future<Output = Result<AccessToken>> + Send {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let error = self.exchange_error.clone();
        let token = format!("mock_access_token_for_{code}");

        async move {
            match error {
                Some(error) => Err(error),
                None => Ok(AccessToken::new(token)),
            }
        }
    }

    fn fetch_profile(
        &self,
        _access_token: &AccessToken,
    ) -> impl Future<Output = Result<UserProfile>> + Send {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .profile_error
            .clone()
            .map_or_else(|| Ok(self.profile.clone()), Err);

        async move { result }
    }

    fn fetch_orders(&self, email: &str) -> impl Future<Output = Result<Vec<OrderRecord>>> + Send {
        self.orders_calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.orders_error {
            Some(error) => Err(error.clone()),
            None => Ok(self
                .orders
                .iter()
                .filter(|order| {
                    order
                        .email
                        .as_deref()
                        .is_none_or(|owner| owner.eq_ignore_ascii_case(email))
                })
                .cloned()
                .collect()),
        };

        async move { result }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paid_order_mock() {
        let mock = MockTicketingProvider::with_paid_order();
        let token = mock.exchange_code("code-1", "https://cb").await.unwrap();
        let profile = mock.fetch_profile(&token).await.unwrap();
        let orders = mock.fetch_orders(&profile.email).await.unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(mock.exchange_calls(), 1);
        assert_eq!(mock.orders_calls(), 1);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_email() {
        let mock = MockTicketingProvider::with_paid_order();
        assert!(mock.fetch_orders("other@example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_mock_counts_calls() {
        let mock = MockTicketingProvider::failing();
        let shared = mock.clone();

        assert!(mock.exchange_code("code", "https://cb").await.is_err());
        assert_eq!(shared.exchange_calls(), 1);
    }
}
