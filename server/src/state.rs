//! Application state shared by every handler.

use crate::config::FrontendConfig;
use std::sync::Arc;
use ticket_gate_auth::AuthorizationBridge;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; both members are behind an `Arc` and immutable.
pub struct AppState<T, S> {
    /// The authorization bridge
    pub bridge: Arc<AuthorizationBridge<T, S>>,

    /// Redirect and cookie settings
    pub frontend: Arc<FrontendConfig>,
}

impl<T, S> AppState<T, S> {
    /// Create a new application state.
    #[must_use]
    pub fn new(bridge: AuthorizationBridge<T, S>, frontend: FrontendConfig) -> Self {
        Self {
            bridge: Arc::new(bridge),
            frontend: Arc::new(frontend),
        }
    }
}

impl<T, S> Clone for AppState<T, S> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
            frontend: Arc::clone(&self.frontend),
        }
    }
}
