//! Stream information endpoint.

use crate::state::AppState;
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use ticket_gate_auth::{StreamSessionProvider, TicketingProvider};

/// Stream the front-end should render a player for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveResponse {
    /// Bound stream id
    pub stream_id: String,
    /// Display title, if configured
    pub title: Option<String>,
}

/// Describe the bound stream.
///
/// # Endpoint
///
/// ```text
/// GET /live
/// ```
#[allow(clippy::unused_async)]
pub async fn live<T, S>(State(state): State<AppState<T, S>>) -> Json<LiveResponse>
where
    T: TicketingProvider + 'static,
    S: StreamSessionProvider + 'static,
{
    let binding = state.bridge.binding();
    Json(LiveResponse {
        stream_id: binding.stream_id.to_string(),
        title: binding.title.clone(),
    })
}
