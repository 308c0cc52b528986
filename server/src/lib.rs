//! # Ticket Gate Server
//!
//! HTTP surface of the playback-authorization bridge.
//!
//! ```text
//! ┌───────────┐  /oauth2/login, /oauth2/callback   ┌──────────────┐
//! │  browser  │ ─────────────────────────────────▶ │ ticketing SSO │
//! │  + player │                                    │ + orders API  │
//! └───────────┘  /session                          └──────────────┘
//!       │        ───────────────▶ AuthorizationBridge ──▶ streaming platform
//!       ▼
//!  playback URL
//! ```
//!
//! Handlers are generic over the two provider traits so the whole router can
//! run against mocks in tests.

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod cookies;
pub mod routes;
pub mod state;

pub use config::{Config, FrontendConfig, ServerConfig, UpstreamConfig};
pub use routes::{build_router, cors_layer};
pub use state::AppState;
