//! Axum integration for the ticket-gate HTTP surface.
//!
//! Handlers stay thin: they extract inputs, call the authorization bridge and
//! map its outcome to a response. This crate holds the pieces every handler
//! shares.
//!
//! # Request Flow
//!
//! 1. **Correlation layer** reads or generates `X-Correlation-ID` and opens
//!    an `http_request` span
//! 2. **Extractors** pull the credential token and correlation id
//! 3. **Handler** drives the bridge
//! 4. **Errors** convert to [`AppError`] responses without upstream detail
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use ticket_gate_web::{CredentialToken, correlation_id_layer};
//!
//! async fn session(token: CredentialToken) -> String {
//!     format!("has token: {}", token.0.is_some())
//! }
//!
//! let app = Router::new()
//!     .route("/session", get(session))
//!     .layer(correlation_id_layer());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CREDENTIAL_COOKIE, CorrelationId, CredentialToken};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
