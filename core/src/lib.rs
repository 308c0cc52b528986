//! # Ticket Gate Core
//!
//! Core types for the ticket-gate playback-authorization bridge.
//!
//! This crate holds everything that can be decided without I/O:
//!
//! - **Types**: user profiles, order records, stream and subject identifiers
//! - **Errors**: the bridge-wide failure taxonomy
//! - **Eligibility**: the purchase rule that turns orders into a yes/no
//! - **Config**: the static stream binding and credential settings
//! - **Environment**: the `Clock` abstraction used for deterministic tests
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Ticketing   │   │ Stream       │   │  Credential  │
//! │  provider    │   │ provider     │   │  codec       │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │ OrderRecord      │ SessionId        │ Claims
//!        ▼                  ▼                  ▼
//!   ┌──────────────────────────────────────────────────┐
//!   │         ticket-gate-core (pure, no I/O)          │
//!   └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod eligibility;
pub mod environment;
pub mod error;
pub mod types;

pub use config::{CredentialConfig, StreamBindingConfig};
pub use eligibility::EligibilityPolicy;
pub use environment::{Clock, SystemClock};
pub use error::{ConfigError, CredentialError, GateError, Result, UpstreamService};
pub use types::{OrderRecord, OrderStatus, SessionId, StreamId, Subject, UserProfile};
