//! Domain types for the playback bridge.
//!
//! Identifiers are newtypes so a stream id can never be passed where a
//! session id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of the one live stream this process is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Create a stream id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential subject: the user identity registered with the streaming platform.
///
/// Emails are trimmed and lowercased so `Alice@Example.com` and
/// `alice@example.com` bind to the same upstream user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Build a subject from an email address.
    #[must_use]
    pub fn from_email(email: &str) -> Self {
        Self(email.trim().to_lowercase())
    }

    /// Borrow the raw subject.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque playback session id issued by the streaming platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an upstream session id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity returned by the ticketing SSO userinfo endpoint.
///
/// Fetched fresh per login and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque SSO subject id.
    pub subject_id: String,

    /// Email address; orders are looked up by it.
    pub email: String,

    /// Display name, if the SSO shares one.
    pub display_name: Option<String>,
}

impl UserProfile {
    /// Credential subject for this profile.
    #[must_use]
    pub fn subject(&self) -> Subject {
        Subject::from_email(&self.email)
    }
}

/// Order status as reported by the ticketing platform.
///
/// Accepts both the platform's single-letter codes (`p`, `n`, `c`, `e`) and
/// spelled-out names. Unknown statuses are kept verbatim so an operator can
/// still list them as eligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Payment received.
    Paid,
    /// Completed without payment (free tickets, comps).
    Completed,
    /// Awaiting payment.
    Pending,
    /// Canceled or refunded.
    Canceled,
    /// Unpaid and past its payment deadline.
    Expired,
    /// Any other upstream status.
    Other(String),
}

impl OrderStatus {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Other(raw) => raw,
        }
    }
}

impl FromStr for OrderStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "p" | "paid" => Self::Paid,
            "completed" | "complete" => Self::Completed,
            "n" | "pending" => Self::Pending,
            "c" | "canceled" | "cancelled" | "refunded" => Self::Canceled,
            "e" | "expired" => Self::Expired,
            _ => Self::Other(normalized),
        })
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(status) => status,
            Err(infallible) => match infallible {},
        }
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase evidence from the ticketing orders API.
///
/// Fetched fresh per eligibility check; purchase state can change, so these
/// are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Order code.
    pub code: String,

    /// Current status.
    pub status: OrderStatus,

    /// Buyer email.
    pub email: Option<String>,

    /// Event slug the order belongs to, when the API reports it.
    pub event: Option<String>,

    /// Product ids of the order's positions.
    pub item_ids: Vec<u64>,
}

impl OrderRecord {
    /// Create an order with no positions.
    #[must_use]
    pub fn new(code: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            code: code.into(),
            status,
            email: None,
            event: None,
            item_ids: Vec::new(),
        }
    }

    /// Set the buyer email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Add a position for the given product id.
    #[must_use]
    pub fn with_item(mut self, item_id: u64) -> Self {
        self.item_ids.push(item_id);
        self
    }
}
