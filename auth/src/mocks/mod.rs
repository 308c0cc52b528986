//! Mock provider implementations for testing.
//!
//! In-memory implementations of the provider traits with scripted failures
//! and call counters, for unit and integration tests.

pub mod stream;
pub mod ticketing;

pub use stream::MockStreamSessionProvider;
pub use ticketing::MockTicketingProvider;
