//! # Ticket Gate Runtime
//!
//! Execution support shared by the bridge's upstream calls:
//!
//! - [`retry`]: per-attempt timeouts and a single retry on transient failure
//! - [`metrics`]: Prometheus counters and histograms

#![forbid(unsafe_code)]

pub mod metrics;
pub mod retry;

pub use retry::{RetryPolicy, retry_with_predicate};
