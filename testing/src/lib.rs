//! # Ticket Gate Testing
//!
//! Testing utilities for the ticket-gate crates:
//!
//! - A deterministic clock (`ManualClock`)
//! - Configuration fixtures with known secrets and stream bindings
//! - proptest strategies for domain types
//! - Opt-in tracing output for test runs
//!
//! ## Example
//!
//! ```
//! use chrono::Duration;
//! use ticket_gate_core::Clock;
//! use ticket_gate_testing::ManualClock;
//!
//! let clock = ManualClock::default();
//! let before = clock.now();
//! clock.advance(Duration::minutes(5));
//! assert_eq!(clock.now() - before, Duration::minutes(5));
//! ```

use chrono::{DateTime, Utc};
use ticket_gate_core::Clock;

/// Start of every test timeline: 2025-01-01 00:00:00 UTC.
pub const TEST_EPOCH_SECS: i64 = 1_735_689_600;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, TEST_EPOCH_SECS, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that only moves when told to.
    ///
    /// Whole-second resolution, like credential timestamps. Safe to share
    /// between a server under test and the test body.
    #[derive(Debug)]
    pub struct ManualClock {
        secs: AtomicI64,
    }

    impl ManualClock {
        /// Create a clock frozen at `time` (sub-second part dropped).
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                secs: AtomicI64::new(time.timestamp()),
            }
        }

        /// Move the clock forward (or backward, for negative durations).
        pub fn advance(&self, by: chrono::Duration) {
            self.secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
        }

        /// Jump to an absolute time.
        pub fn set(&self, time: DateTime<Utc>) {
            self.secs.store(time.timestamp(), Ordering::SeqCst);
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self {
                secs: AtomicI64::new(TEST_EPOCH_SECS),
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(self.secs.load(Ordering::SeqCst), 0).unwrap_or_default()
        }
    }
}

/// Configuration fixtures.
pub mod fixtures {
    use ticket_gate_core::{CredentialConfig, StreamBindingConfig};

    /// Signing secret used by every test.
    pub const TEST_SECRET: &str = "test-secret-test-secret-test-secret!";

    /// Stream every test fixture is bound to.
    pub const TEST_STREAM_ID: &str = "live-1";

    /// Playback address template of the test stream.
    pub const TEST_AUTHENTICATED_URL: &str = "https://cdn.example.com/hls/{session_id}/index.m3u8";

    /// Credential settings with defaults and [`TEST_SECRET`].
    ///
    /// # Panics
    ///
    /// Never: the secret is long enough.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_credential_config() -> CredentialConfig {
        CredentialConfig::new(TEST_SECRET).expect("test secret satisfies the length rule")
    }

    /// Binding for [`TEST_STREAM_ID`].
    ///
    /// # Panics
    ///
    /// Never: the template is valid.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_stream_binding() -> StreamBindingConfig {
        StreamBindingConfig::new(TEST_STREAM_ID, TEST_AUTHENTICATED_URL)
            .expect("test template is valid")
            .with_title("Main Stage")
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;
    use ticket_gate_core::{OrderRecord, OrderStatus};

    /// Lowercase email addresses on a test domain.
    pub fn arb_email() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9._]{0,15}".prop_map(|local| format!("{local}@example.com"))
    }

    /// Any order status, including unknown upstream ones.
    pub fn arb_order_status() -> impl Strategy<Value = OrderStatus> {
        prop_oneof![
            Just(OrderStatus::Paid),
            Just(OrderStatus::Completed),
            Just(OrderStatus::Pending),
            Just(OrderStatus::Canceled),
            Just(OrderStatus::Expired),
            "[a-z]{3,8}".prop_map(|s| OrderStatus::Other(format!("x_{s}"))),
        ]
    }

    /// Orders with up to three positions.
    pub fn arb_order() -> impl Strategy<Value = OrderRecord> {
        (
            "[A-Z0-9]{5}",
            arb_order_status(),
            proptest::collection::vec(1u64..100, 0..3),
        )
            .prop_map(|(code, status, items)| {
                items
                    .into_iter()
                    .fold(OrderRecord::new(code, status), OrderRecord::with_item)
            })
    }
}

/// Install a test subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::{TEST_SECRET, TEST_STREAM_ID, test_credential_config, test_stream_binding};
pub use mocks::ManualClock;
