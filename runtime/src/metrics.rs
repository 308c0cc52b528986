//! Prometheus metrics for the playback bridge.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `ticket_gate_logins_total{outcome}` - Login callbacks by outcome
//! - `ticket_gate_playback_requests_total{outcome}` - Session/verify calls by outcome
//! - `ticket_gate_upstream_calls_total{service,operation,result}` - Upstream attempts
//!
//! ## Histograms
//! - `ticket_gate_upstream_call_duration_seconds{service,operation}` - Upstream latency
//!
//! # Example
//!
//! ```rust,no_run
//! use ticket_gate_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, histogram};

/// Login callback counter.
pub const LOGINS_TOTAL: &str = "ticket_gate_logins_total";

/// Session/verify request counter.
pub const PLAYBACK_REQUESTS_TOTAL: &str = "ticket_gate_playback_requests_total";

/// Upstream call counter: one per call, however many attempts it took.
pub const UPSTREAM_CALLS_TOTAL: &str = "ticket_gate_upstream_calls_total";

/// Upstream latency histogram.
pub const UPSTREAM_CALL_DURATION: &str = "ticket_gate_upstream_call_duration_seconds";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on its own HTTP listener for Prometheus scraping.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            started: false,
        }
    }

    /// Register metric descriptions and start the exporter listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        self.started = true;
        tracing::info!(addr = %self.addr, "Metrics server started");
        Ok(())
    }

    /// Whether the exporter was installed.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(LOGINS_TOTAL, "Login callbacks by outcome");
    describe_counter!(
        PLAYBACK_REQUESTS_TOTAL,
        "Playback session requests by outcome"
    );
    describe_counter!(
        UPSTREAM_CALLS_TOTAL,
        "Upstream calls (retries included) by service, operation and final result"
    );
    describe_histogram!(
        UPSTREAM_CALL_DURATION,
        "Time taken by upstream calls including retries"
    );
}

/// Record one finished upstream call.
pub fn record_upstream_call(
    service: &'static str,
    operation: &'static str,
    result: &'static str,
    elapsed: Duration,
) {
    counter!(
        UPSTREAM_CALLS_TOTAL,
        "service" => service,
        "operation" => operation,
        "result" => result
    )
    .increment(1);
    histogram!(
        UPSTREAM_CALL_DURATION,
        "service" => service,
        "operation" => operation
    )
    .record(elapsed.as_secs_f64());
}
