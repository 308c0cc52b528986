//! Mock streaming platform for testing.

use crate::providers::StreamSessionProvider;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ticket_gate_core::{GateError, Result, SessionId, StreamId, Subject, UpstreamService};

/// Mock streaming platform.
///
/// Registration is idempotent, like the real platform. Every
/// `open_session` call yields a new session id. Clones share state and
/// call counters.
#[derive(Debug, Clone)]
pub struct MockStreamSessionProvider {
    /// Error returned by `register_user`, if any.
    pub register_error: Option<GateError>,

    /// Error returned by `open_session`, if any.
    pub open_error: Option<GateError>,

    /// Delay before `open_session` answers (simulates a hung upstream).
    pub open_delay: Option<Duration>,

    registered: Arc<Mutex<HashSet<(StreamId, Subject)>>>,
    register_calls: Arc<AtomicUsize>,
    open_calls: Arc<AtomicUsize>,
}

impl MockStreamSessionProvider {
    /// Create a mock that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            register_error: None,
            open_error: None,
            open_delay: None,
            registered: Arc::new(Mutex::new(HashSet::new())),
            register_calls: Arc::new(AtomicUsize::new(0)),
            open_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock whose session endpoint never answers in time.
    #[must_use]
    pub fn hanging() -> Self {
        Self::new().with_open_delay(Duration::from_secs(3600))
    }

    /// Fail registration.
    #[must_use]
    pub fn with_register_error(mut self, error: GateError) -> Self {
        self.register_error = Some(error);
        self
    }

    /// Fail session opening.
    #[must_use]
    pub fn with_open_error(mut self, error: GateError) -> Self {
        self.open_error = Some(error);
        self
    }

    /// Delay session opening.
    #[must_use]
    pub const fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Number of `register_user` calls so far.
    #[must_use]
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Number of `open_session` calls so far.
    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Number of distinct `(stream, user)` registrations.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registered.lock().map_or(0, |set| set.len())
    }

    /// Total upstream calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.register_calls() + self.open_calls()
    }
}

impl Default for MockStreamSessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSessionProvider for MockStreamSessionProvider {
    fn register_user(
        &self,
        stream_id: &StreamId,
        user: &Subject,
    ) -> impl Future<Output = Result<()>> + Send {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let result = match &self.register_error {
            Some(error) => Err(error.clone()),
            None => self
                .registered
                .lock()
                .map(|mut set| {
                    set.insert((stream_id.clone(), user.clone()));
                })
                .map_err(|_| GateError::UpstreamUnavailable {
                    service: UpstreamService::StreamPlatform,
                    detail: "mock registry poisoned".to_string(),
                }),
        };

        async move { result }
    }

    fn open_session(
        &self,
        stream_id: &StreamId,
        _user: &Subject,
    ) -> impl Future<Output = Result<SessionId>> + Send {
        let call = self.open_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.open_delay;
        let result = match &self.open_error {
            Some(error) => Err(error.clone()),
            None => Ok(SessionId::new(format!("{stream_id}-session-{call}"))),
        };

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}
