//! Mock transport shared by the module tests

use crate::error::TransportError;
use crate::traits::{HttpResponse, HttpTransport};

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// Mock HttpTransport
// ============================================================================

pub(crate) struct MockTransport {
    status: u16,
    delay: Option<Duration>,
    fail_every: Option<usize>,
    broken_body: bool,
    panic_on: Option<usize>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            status: 200,
            delay: None,
            fail_every: None,
            broken_body: false,
            panic_on: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every n-th call (1-based) with a connection error
    pub(crate) fn with_fail_every(mut self, n: usize) -> Self {
        self.fail_every = Some(n);
        self
    }

    pub(crate) fn with_broken_body(mut self) -> Self {
        self.broken_body = true;
        self
    }

    /// Panic on the n-th call (1-based)
    pub(crate) fn with_panic_on(mut self, n: usize) -> Self {
        self.panic_on = Some(n);
        self
    }

    /// Number of requests dispatched so far
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if self.panic_on == Some(call) {
            panic!("mock transport panicked on call {call}");
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(n) = self.fail_every {
            if call % n == 0 {
                return Err(TransportError::Connect("simulated refusal".to_string()));
            }
        }

        let chunks: Vec<Result<Bytes, TransportError>> = if self.broken_body {
            vec![
                Ok(Bytes::from_static(b"partial")),
                Err(TransportError::Body("connection reset".to_string())),
            ]
        } else {
            vec![Ok(Bytes::from_static(b"ok"))]
        };

        Ok(HttpResponse::new(
            self.status,
            Box::pin(futures::stream::iter(chunks)),
        ))
    }
}
