//! Per-worker request pacing

use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use tokio_util::sync::CancellationToken;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spaces one worker's requests `1 / rate` seconds apart
///
/// Each worker owns one, so the limit applies per worker: with `w` workers
/// and a limit of `q`, the run issues at most `w * q` requests per second.
/// The bucket holds a single permit, so a stalled worker does not get to
/// burst afterwards.
pub struct RequestRateLimiter {
    limiter: Option<DirectLimiter>,
    period: Option<Duration>,
}

impl RequestRateLimiter {
    /// Create a limiter for `rate_limit` requests per second
    ///
    /// `None`, zero, negative and non-finite rates disable pacing.
    ///
    /// # Examples
    /// ```
    /// use httpload_core::worker::RequestRateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RequestRateLimiter::new(Some(4.0));
    /// assert_eq!(limiter.period(), Some(Duration::from_millis(250)));
    ///
    /// assert!(!RequestRateLimiter::new(None).is_enabled());
    /// ```
    pub fn new(rate_limit: Option<f64>) -> Self {
        let period = rate_limit.and_then(period_for);
        let limiter = period
            .and_then(Quota::with_period)
            .map(RateLimiter::direct);

        Self { limiter, period }
    }

    /// Create a limiter that never waits
    pub fn unlimited() -> Self {
        Self {
            limiter: None,
            period: None,
        }
    }

    /// Whether pacing is active
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Minimum spacing between two requests of this worker
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Wait for the next permit
    ///
    /// Returns `false` when `cancel` fires first; the worker must then stop
    /// without sending another request.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        let Some(limiter) = &self.limiter else {
            return !cancel.is_cancelled();
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = limiter.until_ready() => true,
        }
    }
}

fn period_for(rps: f64) -> Option<Duration> {
    if !rps.is_finite() || rps <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rps)
        .ok()
        .filter(|period| !period.is_zero())
}

impl Default for RequestRateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for RequestRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRateLimiter")
            .field("period", &self.period)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_disabled_rates() {
        for rate in [None, Some(0.0), Some(-10.0), Some(f64::NAN), Some(f64::INFINITY)] {
            let limiter = RequestRateLimiter::new(rate);
            assert!(!limiter.is_enabled(), "rate {rate:?} should disable pacing");
            assert!(limiter.period().is_none());
        }
        assert!(!RequestRateLimiter::default().is_enabled());
    }

    #[test]
    fn test_sub_one_rate_is_not_rounded_up() {
        let limiter = RequestRateLimiter::new(Some(0.5));
        assert!(limiter.is_enabled());
        assert_eq!(limiter.period(), Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_acquire_spaces_requests() {
        let limiter = RequestRateLimiter::new(Some(20.0));
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..5 {
            assert!(limiter.acquire(&cancel).await);
        }
        // First permit is immediate, the next four are 50ms apart
        assert!(start.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_acquire_observes_cancellation() {
        let limiter = RequestRateLimiter::new(Some(0.1));
        let cancel = CancellationToken::new();
        assert!(limiter.acquire(&cancel).await);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert!(!limiter.acquire(&cancel).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_unlimited_acquire() {
        let limiter = RequestRateLimiter::unlimited();
        let cancel = CancellationToken::new();
        assert!(limiter.acquire(&cancel).await);

        cancel.cancel();
        assert!(!limiter.acquire(&cancel).await);
    }

    #[test]
    fn test_rate_limiter_debug() {
        let debug = format!("{:?}", RequestRateLimiter::new(Some(2.0)));
        assert!(debug.contains("RequestRateLimiter"));
        assert!(debug.contains("500ms"));
    }
}
