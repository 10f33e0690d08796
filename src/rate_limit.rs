//! Minimum-interval rate limiter for arXiv API requests.
//!
//! arXiv asks clients to leave a few seconds between calls, and its throttle
//! applies per source address rather than per client object. Every
//! [`ArxivClient`](crate::ArxivClient) built with default settings therefore
//! shares [`RateLimiter::shared`]; tests inject their own instance.

use crate::clock::{Clock, TokioClock};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// arXiv's documented courtesy delay between requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(3);

/// Rate limiter that spaces request dispatch by a fixed minimum interval.
///
/// Clones share state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

#[derive(Debug)]
struct RateLimiterInner {
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    /// Clock reading of the most recent grant (possibly in the future).
    last_grant: Mutex<Option<Duration>>,
}

static SHARED: OnceLock<RateLimiter> = OnceLock::new();

impl RateLimiter {
    /// Create a limiter on the real clock.
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(TokioClock::new()))
    }

    /// Create a limiter on an injected clock.
    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                min_interval,
                clock,
                last_grant: Mutex::new(None),
            }),
        }
    }

    /// The process-wide limiter, using [`DEFAULT_MIN_INTERVAL`].
    pub fn shared() -> Self {
        SHARED
            .get_or_init(|| Self::new(DEFAULT_MIN_INTERVAL))
            .clone()
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// Wait until a request is allowed, then mark it as sent.
    ///
    /// The grant slot is reserved under the lock and the wait happens after
    /// it is released, so concurrent callers queue up one interval apart.
    pub async fn acquire(&self) {
        let wait = {
            let mut last_grant = self.inner.last_grant.lock().await;
            let now = self.inner.clock.now();
            let grant = match *last_grant {
                Some(prev) => now.max(prev.saturating_add(self.inner.min_interval)),
                None => now,
            };
            *last_grant = Some(grant);
            grant - now
        };

        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "pacing arXiv request");
            self.inner.clock.sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_back_to_back_separated_by_interval() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(3), Arc::new(clock.clone()));

        limiter.acquire().await;
        let first = clock.now();
        limiter.acquire().await;
        let second = clock.now();

        assert!(second - first >= Duration::from_secs(3));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
    }

    #[tokio::test]
    async fn test_first_request_immediate() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(3), Arc::new(clock.clone()));
        limiter.acquire().await;
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_no_wait_after_interval_elapsed() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(3), Arc::new(clock.clone()));
        limiter.acquire().await;
        clock.advance(Duration::from_secs(5));
        limiter.acquire().await;
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_partial_wait() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_secs(3), Arc::new(clock.clone()));
        limiter.acquire().await;
        clock.advance(Duration::from_secs(1));
        limiter.acquire().await;
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let clock = ManualClock::new();
        let a = RateLimiter::with_clock(Duration::from_secs(3), Arc::new(clock.clone()));
        let b = a.clone();
        a.acquire().await;
        b.acquire().await;
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut grants = Vec::new();
        for h in handles {
            grants.push(h.await.unwrap());
        }
        grants.sort();

        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
        assert!(grants[3] - start >= Duration::from_millis(300));
    }

    #[test]
    fn test_shared_is_process_wide() {
        let a = RateLimiter::shared();
        let b = RateLimiter::shared();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(a.min_interval(), DEFAULT_MIN_INTERVAL);
    }
}
