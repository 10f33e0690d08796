//! HTTP transport and retry policy.
//!
//! [`Transport`] is the single-GET primitive; [`HttpTransport`] implements it
//! over reqwest. [`TransportClient`] wraps a transport in a bounded retry
//! loop: exponential backoff with jitter on timeouts, connection failures,
//! 5xx and 429 responses, immediate failure on other statuses.
//!
//! Cancellation is drop-based: dropping the future returned by
//! [`TransportClient::fetch`] drops the in-flight request or the pending
//! backoff sleep.

use crate::clock::{Clock, TokioClock};
use crate::error::{ArxivError, Result, TransportError};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Longest `Retry-After` we are willing to honour.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// How much of a rejected response body is kept in the error message.
const MAX_ERROR_BODY: usize = 512;

/// Raw HTTP response as seen by the retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, if present.
    pub retry_after: Option<Duration>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: Vec::new(),
        }
    }
}

/// One HTTP GET, no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> std::result::Result<HttpResponse, TransportError>;
}

/// [`Transport`] over a reqwest client.
///
/// The timeout is applied per request, so [`with_timeout`](Self::with_timeout)
/// can change it while sharing the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ArxivError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { http, timeout })
    }

    /// Same client and pool, different per-request timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            http: self.http.clone(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> std::result::Result<HttpResponse, TransportError> {
        let response = self
            .http
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest_error(&e, self.timeout))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest_error(&e, self.timeout))?
            .to_vec();

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date.
///
/// Values beyond one hour are capped; dates in the past yield zero.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds).min(MAX_RETRY_AFTER));
    }

    let when = httpdate::parse_http_date(value).ok()?;
    let delay = when
        .duration_since(std::time::SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Some(delay.min(MAX_RETRY_AFTER))
}

/// Retry and timeout settings for [`TransportClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each retry.
    pub base_delay: Duration,
    /// Cap on the exponential part of the delay.
    pub max_delay: Duration,
    /// Upper bound of the random jitter added to each delay.
    pub max_jitter: Duration,
    /// Minimum delay after a 429.
    pub rate_limited_floor: Duration,
    /// Bound on a single attempt.
    pub attempt_timeout: Duration,
    /// Give up rather than start a retry that would end past this budget.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(500),
            rate_limited_floor: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the attempt after `attempt` (1-based) failed with `error`.
    ///
    /// `min(base * 2^(attempt-1), max_delay) + jitter`, raised to the 429
    /// floor and to any `Retry-After` the server sent.
    pub fn delay_for(&self, attempt: u32, error: &TransportError) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(31);
        let backoff = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_delay)
            .saturating_add(self.jitter());

        match error {
            TransportError::RateLimited { retry_after } => backoff
                .max(self.rate_limited_floor)
                .max(retry_after.unwrap_or(Duration::ZERO)),
            _ => backoff,
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// A successful fetch plus what it took to get it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub body: Vec<u8>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Time from the first attempt to success, backoff included.
    pub elapsed: Duration,
}

/// Issues one logical GET with bounded retries.
#[derive(Clone)]
pub struct TransportClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("policy", &self.policy)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TransportClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            clock: Arc::new(TokioClock::new()),
        }
    }

    /// Replace the clock used for backoff sleeps and elapsed time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url`, retrying transient failures.
    #[instrument(skip(self, url), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<Fetched> {
        let started = self.clock.now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let outcome =
                match tokio::time::timeout(self.policy.attempt_timeout, self.transport.get(url))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(self.policy.attempt_timeout)),
                };

            let error = match outcome {
                Ok(response) => match classify(response) {
                    Ok(body) => {
                        let elapsed = self.clock.now().saturating_sub(started);
                        if attempt > 1 {
                            debug!(attempt, ?elapsed, "request succeeded after retries");
                        }
                        return Ok(Fetched {
                            body,
                            attempts: attempt,
                            elapsed,
                        });
                    }
                    Err(Classified::Rejected { status, message }) => {
                        return Err(ArxivError::ServiceRejected { status, message });
                    }
                    Err(Classified::Retryable(error)) => error,
                },
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(ArxivError::TransportExhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                warn!(attempt, %error, "giving up: attempt limit reached");
                return Err(ArxivError::TransportExhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.policy.delay_for(attempt, &error);
            let elapsed = self.clock.now().saturating_sub(started);
            if elapsed.saturating_add(delay) > self.policy.max_elapsed {
                warn!(attempt, ?elapsed, %error, "giving up: retry budget exhausted");
                return Err(ArxivError::TransportExhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            debug!(attempt, %error, delay_ms = delay.as_millis() as u64, "retrying");
            self.clock.sleep(delay).await;
        }
    }
}

enum Classified {
    Retryable(TransportError),
    Rejected { status: u16, message: String },
}

/// Map a response status to success, a retryable failure, or a rejection.
fn classify(response: HttpResponse) -> std::result::Result<Vec<u8>, Classified> {
    match response.status {
        200..=299 => Ok(response.body),
        429 => Err(Classified::Retryable(TransportError::RateLimited {
            retry_after: response.retry_after,
        })),
        500..=599 => Err(Classified::Retryable(TransportError::Status {
            status: response.status,
        })),
        status => {
            let mut message = String::from_utf8_lossy(&response.body).trim().to_string();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            Err(Classified::Rejected { status, message })
        }
    }
}
