//! The arXiv API client.

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::error::{ArxivError, Result};
use crate::parse::FeedParser;
use crate::query::QueryBuilder;
use crate::rate_limit::RateLimiter;
use crate::transport::{HttpTransport, RetryPolicy, Transport, TransportClient};
use crate::types::{FeedPage, SearchRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Async client for the arXiv query API.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> arxiv_client::error::Result<()> {
/// let client = arxiv_client::ArxivClient::new()?;
/// let papers = client.search_by_title("spintronics", 5).await?;
/// for paper in &papers {
///     println!("{} ({})", paper.title, paper.arxiv_id());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ArxivClient {
    pub(crate) base_url: Url,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) transport: TransportClient,
    /// The built-in HTTP transport; `None` once a custom one is injected.
    pub(crate) http: Option<HttpTransport>,
}

/// A search result page plus transport metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub page: FeedPage,
    /// HTTP attempts made; zero when answered locally.
    pub attempts: u32,
    /// Time spent in the transport, backoff included.
    pub latency: Duration,
}

impl ArxivClient {
    /// Create a client with default settings and the shared rate limiter.
    pub fn new() -> Result<Self> {
        Self::from_config(ClientConfig::default())
    }

    /// Create a client from `ARXIV_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ArxivError::Config(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;
        let rate_limiter = match config.min_interval {
            Some(interval) => RateLimiter::new(interval),
            None => RateLimiter::shared(),
        };
        let http = HttpTransport::new(&config.user_agent, config.retry.attempt_timeout)?;

        Ok(Self {
            base_url,
            rate_limiter,
            transport: TransportClient::new(Arc::new(http.clone()), config.retry),
            http: Some(http),
        })
    }

    /// Replace the HTTP transport (useful for testing).
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = self.transport.with_transport(transport);
        self.http = None;
        self
    }

    /// Replace the rate limiter.
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Replace the clock used for retry backoff.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.transport = self.transport.with_clock(clock);
        self
    }

    /// Replace the retry policy. The built-in HTTP transport picks up the
    /// new `attempt_timeout`; an injected transport is kept as is.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        if let Some(http) = &self.http {
            let http = http.with_timeout(policy.attempt_timeout);
            self.transport = self.transport.with_transport(Arc::new(http.clone()));
            self.http = Some(http);
        }
        self.transport = self.transport.with_policy(policy);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Build, pace, fetch and parse one request.
    #[instrument(skip(self, request), fields(start = request.start))]
    pub(crate) async fn execute(&self, request: &SearchRequest) -> Result<SearchReport> {
        let query = QueryBuilder::build(request)?;

        if request.max_results == 0 {
            debug!("max_results is 0, skipping request");
            return Ok(SearchReport {
                page: FeedPage::empty(request.start),
                attempts: 0,
                latency: Duration::ZERO,
            });
        }

        let url = query.to_url(&self.base_url);
        self.rate_limiter.acquire().await;
        let fetched = self.transport.fetch(&url).await?;
        let page = FeedParser::parse(&fetched.body)?;

        debug!(
            entries = page.entries.len(),
            skipped = page.skipped_entries,
            total = page.total_results,
            attempts = fetched.attempts,
            "search complete"
        );

        Ok(SearchReport {
            page,
            attempts: fetched.attempts,
            latency: fetched.elapsed,
        })
    }
}
