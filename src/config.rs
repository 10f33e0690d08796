//! Client configuration.

use crate::error::{ArxivError, Result};
use crate::transport::RetryPolicy;
use std::time::Duration;

/// Public arXiv query endpoint.
pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";

/// Settings used to build an [`ArxivClient`](crate::ArxivClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Query endpoint; the encoded query is appended as the URL query.
    pub base_url: String,
    /// Private limiter interval. `None` uses [`RateLimiter::shared`](crate::RateLimiter::shared).
    pub min_interval: Option<Duration>,
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            min_interval: None,
            retry: RetryPolicy::default(),
            user_agent: concat!("arxiv-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `ARXIV_API_URL`, `ARXIV_MIN_INTERVAL_MS`,
    /// `ARXIV_MAX_ATTEMPTS` and `ARXIV_TIMEOUT_SECS` where set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup("ARXIV_API_URL")) {
            config.base_url = url;
        }
        if let Some(ms) = non_empty(lookup("ARXIV_MIN_INTERVAL_MS")) {
            config.min_interval = Some(Duration::from_millis(parse_var(
                "ARXIV_MIN_INTERVAL_MS",
                &ms,
            )?));
        }
        if let Some(n) = non_empty(lookup("ARXIV_MAX_ATTEMPTS")) {
            let attempts: u32 = parse_var("ARXIV_MAX_ATTEMPTS", &n)?;
            if attempts == 0 {
                return Err(ArxivError::Config(
                    "ARXIV_MAX_ATTEMPTS must be at least 1".into(),
                ));
            }
            config.retry.max_attempts = attempts;
        }
        if let Some(secs) = non_empty(lookup("ARXIV_TIMEOUT_SECS")) {
            let secs: u64 = parse_var("ARXIV_TIMEOUT_SECS", &secs)?;
            if secs == 0 {
                return Err(ArxivError::Config(
                    "ARXIV_TIMEOUT_SECS must be at least 1".into(),
                ));
            }
            config.retry.attempt_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ArxivError::Config(format!("invalid value for {}: '{}'", key, value)))
}
