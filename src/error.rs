//! Error types for the arXiv client.

use std::time::Duration;

/// Errors surfaced by every public arXiv client operation.
///
/// Search operations only ever fail with one of the first four variants.
/// [`ArxivError::Config`] is reserved for building a client.
#[derive(Debug, thiserror::Error)]
pub enum ArxivError {
    /// The search request is structurally invalid (no terms, blank term).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Every attempt failed; carries the last underlying cause.
    #[error("Request failed after {attempts} attempt(s): {source}")]
    TransportExhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The response body is not a parseable Atom feed.
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    /// arXiv answered with a non-retryable HTTP status.
    #[error("Service rejected request (HTTP {status}): {message}")]
    ServiceRejected { status: u16, message: String },

    /// Client construction or environment configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ArxivError {
    /// HTTP status preserved from a rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServiceRejected { status, .. } => Some(*status),
            Self::TransportExhausted {
                source: TransportError::Status { status },
                ..
            } => Some(*status),
            Self::TransportExhausted {
                source: TransportError::RateLimited { .. },
                ..
            } => Some(429),
            _ => None,
        }
    }
}

/// A single failed transport attempt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The attempt did not complete within its timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The connection broke mid-request (reset, truncated body, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The request URL could not be used.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The server answered with a 5xx status.
    #[error("server error (HTTP {status})")]
    Status { status: u16 },

    /// The server answered 429 Too Many Requests.
    #[error("rate limited by server (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }

    /// Classify a reqwest failure.
    pub fn from_reqwest_error(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Convenience alias for Results using [`ArxivError`].
pub type Result<T> = std::result::Result<T, ArxivError>;
