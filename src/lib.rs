//! # arxiv-client
//!
//! A Rust client for the arXiv query API.
//!
//! Provides:
//! - **Library**: Async client with typed queries, Atom feed parsing, request pacing and retries
//! - **CLI**: `arxiv` binary for terminal use (includes `arxiv serve` for MCP)
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn example() -> arxiv_client::error::Result<()> {
//! use arxiv_client::ArxivClient;
//!
//! // Default endpoint, paced by the process-wide rate limiter
//! let client = ArxivClient::new()?;
//!
//! let papers = client.search_by_title("spintronics", 5).await?;
//! for paper in &papers {
//!     println!("{} - {} ({})", paper.arxiv_id(), paper.title, paper.formatted_authors());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Structured Search
//!
//! ```no_run
//! # async fn example() -> arxiv_client::error::Result<()> {
//! use arxiv_client::{ArxivClient, SearchRequest, SortBy};
//!
//! let client = ArxivClient::new()?;
//! let request = SearchRequest::new()
//!     .author("Hawking")
//!     .and()
//!     .title("black hole")
//!     .sort_by(SortBy::SubmittedDate)
//!     .max_results(20);
//!
//! let report = client.search_report(&request).await?;
//! println!(
//!     "{} of {} results after {} attempt(s)",
//!     report.page.entries.len(),
//!     report.page.total_results,
//!     report.attempts
//! );
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod mcp;
pub mod parse;
pub mod query;
pub mod rate_limit;
pub mod search;
pub mod transport;
pub mod types;

// Re-export key types at the crate root.
pub use client::{ArxivClient, SearchReport};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::ClientConfig;
pub use error::{ArxivError, TransportError};
pub use parse::FeedParser;
pub use query::{QueryBuilder, QueryString};
pub use rate_limit::RateLimiter;
pub use transport::{Fetched, HttpResponse, HttpTransport, RetryPolicy, Transport, TransportClient};
pub use types::*;
