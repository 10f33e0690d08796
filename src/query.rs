//! arXiv query string construction.
//!
//! Turns a [`SearchRequest`] into the encoded `search_query`, `start`,
//! `max_results`, `sortBy`, `sortOrder` parameters of the arXiv API.
//!
//! # Example
//!
//! ```
//! use arxiv_client::{QueryBuilder, SearchRequest};
//!
//! let request = SearchRequest::new().author("Einstein").and().title("relativity");
//! assert_eq!(
//!     QueryBuilder::search_query(&request).unwrap(),
//!     "au:\"Einstein\" AND ti:\"relativity\""
//! );
//!
//! let qs = QueryBuilder::build(&request.max_results(5)).unwrap();
//! assert_eq!(
//!     qs.as_str(),
//!     "search_query=au%3A%22Einstein%22%20AND%20ti%3A%22relativity%22\
//!      &start=0&max_results=5&sortBy=relevance&sortOrder=descending"
//! );
//! ```

use crate::error::{ArxivError, Result};
use crate::types::{SearchRequest, SearchTerm};
use url::Url;

/// Encoded query component, ready to append to the API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryString(String);

impl QueryString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Attach this query to the endpoint, replacing any existing query.
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(Some(&self.0));
        url
    }
}

impl std::fmt::Display for QueryString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for arXiv query strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the full encoded query string for a request.
    pub fn build(request: &SearchRequest) -> Result<QueryString> {
        let expression = Self::search_query(request)?;
        Ok(QueryString(format!(
            "search_query={}&start={}&max_results={}&sortBy={}&sortOrder={}",
            urlencoding::encode(&expression),
            request.start,
            request.effective_max_results(),
            request.sort_by.as_api_str(),
            request.sort_order.as_api_str(),
        )))
    }

    /// Build the unencoded boolean expression, e.g. `ti:"x" AND au:"y"`.
    pub fn search_query(request: &SearchRequest) -> Result<String> {
        if request.terms.is_empty() {
            return Err(ArxivError::InvalidQuery(
                "at least one search term is required".into(),
            ));
        }

        let mut parts = Vec::with_capacity(request.terms.len() * 2);
        for (i, term) in request.terms.iter().enumerate() {
            if i > 0 {
                parts.push(term.op.as_api_str().to_string());
            }
            parts.push(render_term(term)?);
        }
        Ok(parts.join(" "))
    }
}

fn render_term(term: &SearchTerm) -> Result<String> {
    let text = sanitize_term(&term.term);
    if text.is_empty() {
        return Err(ArxivError::InvalidQuery(format!(
            "empty term for field '{}'",
            term.field
        )));
    }
    Ok(format!("{}:\"{}\"", term.field.as_api_str(), text))
}

/// Drop embedded quotes (they would end the phrase) and collapse whitespace.
fn sanitize_term(raw: &str) -> String {
    raw.replace('"', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
