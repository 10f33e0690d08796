//! Search operations.
//!
//! Covers: structured search, per-field convenience searches, and the
//! metadata-carrying [`ArxivClient::search_report`].

use crate::client::{ArxivClient, SearchReport};
use crate::error::Result;
use crate::types::{Entry, FeedPage, SearchField, SearchRequest};

impl ArxivClient {
    /// Run a structured search and return one page of results.
    ///
    /// Retries are handled internally; the page holds entries in feed order.
    pub async fn search(&self, request: &SearchRequest) -> Result<FeedPage> {
        Ok(self.execute(request).await?.page)
    }

    /// Like [`search`](Self::search), also reporting attempts and latency.
    pub async fn search_report(&self, request: &SearchRequest) -> Result<SearchReport> {
        self.execute(request).await
    }

    /// Search paper titles.
    pub async fn search_by_title(&self, term: &str, max_results: u32) -> Result<Vec<Entry>> {
        self.search_field(SearchField::Title, term, max_results)
            .await
    }

    /// Search author names.
    pub async fn search_by_author(&self, name: &str, max_results: u32) -> Result<Vec<Entry>> {
        self.search_field(SearchField::Author, name, max_results)
            .await
    }

    /// Search abstracts.
    pub async fn search_by_abstract(&self, term: &str, max_results: u32) -> Result<Vec<Entry>> {
        self.search_field(SearchField::Abstract, term, max_results)
            .await
    }

    /// List papers in a subject category, e.g. `cond-mat.mes-hall`.
    pub async fn search_by_category(
        &self,
        category: &str,
        max_results: u32,
    ) -> Result<Vec<Entry>> {
        self.search_field(SearchField::Category, category, max_results)
            .await
    }

    /// Search all fields.
    pub async fn search_all(&self, term: &str, max_results: u32) -> Result<Vec<Entry>> {
        self.search_field(SearchField::All, term, max_results).await
    }

    async fn search_field(
        &self,
        field: SearchField,
        term: &str,
        max_results: u32,
    ) -> Result<Vec<Entry>> {
        let request = SearchRequest::single(field, term, max_results);
        Ok(self.search(&request).await?.entries)
    }
}
