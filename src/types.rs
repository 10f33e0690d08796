//! Public types for the arXiv client.
//!
//! Search requests on the way in, feed pages on the way out. Optional
//! sub-fields of the feed are modelled as `Option`, never as sentinel
//! strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Largest `max_results` arXiv honours in a single call.
pub const MAX_RESULTS_CAP: u32 = 2000;

/// Page size used when a request does not say otherwise.
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Metadata field a search term is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    All,
    Title,
    Author,
    Abstract,
    Comment,
    JournalRef,
    Category,
    ReportNumber,
}

impl SearchField {
    /// arXiv query prefix.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Title => "ti",
            Self::Author => "au",
            Self::Abstract => "abs",
            Self::Comment => "co",
            Self::JournalRef => "jr",
            Self::Category => "cat",
            Self::ReportNumber => "rn",
        }
    }

    /// Parse a prefix or a field name (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(Self::All),
            "ti" | "title" => Some(Self::Title),
            "au" | "author" => Some(Self::Author),
            "abs" | "abstract" => Some(Self::Abstract),
            "co" | "comment" => Some(Self::Comment),
            "jr" | "journal" | "journal_ref" => Some(Self::JournalRef),
            "cat" | "category" => Some(Self::Category),
            "rn" | "report" | "report_number" => Some(Self::ReportNumber),
            _ => None,
        }
    }
}

impl std::fmt::Display for SearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Boolean operator joining a term to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    #[default]
    And,
    Or,
    AndNot,
}

impl BooleanOp {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::AndNot => "ANDNOT",
        }
    }
}

impl std::fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Sort key for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::LastUpdatedDate => "lastUpdatedDate",
            Self::SubmittedDate => "submittedDate",
        }
    }

    /// Parse from string (case-insensitive, accepts snake_case too).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "").as_str() {
            "relevance" => Some(Self::Relevance),
            "lastupdateddate" | "updated" => Some(Self::LastUpdatedDate),
            "submitteddate" | "submitted" => Some(Self::SubmittedDate),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Ascending),
            "desc" | "descending" => Some(Self::Descending),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// One field-qualified term of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub field: SearchField,
    pub term: String,
    /// Operator joining this term to the previous one. Ignored on the first term.
    #[serde(default)]
    pub op: BooleanOp,
}

impl SearchTerm {
    pub fn new(field: SearchField, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
            op: BooleanOp::And,
        }
    }

    pub fn with_op(mut self, op: BooleanOp) -> Self {
        self.op = op;
        self
    }
}

/// A structured search against the arXiv API.
///
/// # Example
///
/// ```
/// use arxiv_client::{SearchRequest, SortBy};
///
/// let request = SearchRequest::new()
///     .title("spintronics")
///     .and_not()
///     .category("cond-mat.mtrl-sci")
///     .max_results(5)
///     .sort_by(SortBy::SubmittedDate);
/// assert_eq!(request.terms.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Ordered field-qualified terms.
    pub terms: Vec<SearchTerm>,
    /// Offset of the first result.
    pub start: u32,
    /// Page size; clamped to [`MAX_RESULTS_CAP`] when the query is built.
    pub max_results: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    #[serde(skip)]
    pending_op: BooleanOp,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            terms: Vec::new(),
            start: 0,
            max_results: DEFAULT_MAX_RESULTS,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            pending_op: BooleanOp::And,
        }
    }
}

impl SearchRequest {
    /// Create an empty request with default paging and sorting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field request, the shape behind the `search_by_*` helpers.
    pub fn single(field: SearchField, term: impl Into<String>, max_results: u32) -> Self {
        Self::new().field(field, term).max_results(max_results)
    }

    pub fn by_title(term: impl Into<String>, max_results: u32) -> Self {
        Self::single(SearchField::Title, term, max_results)
    }

    pub fn by_author(name: impl Into<String>, max_results: u32) -> Self {
        Self::single(SearchField::Author, name, max_results)
    }

    pub fn by_abstract(term: impl Into<String>, max_results: u32) -> Self {
        Self::single(SearchField::Abstract, term, max_results)
    }

    pub fn by_category(category: impl Into<String>, max_results: u32) -> Self {
        Self::single(SearchField::Category, category, max_results)
    }

    pub fn by_all(term: impl Into<String>, max_results: u32) -> Self {
        Self::single(SearchField::All, term, max_results)
    }

    /// Append a term joined by the pending operator (AND unless changed).
    pub fn field(mut self, field: SearchField, term: impl Into<String>) -> Self {
        let op = std::mem::take(&mut self.pending_op);
        self.terms.push(SearchTerm::new(field, term).with_op(op));
        self
    }

    /// Append a prebuilt term as-is.
    pub fn push(mut self, term: SearchTerm) -> Self {
        self.terms.push(term);
        self
    }

    pub fn all(self, term: impl Into<String>) -> Self {
        self.field(SearchField::All, term)
    }

    pub fn title(self, term: impl Into<String>) -> Self {
        self.field(SearchField::Title, term)
    }

    pub fn author(self, name: impl Into<String>) -> Self {
        self.field(SearchField::Author, name)
    }

    pub fn abstract_contains(self, term: impl Into<String>) -> Self {
        self.field(SearchField::Abstract, term)
    }

    pub fn comment(self, term: impl Into<String>) -> Self {
        self.field(SearchField::Comment, term)
    }

    pub fn journal_ref(self, term: impl Into<String>) -> Self {
        self.field(SearchField::JournalRef, term)
    }

    pub fn category(self, category: impl Into<String>) -> Self {
        self.field(SearchField::Category, category)
    }

    pub fn report_number(self, number: impl Into<String>) -> Self {
        self.field(SearchField::ReportNumber, number)
    }

    /// Join the next term with AND.
    pub fn and(mut self) -> Self {
        self.pending_op = BooleanOp::And;
        self
    }

    /// Join the next term with OR.
    pub fn or(mut self) -> Self {
        self.pending_op = BooleanOp::Or;
        self
    }

    /// Exclude the next term (ANDNOT).
    pub fn and_not(mut self) -> Self {
        self.pending_op = BooleanOp::AndNot;
        self
    }

    pub fn start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// `max_results` after clamping to the service cap.
    pub fn effective_max_results(&self) -> u32 {
        self.max_results.min(MAX_RESULTS_CAP)
    }
}

/// An author of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub affiliation: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
        }
    }
}

/// A link attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    pub title: Option<String>,
}

/// What a [`Link`] points at, judged from its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// Abstract landing page (`rel="alternate"`).
    Abstract,
    /// Full-text PDF.
    Pdf,
    /// Publisher DOI resolver.
    Doi,
    Other,
}

impl Link {
    pub fn kind(&self) -> LinkKind {
        let title = self.title.as_deref().map(str::to_lowercase);
        if self.link_type.as_deref() == Some("application/pdf") || title.as_deref() == Some("pdf")
        {
            LinkKind::Pdf
        } else if title.as_deref() == Some("doi") {
            LinkKind::Doi
        } else if self.rel.as_deref() == Some("alternate") {
            LinkKind::Abstract
        } else {
            LinkKind::Other
        }
    }
}

/// Which entry timestamps fell back to the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateDegradation {
    pub published: bool,
    pub updated: bool,
}

impl DateDegradation {
    pub fn any(&self) -> bool {
        self.published || self.updated
    }
}

/// One paper from an arXiv result feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Abs URL identifying the paper (e.g. `http://arxiv.org/abs/2301.12345v1`).
    pub id: String,
    pub title: String,
    /// Abstract text.
    pub summary: String,
    pub authors: Vec<Author>,
    /// Links in document order.
    pub links: Vec<Link>,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub date_degradation: DateDegradation,
    pub primary_category: Option<String>,
    pub categories: BTreeSet<String>,
    /// Author comment (page counts, conference, ...).
    pub comment: Option<String>,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
}

impl Entry {
    /// Short arXiv identifier taken from the abs URL, version included.
    pub fn arxiv_id(&self) -> &str {
        match self.id.rfind("/abs/") {
            Some(pos) => self.id[pos + "/abs/".len()..].trim_matches('/'),
            None => self.id.as_str(),
        }
    }

    /// Abstract page URL.
    pub fn abs_url(&self) -> String {
        self.links
            .iter()
            .find(|l| l.kind() == LinkKind::Abstract)
            .map(|l| l.href.clone())
            .unwrap_or_else(|| format!("https://arxiv.org/abs/{}", self.arxiv_id()))
    }

    /// PDF URL from the feed, or derived from the identifier.
    pub fn pdf_url(&self) -> String {
        self.links
            .iter()
            .find(|l| l.kind() == LinkKind::Pdf)
            .map(|l| l.href.clone())
            .unwrap_or_else(|| format!("https://arxiv.org/pdf/{}", self.arxiv_id()))
    }

    /// Author names joined for display.
    pub fn formatted_authors(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Publication timestamp, or `None` if the feed's value was unusable.
    pub fn published_date(&self) -> Option<DateTime<Utc>> {
        (!self.date_degradation.published).then_some(self.published)
    }

    /// Last-updated timestamp, or `None` if the feed's value was unusable.
    pub fn updated_date(&self) -> Option<DateTime<Utc>> {
        (!self.date_degradation.updated).then_some(self.updated)
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    /// Total matches reported by arXiv (may exceed `entries.len()`).
    pub total_results: u64,
    pub start_index: u64,
    pub items_per_page: u64,
    /// Entries in document order.
    pub entries: Vec<Entry>,
    /// Entries dropped because they lacked an id or title.
    pub skipped_entries: usize,
}

impl FeedPage {
    /// Empty page anchored at `start`.
    pub fn empty(start: u32) -> Self {
        Self {
            start_index: u64::from(start),
            ..Self::default()
        }
    }

    /// Offset of the page after this one, if arXiv reports more results.
    pub fn next_start(&self) -> Option<u64> {
        let next = self.start_index + self.entries.len() as u64 + self.skipped_entries as u64;
        (next < self.total_results && next > self.start_index).then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str, rel: Option<&str>, ty: Option<&str>, title: Option<&str>) -> Link {
        Link {
            href: href.to_string(),
            rel: rel.map(String::from),
            link_type: ty.map(String::from),
            title: title.map(String::from),
        }
    }

    fn entry_with_links(id: &str, links: Vec<Link>) -> Entry {
        Entry {
            id: id.to_string(),
            title: "T".to_string(),
            summary: String::new(),
            authors: vec![Author::new("Ada Lovelace"), Author::new("Alan Turing")],
            links,
            published: DateTime::<Utc>::UNIX_EPOCH,
            updated: DateTime::<Utc>::UNIX_EPOCH,
            date_degradation: DateDegradation {
                published: false,
                updated: true,
            },
            primary_category: None,
            categories: BTreeSet::new(),
            comment: None,
            journal_ref: None,
            doi: None,
        }
    }

    #[test]
    fn test_fluent_request_ops() {
        let req = SearchRequest::new()
            .title("a")
            .or()
            .author("b")
            .and_not()
            .category("c")
            .abstract_contains("d");
        let ops: Vec<_> = req.terms.iter().map(|t| t.op).collect();
        assert_eq!(
            ops,
            vec![BooleanOp::And, BooleanOp::Or, BooleanOp::AndNot, BooleanOp::And]
        );
    }

    #[test]
    fn test_request_defaults() {
        let req = SearchRequest::new();
        assert_eq!(req.start, 0);
        assert_eq!(req.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(req.sort_by, SortBy::Relevance);
        assert_eq!(req.sort_order, SortOrder::Descending);
    }

    #[test]
    fn test_effective_max_results_clamped() {
        assert_eq!(SearchRequest::by_title("x", 50_000).effective_max_results(), MAX_RESULTS_CAP);
        assert_eq!(SearchRequest::by_title("x", 7).effective_max_results(), 7);
    }

    #[test]
    fn test_link_kind() {
        assert_eq!(
            link("http://arxiv.org/abs/1", Some("alternate"), Some("text/html"), None).kind(),
            LinkKind::Abstract
        );
        assert_eq!(
            link("http://arxiv.org/pdf/1", Some("related"), Some("application/pdf"), Some("pdf"))
                .kind(),
            LinkKind::Pdf
        );
        assert_eq!(
            link("http://dx.doi.org/10.1/x", Some("related"), None, Some("doi")).kind(),
            LinkKind::Doi
        );
        assert_eq!(link("http://x", None, None, None).kind(), LinkKind::Other);
    }

    #[test]
    fn test_entry_helpers() {
        let e = entry_with_links(
            "http://arxiv.org/abs/2301.12345v2",
            vec![link(
                "http://arxiv.org/pdf/2301.12345v2",
                Some("related"),
                Some("application/pdf"),
                Some("pdf"),
            )],
        );
        assert_eq!(e.arxiv_id(), "2301.12345v2");
        assert_eq!(e.pdf_url(), "http://arxiv.org/pdf/2301.12345v2");
        assert_eq!(e.abs_url(), "https://arxiv.org/abs/2301.12345v2");
        assert_eq!(e.formatted_authors(), "Ada Lovelace, Alan Turing");
        assert!(e.published_date().is_some());
        assert!(e.updated_date().is_none());
    }

    #[test]
    fn test_pdf_url_fallback_old_style_id() {
        let e = entry_with_links("http://arxiv.org/abs/cond-mat/0102536v1", vec![]);
        assert_eq!(e.arxiv_id(), "cond-mat/0102536v1");
        assert_eq!(e.pdf_url(), "https://arxiv.org/pdf/cond-mat/0102536v1");
    }

    #[test]
    fn test_next_start() {
        let mut page = FeedPage::empty(0);
        page.total_results = 3;
        assert_eq!(page.next_start(), None);
        page.entries.push(entry_with_links("http://arxiv.org/abs/1", vec![]));
        assert_eq!(page.next_start(), Some(1));
        page.total_results = 1;
        assert_eq!(page.next_start(), None);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(SortBy::from_str_loose("submitted_date"), Some(SortBy::SubmittedDate));
        assert_eq!(SortBy::from_str_loose("lastUpdatedDate"), Some(SortBy::LastUpdatedDate));
        assert_eq!(SortOrder::from_str_loose("asc"), Some(SortOrder::Ascending));
        assert_eq!(SortOrder::from_str_loose("sideways"), None);
        assert_eq!(SearchField::from_str_loose("ti"), Some(SearchField::Title));
    }
}
