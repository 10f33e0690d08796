//! arXiv Atom feed parsing.
//!
//! The payload is read with quick-xml into a small element tree, then each
//! `entry` node is converted independently. An entry that cannot be turned
//! into an [`Entry`] is dropped and counted; only a document that is not
//! well-formed (or has no `feed` root) fails the whole parse.
//!
//! Elements are matched by local name, so `opensearch:totalResults` and
//! `arxiv:primary_category` are found regardless of prefix.

use crate::error::{ArxivError, Result};
use crate::types::{Author, DateDegradation, Entry, FeedPage, Link};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeSet;
use tracing::debug;

/// Stateless Atom feed parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn parse(payload: &[u8]) -> Result<FeedPage> {
        parse_feed(payload)
    }
}

/// Parse an arXiv Atom payload into a [`FeedPage`].
pub fn parse_feed(payload: &[u8]) -> Result<FeedPage> {
    let root = read_tree(payload)?;
    if root.name != "feed" {
        return Err(ArxivError::MalformedFeed(format!(
            "expected <feed> root element, found <{}>",
            root.name
        )));
    }

    let (entries, skipped_entries) =
        root.children_named("entry")
            .fold((Vec::new(), 0usize), |(mut entries, skipped), node| {
                match entry_from_node(node) {
                    Ok(entry) => {
                        entries.push(entry);
                        (entries, skipped)
                    }
                    Err(reason) => {
                        debug!(%reason, "skipping feed entry");
                        (entries, skipped + 1)
                    }
                }
            });

    Ok(FeedPage {
        total_results: root.child_u64("totalResults"),
        start_index: root.child_u64("startIndex"),
        items_per_page: root.child_u64("itemsPerPage"),
        entries,
        skipped_entries,
    })
}

/// Why a single entry was dropped.
#[derive(Debug, thiserror::Error)]
enum EntryError {
    #[error("entry has no id")]
    MissingId,
    #[error("entry {0} has no title")]
    MissingTitle(String),
}

fn entry_from_node(node: &Node) -> std::result::Result<Entry, EntryError> {
    let id = node.child_text("id").ok_or(EntryError::MissingId)?;
    let title = node
        .child_text("title")
        .ok_or_else(|| EntryError::MissingTitle(id.clone()))?;

    let (published, published_degraded) = parse_timestamp(node.child_text("published"));
    let (updated, updated_degraded) = parse_timestamp(node.child_text("updated"));

    let authors = node
        .children_named("author")
        .filter_map(|author| {
            Some(Author {
                name: author.child_text("name")?,
                affiliation: author.child_text("affiliation"),
            })
        })
        .collect();

    let links = node
        .children_named("link")
        .filter_map(|link| {
            Some(Link {
                href: link.attr("href")?,
                rel: link.attr("rel"),
                link_type: link.attr("type"),
                title: link.attr("title"),
            })
        })
        .collect();

    let categories: BTreeSet<String> = node
        .children_named("category")
        .filter_map(|c| c.attr("term"))
        .collect();

    let primary_category = node
        .children_named("primary_category")
        .find_map(|c| c.attr("term"));

    Ok(Entry {
        id,
        title,
        summary: node.child_text("summary").unwrap_or_default(),
        authors,
        links,
        published,
        updated,
        date_degradation: DateDegradation {
            published: published_degraded,
            updated: updated_degraded,
        },
        primary_category,
        categories,
        comment: node.child_text("comment"),
        journal_ref: node.child_text("journal_ref"),
        doi: node.child_text("doi"),
    })
}

/// RFC 3339 timestamp, or the epoch plus a degradation flag.
fn parse_timestamp(raw: Option<String>) -> (DateTime<Utc>, bool) {
    match raw.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(ts)) => (ts.with_timezone(&Utc), false),
        _ => (DateTime::<Utc>::UNIX_EPOCH, true),
    }
}

/// Collapse line-wrapped text into single spaces.
pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Minimal element tree ---

#[derive(Debug, Default)]
struct Node {
    /// Local name, namespace prefix stripped.
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attrs = start
            .attributes()
            .flatten()
            .map(|a| {
                let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
                let value = a
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned());
                (key, value)
            })
            .collect();
        Self {
            name,
            attrs,
            ..Self::default()
        }
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Normalised text of the first child with this name; `None` if absent or blank.
    fn child_text(&self, name: &str) -> Option<String> {
        self.children_named(name)
            .map(|c| normalize_ws(&c.text))
            .find(|t| !t.is_empty())
    }

    fn child_u64(&self, name: &str) -> u64 {
        self.child_text(name)
            .and_then(|t| t.parse().ok())
            .unwrap_or(0)
    }

    /// Trimmed attribute value; `None` if absent or blank.
    fn attr(&self, key: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn malformed(e: impl std::fmt::Display) -> ArxivError {
    ArxivError::MalformedFeed(e.to_string())
}

/// Read the whole document into a tree, rejecting anything not well-formed.
fn read_tree(payload: &[u8]) -> Result<Node> {
    let mut reader = Reader::from_reader(payload);
    reader.config_mut().check_end_names = true;

    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            malformed(format!(
                "XML error at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(malformed("content after the root element"));
                }
                stack.push(Node::from_start(&start));
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(malformed("content after the root element"));
                }
                let node = Node::from_start(&start);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without an opening tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Text(text) => {
                let content = text
                    .unescape()
                    .map(|t| t.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                match stack.last_mut() {
                    Some(node) => node.text.push_str(&content),
                    None if content.trim().is_empty() => {}
                    None => return Err(malformed("text outside the root element")),
                }
            }
            Event::CData(data) => {
                let content = String::from_utf8_lossy(&data.into_inner()).into_owned();
                match stack.last_mut() {
                    Some(node) => node.text.push_str(&content),
                    None => return Err(malformed("CDATA outside the root element")),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(malformed(format!(
            "unexpected end of document inside <{}>",
            stack.last().map(|n| n.name.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LinkKind;

    fn feed(entries: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/"
      xmlns:arxiv="http://arxiv.org/schemas/atom">
  <link href="http://arxiv.org/api/query?search_query=ti:spin" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=ti:spin</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2024-05-01T00:00:00-04:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">42</opensearch:totalResults>
  <opensearch:startIndex xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">0</opensearch:startIndex>
  <opensearch:itemsPerPage xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">2</opensearch:itemsPerPage>
{}
</feed>"#,
            entries
        )
    }

    const FULL_ENTRY: &str = r#"
  <entry>
    <id>http://arxiv.org/abs/2301.12345v2</id>
    <updated>2023-02-10T18:00:00Z</updated>
    <published>2023-01-29T17:30:00Z</published>
    <title>Room-temperature
      spintronics in   graphene</title>
    <summary>  We report
  spin transport &amp; relaxation.
    </summary>
    <author>
      <name>Ada Lovelace</name>
      <arxiv:affiliation xmlns:arxiv="http://arxiv.org/schemas/atom">Analytical Engine Lab</arxiv:affiliation>
    </author>
    <author>
      <name>Alan Turing</name>
    </author>
    <author>
      <arxiv:affiliation>Nameless Institute</arxiv:affiliation>
    </author>
    <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.1103/PhysRevB.1.1</arxiv:doi>
    <link title="doi" href="http://dx.doi.org/10.1103/PhysRevB.1.1" rel="related"/>
    <arxiv:comment xmlns:arxiv="http://arxiv.org/schemas/atom">12 pages,
      4 figures</arxiv:comment>
    <arxiv:journal_ref xmlns:arxiv="http://arxiv.org/schemas/atom">Phys. Rev. B 1, 1 (2023)</arxiv:journal_ref>
    <link href="http://arxiv.org/abs/2301.12345v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2301.12345v2" rel="related" type="application/pdf"/>
    <link rel="related"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cond-mat.mes-hall" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cond-mat.mes-hall" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cond-mat.mtrl-sci" scheme="http://arxiv.org/schemas/atom"/>
  </entry>"#;

    fn simple_entry(id: &str, title: &str) -> String {
        format!(
            "<entry><id>http://arxiv.org/abs/{id}</id><title>{title}</title>\
             <summary>s</summary><published>2020-01-01T00:00:00Z</published>\
             <updated>2020-01-02T00:00:00Z</updated></entry>"
        )
    }

    #[test]
    fn test_parse_full_entry() {
        let page = parse_feed(feed(FULL_ENTRY).as_bytes()).unwrap();
        assert_eq!(page.total_results, 42);
        assert_eq!(page.start_index, 0);
        assert_eq!(page.items_per_page, 2);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.skipped_entries, 0);

        let e = &page.entries[0];
        assert_eq!(e.id, "http://arxiv.org/abs/2301.12345v2");
        assert_eq!(e.arxiv_id(), "2301.12345v2");
        assert_eq!(e.title, "Room-temperature spintronics in graphene");
        assert_eq!(e.summary, "We report spin transport & relaxation.");
        assert_eq!(e.published.to_rfc3339(), "2023-01-29T17:30:00+00:00");
        assert_eq!(e.updated.to_rfc3339(), "2023-02-10T18:00:00+00:00");
        assert!(!e.date_degradation.any());

        assert_eq!(e.authors.len(), 2);
        assert_eq!(e.authors[0].name, "Ada Lovelace");
        assert_eq!(e.authors[0].affiliation.as_deref(), Some("Analytical Engine Lab"));
        assert_eq!(e.authors[1].name, "Alan Turing");
        assert!(e.authors[1].affiliation.is_none());

        let kinds: Vec<_> = e.links.iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, vec![LinkKind::Doi, LinkKind::Abstract, LinkKind::Pdf]);
        assert_eq!(e.links[1].link_type.as_deref(), Some("text/html"));
        assert!(e.links[0].link_type.is_none());
        assert_eq!(e.pdf_url(), "http://arxiv.org/pdf/2301.12345v2");

        assert_eq!(e.primary_category.as_deref(), Some("cond-mat.mes-hall"));
        assert_eq!(e.categories.len(), 2);
        assert!(e.categories.contains("cond-mat.mtrl-sci"));
        assert_eq!(e.comment.as_deref(), Some("12 pages, 4 figures"));
        assert_eq!(e.journal_ref.as_deref(), Some("Phys. Rev. B 1, 1 (2023)"));
        assert_eq!(e.doi.as_deref(), Some("10.1103/PhysRevB.1.1"));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let doc = feed(&format!("{}{}", FULL_ENTRY, simple_entry("1", "Second")));
        let a = FeedParser::parse(doc.as_bytes()).unwrap();
        let b = FeedParser::parse(doc.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_entries_skipped_in_order() {
        let body = [
            simple_entry("1", "One"),
            "<entry><title>No id</title></entry>".to_string(),
            simple_entry("2", "Two"),
            "<entry><id>http://arxiv.org/abs/x</id><title>   </title></entry>".to_string(),
            "<entry><id>http://arxiv.org/abs/y</id></entry>".to_string(),
            simple_entry("3", "Three"),
        ]
        .concat();
        let page = parse_feed(feed(&body).as_bytes()).unwrap();
        let titles: Vec<_> = page.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert_eq!(page.skipped_entries, 3);
    }

    #[test]
    fn test_missing_updated_degrades_not_drops() {
        let body = "<entry><id>http://arxiv.org/abs/9</id><title>Undated</title>\
                    <published>not a date</published></entry>";
        let page = parse_feed(feed(body).as_bytes()).unwrap();
        assert_eq!(page.entries.len(), 1);
        let e = &page.entries[0];
        assert_eq!(e.updated, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(e.published, DateTime::<Utc>::UNIX_EPOCH);
        assert!(e.date_degradation.updated);
        assert!(e.date_degradation.published);
        assert!(e.updated_date().is_none());
        assert_eq!(e.summary, "");
        assert!(e.authors.is_empty());
        assert!(e.links.is_empty());
        assert!(e.primary_category.is_none());
    }

    #[test]
    fn test_offset_timestamps_normalised_to_utc() {
        let body = "<entry><id>i</id><title>t</title>\
                    <published>2024-03-01T10:00:00-05:00</published></entry>";
        let page = parse_feed(feed(body).as_bytes()).unwrap();
        assert_eq!(
            page.entries[0].published.to_rfc3339(),
            "2024-03-01T15:00:00+00:00"
        );
    }

    #[test]
    fn test_missing_feed_metadata_defaults_to_zero() {
        let doc = format!(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\">{}</feed>",
            simple_entry("1", "Only")
        );
        let page = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(page.total_results, 0);
        assert_eq!(page.start_index, 0);
        assert_eq!(page.items_per_page, 0);
        assert_eq!(page.entries.len(), 1);
    }

    #[test]
    fn test_empty_feed() {
        let page = parse_feed(feed("").as_bytes()).unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.total_results, 42);
    }

    #[test]
    fn test_cdata_title() {
        let body = "<entry><id>i</id><title><![CDATA[A <b>bold</b> claim]]></title></entry>";
        let page = parse_feed(feed(body).as_bytes()).unwrap();
        assert_eq!(page.entries[0].title, "A <b>bold</b> claim");
    }

    #[test]
    fn test_not_well_formed_is_malformed() {
        for doc in [
            "",
            "   ",
            "not xml at all",
            "<feed><entry></feed>",
            "<feed><entry><id>1</id>",
            "</feed>",
            "<feed></feed><feed></feed>",
        ] {
            let err = parse_feed(doc.as_bytes()).unwrap_err();
            assert!(matches!(err, ArxivError::MalformedFeed(_)), "{:?}", doc);
        }
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let err = parse_feed(b"<html><body>Service unavailable</body></html>").unwrap_err();
        match err {
            ArxivError::MalformedFeed(msg) => assert!(msg.contains("html")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_self_closing_root() {
        let page = parse_feed(b"<feed xmlns=\"http://www.w3.org/2005/Atom\"/>").unwrap();
        assert!(page.entries.is_empty());
    }

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  a\n   b\tc  "), "a b c");
        assert_eq!(normalize_ws("\n\n"), "");
    }
}
