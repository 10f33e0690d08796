//! MCP (Model Context Protocol) server implementation.
//!
//! Implements the JSON-RPC 2.0 protocol over stdio, exposing arXiv search
//! tools for AI agent integration.

use crate::client::ArxivClient;
use crate::error::ArxivError;
use crate::types::{Entry, SearchField, SearchRequest, SortBy, SortOrder, DEFAULT_MAX_RESULTS};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Run the MCP server over stdin/stdout.
pub async fn run_server(client: ArxivClient) -> crate::error::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.map_err(|e| ArxivError::Config(format!("stdin error: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }

        let Some(response) = handle_message(&client, &line).await else {
            continue;
        };

        let mut out = stdout.lock();
        writeln!(out, "{}", response)
            .map_err(|e| ArxivError::Config(format!("stdout error: {}", e)))?;
        out.flush()
            .map_err(|e| ArxivError::Config(format!("stdout flush error: {}", e)))?;
    }

    Ok(())
}

/// Answer one JSON-RPC line. `None` for notifications.
pub async fn handle_message(client: &ArxivClient, line: &str) -> Option<Value> {
    let request: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Some(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": { "code": -32700, "message": format!("Parse error: {}", e) }
            }));
        }
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request["method"].as_str().unwrap_or("");
    debug!(method, "mcp request");

    let response = match method {
        "initialize" => handle_initialize(&id),
        "tools/list" => handle_tools_list(&id),
        "tools/call" => handle_tool_call(client, &id, &request["params"]).await,
        "resources/list" => handle_resources_list(&id),
        "resources/read" => handle_resource_read(&id, &request["params"]),
        m if m.starts_with("notifications/") => return None,
        _ => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("Method not found: {}", method) }
        }),
    };
    Some(response)
}

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": "arxiv-mcp",
                "version": env!("CARGO_PKG_VERSION")
            }
        }
    })
}

fn handle_tools_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": tool_definitions()
        }
    })
}

fn handle_resources_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "resources": [
                {
                    "uri": "arxiv://help",
                    "name": "arXiv Server Help",
                    "description": "How to use the arXiv search tools",
                    "mimeType": "text/markdown"
                },
                {
                    "uri": "arxiv://fields",
                    "name": "arXiv Search Fields",
                    "description": "Field prefixes, boolean operators and sort options of the arXiv API",
                    "mimeType": "text/plain"
                }
            ]
        }
    })
}

fn handle_resource_read(id: &Value, params: &Value) -> Value {
    let uri = params["uri"].as_str().unwrap_or("");
    let (content, mime) = match uri {
        "arxiv://help" => (HELP_REFERENCE, "text/markdown"),
        "arxiv://fields" => (FIELDS_REFERENCE, "text/plain"),
        _ => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32602, "message": format!("Unknown resource: {}", uri) }
            });
        }
    };

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "contents": [{
                "uri": uri,
                "mimeType": mime,
                "text": content
            }]
        }
    })
}

async fn handle_tool_call(client: &ArxivClient, id: &Value, params: &Value) -> Value {
    let tool_name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    let result = match tool_name {
        "search_arxiv_papers" => tool_search(client, args).await,
        "arxiv_search_by_title" => tool_search_field(client, SearchField::Title, args).await,
        "arxiv_search_by_author" => tool_search_field(client, SearchField::Author, args).await,
        _ => Err(ArxivError::InvalidQuery(format!("unknown tool '{}'", tool_name))),
    };

    match result {
        Ok(content) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": content }]
            }
        }),
        Err(e) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": format!("Error when searching for papers: {}", e) }],
                "isError": true
            }
        }),
    }
}

// --- Tool implementations ---

async fn tool_search(client: &ArxivClient, args: &Value) -> Result<String, ArxivError> {
    let query = required_str(args, "query")?;
    let mut request = keyword_request(query)
        .max_results(max_results_arg(args))
        .start(args["start"].as_u64().unwrap_or(0).min(u64::from(u32::MAX)) as u32);

    if let Some(sort) = args["sort_by"].as_str() {
        let sort = SortBy::from_str_loose(sort)
            .ok_or_else(|| ArxivError::InvalidQuery(format!("unknown sort_by '{}'", sort)))?;
        request = request.sort_by(sort);
    }
    if let Some(order) = args["sort_order"].as_str() {
        let order = SortOrder::from_str_loose(order)
            .ok_or_else(|| ArxivError::InvalidQuery(format!("unknown sort_order '{}'", order)))?;
        request = request.sort_order(order);
    }

    let page = client.search(&request).await?;
    Ok(format_results(query, &page.entries))
}

async fn tool_search_field(
    client: &ArxivClient,
    field: SearchField,
    args: &Value,
) -> Result<String, ArxivError> {
    let term = required_str(args, "term")?;
    let request = SearchRequest::single(field, term, max_results_arg(args));
    let page = client.search(&request).await?;
    Ok(format_results(term, &page.entries))
}

/// One `all:` term per whitespace-separated keyword, joined with AND.
fn keyword_request(query: &str) -> SearchRequest {
    query
        .split_whitespace()
        .fold(SearchRequest::new(), |request, word| {
            if request.terms.is_empty() {
                request.all(word)
            } else {
                request.and().all(word)
            }
        })
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ArxivError> {
    args[key]
        .as_str()
        .ok_or_else(|| ArxivError::InvalidQuery(format!("'{}' parameter required", key)))
}

fn max_results_arg(args: &Value) -> u32 {
    args["max_results"]
        .as_u64()
        .map(|n| n.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(DEFAULT_MAX_RESULTS)
}

// --- Formatting ---

/// Render entries as the markdown listing returned to the agent.
pub fn format_results(query: &str, entries: &[Entry]) -> String {
    if entries.is_empty() {
        return format!("No papers found for the search: '{}'", query);
    }

    let papers: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let published = entry
                .published_date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "### {}. {}\n**Authors:** {}\n**Publication date:** {}\n**Link:** {}\n**Abstract:** {}\n",
                i + 1,
                entry.title,
                entry.formatted_authors(),
                published,
                entry.pdf_url(),
                entry.summary,
            )
        })
        .collect();

    format!(
        "# Search results for: '{}'\n\n{}",
        query,
        papers.join("\n\n")
    )
}

fn tool_definitions() -> Value {
    let annotations = json!({
        "readOnlyHint": true,
        "destructiveHint": false,
        "idempotentHint": true,
        "openWorldHint": true
    });

    json!([
        {
            "name": "search_arxiv_papers",
            "description": "Search arXiv across all fields (title, authors, abstract, categories) and return the most relevant papers. Every keyword must match.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search terms (keywords, author names, categories)" },
                    "max_results": { "type": "integer", "description": "Max results (default 10, capped at 2000)", "default": 10 },
                    "start": { "type": "integer", "description": "Starting index for pagination (default 0)", "default": 0 },
                    "sort_by": { "type": "string", "enum": ["relevance", "lastUpdatedDate", "submittedDate"] },
                    "sort_order": { "type": "string", "enum": ["ascending", "descending"] }
                },
                "required": ["query"]
            },
            "annotations": annotations.clone()
        },
        {
            "name": "arxiv_search_by_title",
            "description": "Search arXiv paper titles for a phrase.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "term": { "type": "string", "description": "Title phrase" },
                    "max_results": { "type": "integer", "description": "Max results (default 10)", "default": 10 }
                },
                "required": ["term"]
            },
            "annotations": annotations.clone()
        },
        {
            "name": "arxiv_search_by_author",
            "description": "Search arXiv by author name.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "term": { "type": "string", "description": "Author name (e.g., 'Hawking')" },
                    "max_results": { "type": "integer", "description": "Max results (default 10)", "default": 10 }
                },
                "required": ["term"]
            },
            "annotations": annotations.clone()
        }
    ])
}

// --- Reference content ---

const HELP_REFERENCE: &str = r#"# arXiv Server Help

This MCP server gives you access to scientific papers on arXiv.

## Available tools

### search_arxiv_papers

Searches every field of arXiv and returns the most relevant results.
Each whitespace-separated keyword must match somewhere in the paper.

Parameters:
- query: search terms (keywords, authors, categories)
- max_results: maximum number of results (default 10)
- start: offset for pagination
- sort_by: relevance, lastUpdatedDate or submittedDate
- sort_order: ascending or descending

### arxiv_search_by_title / arxiv_search_by_author

Search a single field. Parameters: term, max_results.

## Tips

- Use specific keywords for more accurate results
- Combine author names with topics
- Requests are paced to one every three seconds
"#;

const FIELDS_REFERENCE: &str = r#"arXiv Search Fields
===================

Field prefixes:
  ti   - Title
  au   - Author
  abs  - Abstract
  co   - Comment
  jr   - Journal reference
  cat  - Subject category (e.g., cat:"hep-th")
  rn   - Report number
  all  - All of the above

Boolean operators:
  AND, OR, ANDNOT

Sort options:
  sortBy:    relevance, lastUpdatedDate, submittedDate
  sortOrder: ascending, descending

Paging:
  start        - zero-based offset
  max_results  - page size (capped at 2000)
"#;
