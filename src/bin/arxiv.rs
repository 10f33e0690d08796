//! CLI binary for the arXiv client.
//!
//! Usage: arxiv search --title "spin hall" --author Sinova --max 5

#[cfg(feature = "cli")]
mod cli {
    use arxiv_client::{ArxivClient, ArxivError, Entry, FeedPage, SearchRequest, SortBy, SortOrder};
    use clap::{Parser, Subcommand};
    use tracing_subscriber::EnvFilter;

    type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

    #[derive(Parser)]
    #[command(name = "arxiv", about = "arXiv API client", version)]
    struct Cli {
        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Search arXiv with field terms
        Search {
            /// Title phrase (repeatable)
            #[arg(long)]
            title: Vec<String>,
            /// Author name (repeatable)
            #[arg(long)]
            author: Vec<String>,
            /// Abstract phrase (repeatable)
            #[arg(long = "abstract")]
            abstract_: Vec<String>,
            /// Subject category, e.g. hep-th (repeatable)
            #[arg(long)]
            category: Vec<String>,
            /// Phrase matched against all fields (repeatable)
            #[arg(long)]
            all: Vec<String>,
            /// Join terms with OR instead of AND
            #[arg(long)]
            any: bool,
            /// Maximum results to return
            #[arg(short, long, default_value = "10")]
            max: u32,
            /// Offset of the first result
            #[arg(long, default_value = "0")]
            start: u32,
            /// Sort key (relevance, lastUpdatedDate, submittedDate)
            #[arg(short, long)]
            sort: Option<String>,
            /// Sort direction (ascending, descending)
            #[arg(short, long)]
            order: Option<String>,
        },
        /// Search paper titles
        Title {
            term: String,
            #[arg(short, long, default_value = "10")]
            max: u32,
        },
        /// Search by author
        Author {
            name: String,
            #[arg(short, long, default_value = "10")]
            max: u32,
        },
        /// Start MCP server (stdio)
        Serve,
    }

    fn init_logging() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    #[allow(clippy::too_many_arguments)]
    fn build_request(
        title: Vec<String>,
        author: Vec<String>,
        abstract_: Vec<String>,
        category: Vec<String>,
        all: Vec<String>,
        any: bool,
        max: u32,
        start: u32,
        sort: Option<String>,
        order: Option<String>,
    ) -> CliResult<SearchRequest> {
        let groups = [
            (arxiv_client::SearchField::Title, title),
            (arxiv_client::SearchField::Author, author),
            (arxiv_client::SearchField::Abstract, abstract_),
            (arxiv_client::SearchField::Category, category),
            (arxiv_client::SearchField::All, all),
        ];

        let mut request = SearchRequest::new().max_results(max).start(start);
        let mut first = true;
        for (field, terms) in groups {
            for term in terms {
                if !first {
                    request = if any { request.or() } else { request.and() };
                }
                request = request.field(field, term);
                first = false;
            }
        }

        if let Some(sort) = sort {
            let key = SortBy::from_str_loose(&sort)
                .ok_or_else(|| ArxivError::InvalidQuery(format!("unknown sort key '{}'", sort)))?;
            request = request.sort_by(key);
        }
        if let Some(order) = order {
            let dir = SortOrder::from_str_loose(&order)
                .ok_or_else(|| ArxivError::InvalidQuery(format!("unknown sort order '{}'", order)))?;
            request = request.sort_order(dir);
        }

        Ok(request)
    }

    fn print_entries_table(entries: &[Entry]) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["arXiv ID", "Published", "First Author", "Title", "Category"]);

        for entry in entries {
            let first_author = entry
                .authors
                .first()
                .map(|a| a.name.as_str())
                .unwrap_or("-");
            let published = entry
                .published_date()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let title = if entry.title.chars().count() > 60 {
                format!("{}...", entry.title.chars().take(57).collect::<String>())
            } else {
                entry.title.clone()
            };
            let category = entry.primary_category.as_deref().unwrap_or("");

            table.add_row(vec![
                entry.arxiv_id(),
                published.as_str(),
                first_author,
                title.as_str(),
                category,
            ]);
        }

        println!("{table}");
    }

    fn print_page(page: &FeedPage, output: OutputFormat) -> CliResult<()> {
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page)?),
            OutputFormat::Table => {
                println!(
                    "Showing {} of {} results:",
                    page.entries.len(),
                    page.total_results
                );
                print_entries_table(&page.entries);
                if let Some(next) = page.next_start() {
                    println!("More results available: --start {}", next);
                }
            }
        }
        Ok(())
    }

    fn print_entries(entries: &[Entry], output: OutputFormat) -> CliResult<()> {
        match output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
            OutputFormat::Table => {
                println!("Found {} results:", entries.len());
                print_entries_table(entries);
            }
        }
        Ok(())
    }

    pub async fn run() -> CliResult<()> {
        let cli = Cli::parse();
        init_logging();
        let client = ArxivClient::from_env()?;

        match cli.command {
            Commands::Search {
                title,
                author,
                abstract_,
                category,
                all,
                any,
                max,
                start,
                sort,
                order,
            } => {
                let request = build_request(
                    title, author, abstract_, category, all, any, max, start, sort, order,
                )?;
                let page = client.search(&request).await?;
                print_page(&page, cli.output)?;
            }

            Commands::Title { term, max } => {
                let entries = client.search_by_title(&term, max).await?;
                print_entries(&entries, cli.output)?;
            }

            Commands::Author { name, max } => {
                let entries = client.search_by_author(&name, max).await?;
                print_entries(&entries, cli.output)?;
            }

            Commands::Serve => {
                arxiv_client::mcp::run_server(client).await?;
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
