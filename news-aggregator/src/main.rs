use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use news_aggregator::news_utils::text;
use news_aggregator::{
    Aggregator, AggregatorConfig, Article, CancelToken, FilterEngine, JsonFilePreferenceStore,
    PersonalizationRanker, PreferenceStore, QueryFilters, SourceReport,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "news-aggregator", about = "Unified feed over NewsAPI, The Guardian and The New York Times")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// All articles matching the filters
    Fetch(FeedArgs),
    /// Articles ranked by saved preferences
    ForYou(FeedArgs),
    /// Sources and categories the providers offer
    Sources,
    /// Check each provider's API key and connection
    Health,
}

#[derive(Args)]
struct FeedArgs {
    #[arg(short, long)]
    query: Option<String>,
    #[arg(long = "source")]
    sources: Vec<String>,
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "author")]
    authors: Vec<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    page_size: Option<u32>,
    /// Print JSON instead of a listing
    #[arg(long)]
    json: bool,
    /// Preferences document
    #[arg(long, default_value = "preferences.json")]
    prefs: PathBuf,
}

impl FeedArgs {
    fn filters(&self) -> QueryFilters {
        let mut filters = QueryFilters::default();
        if let Some(query) = &self.query {
            filters = filters.with_query(query.clone());
        }
        filters = filters
            .with_sources(self.sources.clone())
            .with_categories(self.categories.clone())
            .with_authors(self.authors.clone())
            .with_date_range(self.from.clone(), self.to.clone())
            .with_page(self.page);
        if let Some(size) = self.page_size {
            filters = filters.with_page_size(size);
        }
        filters
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AggregatorConfig::from_env();
    let aggregator = Aggregator::from_config(&config).context("building HTTP client")?;

    match cli.command {
        Command::Fetch(args) => {
            let filters = args.filters();
            let result = aggregator.fetch_all_with_report(&filters, &CancelToken::never()).await;
            let filtered = FilterEngine::apply(&result.articles, &filters);
            print_feed(&filtered, &result.reports, args.json)?;
        }
        Command::ForYou(args) => {
            let store = JsonFilePreferenceStore::new(&args.prefs);
            let preferences = store.load().await?;
            if preferences.is_empty() {
                warn!("No preferences saved in {}, showing the unranked feed", args.prefs.display());
            }
            let result = aggregator.fetch_all_with_report(&args.filters(), &CancelToken::never()).await;
            let ranked = PersonalizationRanker::rank(result.articles, &preferences);
            print_feed(&ranked, &result.reports, args.json)?;
        }
        Command::Sources => {
            let sources = aggregator.available_sources().await;
            let categories = aggregator.available_categories().await;
            println!("Sources:");
            for source in sources {
                println!("  {}", source);
            }
            println!("Categories:");
            for category in categories {
                println!("  {}", category);
            }
        }
        Command::Health => {
            for report in aggregator.health().await {
                let mark = if report.status.is_healthy() { "ok" } else { "FAIL" };
                println!(
                    "[{}] {}: {} ({}ms)",
                    mark,
                    report.source_name,
                    report.status.message(),
                    report.elapsed_ms
                );
            }
        }
    }

    Ok(())
}

fn print_feed(articles: &[Article], reports: &[SourceReport], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(articles)?);
        return Ok(());
    }

    for report in reports {
        info!(
            "{}: {:?}, {} articles in {}ms",
            report.provider, report.status, report.article_count, report.elapsed_ms
        );
    }
    if articles.is_empty() {
        println!("No articles found. Check your API keys or loosen the filters.");
    }
    for article in articles {
        println!("[{}] {} ({})", article.published_at, article.title, article.source);
        if !article.description.is_empty() {
            println!("    {}", text::truncate(&article.description, 100));
        }
        println!("    {}", article.url);
    }
    Ok(())
}
