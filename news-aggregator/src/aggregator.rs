use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::config::AggregatorConfig;
use crate::fetcher::Fetcher;
use crate::news_utils::time;
use crate::sources::{GuardianClient, NewsApiClient, NyTimesClient};
use crate::traits::SourceClient;
use crate::types::{AggregateResult, Article, HealthReport, QueryFilters, Result};

/// Fans a request out to every source client at once and merges the answers.
pub struct Aggregator {
    sources: Vec<Arc<dyn SourceClient>>,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn SourceClient>>) -> Self {
        Self { sources }
    }

    /// NewsAPI, The Guardian and The New York Times, sharing one HTTP client.
    pub fn from_config(config: &AggregatorConfig) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch.clone())?;

        let nytimes = NyTimesClient::new(fetcher.clone(), config.nytimes.clone())
            .with_cache_ttl(config.nytimes_cache_ttl)
            .with_max_jitter(config.nytimes_max_jitter);

        Ok(Self::new(vec![
            Arc::new(NewsApiClient::new(fetcher.clone(), config.newsapi.clone())),
            Arc::new(GuardianClient::new(fetcher, config.guardian.clone())),
            Arc::new(nytimes),
        ]))
    }

    /// Every source's articles, newest first. Sources that fail contribute
    /// nothing; if all of them fail the result is simply empty.
    pub async fn fetch_all(&self, filters: &QueryFilters) -> Vec<Article> {
        self.fetch_all_with_report(filters, &CancelToken::never()).await.articles
    }

    /// [`Aggregator::fetch_all`] plus a report per source saying how its part
    /// of the batch was obtained.
    pub async fn fetch_all_with_report(&self, filters: &QueryFilters, cancel: &CancelToken) -> AggregateResult {
        let batch_id = Uuid::new_v4();
        info!(%batch_id, "Fetching from {} sources", self.sources.len());

        let outcomes = join_all(self.sources.iter().map(|source| source.fetch_articles(filters, cancel))).await;

        let mut articles = Vec::new();
        let mut reports = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            articles.extend(outcome.articles);
            reports.push(outcome.report);
        }
        sort_by_published_desc(&mut articles);

        let result = AggregateResult {
            batch_id,
            articles,
            reports,
        };

        if result.all_failed() {
            error!(%batch_id, "All news sources failed to load");
        }
        let distribution: Vec<String> = result
            .reports
            .iter()
            .map(|r| format!("{}={}", r.provider, r.article_count))
            .collect();
        info!(
            %batch_id,
            "Article sources distribution: {} (total {})",
            distribution.join(", "),
            result.articles.len()
        );

        result
    }

    /// Probe every provider at once, reports in source order.
    pub async fn health(&self) -> Vec<HealthReport> {
        let reports = join_all(self.sources.iter().map(|source| source.health_check())).await;
        let healthy = reports.iter().filter(|r| r.status.is_healthy()).count();
        info!("Health check: {}/{} providers connected", healthy, reports.len());
        reports
    }

    /// Union of every source's categories, sorted.
    pub async fn available_categories(&self) -> Vec<String> {
        let lists = join_all(self.sources.iter().map(|source| source.categories())).await;
        lists.into_iter().flatten().collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Union of every source's outlet names, sorted.
    pub async fn available_sources(&self) -> Vec<String> {
        let lists = join_all(self.sources.iter().map(|source| source.list_sources())).await;
        lists.into_iter().flatten().collect::<BTreeSet<_>>().into_iter().collect()
    }
}

/// Newest first. Unparsable timestamps sink to the end; equal timestamps keep
/// their order.
pub fn sort_by_published_desc(articles: &mut [Article]) {
    articles.sort_by_cached_key(|article| Reverse(time::parse_timestamp(&article.published_at)));
}
