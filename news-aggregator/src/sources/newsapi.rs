use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, warn};

use crate::cancel::CancelToken;
use crate::config::ProviderConfig;
use crate::fetcher::Fetcher;
use crate::news_utils::text;
use crate::sources::{health_report, payload_health, settle, skipped};
use crate::traits::SourceClient;
use crate::types::{Article, HealthReport, HealthStatus, ProviderTag, QueryFilters, Result, SourceOutcome};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_LISTED_SOURCES: usize = 20;

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    articles: Option<Vec<NewsApiArticle>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct NewsApiArticle {
    source: NewsApiSource,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewsApiSource {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSourcesResponse {
    #[serde(default)]
    sources: Vec<NewsApiSource>,
}

/// newsapi.org client. Understands every filter field, but only one category
/// per request.
pub struct NewsApiClient {
    fetcher: Fetcher,
    config: ProviderConfig,
}

impl NewsApiClient {
    pub fn new(fetcher: Fetcher, config: ProviderConfig) -> Self {
        Self { fetcher, config }
    }

    fn endpoint(filters: &QueryFilters) -> &'static str {
        if filters.active_query().is_some() {
            "everything"
        } else {
            "top-headlines"
        }
    }

    fn query_params(key: &str, filters: &QueryFilters) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("apiKey", key.to_string()),
            ("page", filters.page.max(1).to_string()),
            ("pageSize", filters.page_size.unwrap_or(DEFAULT_PAGE_SIZE).to_string()),
        ];

        if let Some(query) = filters.active_query() {
            params.push(("q", query.to_string()));
        }
        if !filters.sources.is_empty() {
            params.push(("sources", filters.sources.join(",")));
        }
        if let Some(category) = filters.categories.first().filter(|c| !c.is_empty()) {
            params.push(("category", category.clone()));
        }
        if let Some(from) = &filters.from_date {
            params.push(("from", from.clone()));
        }
        if let Some(to) = &filters.to_date {
            params.push(("to", to.clone()));
        }
        // top-headlines refuses `country` together with `sources`.
        if Self::endpoint(filters) == "top-headlines" && filters.sources.is_empty() {
            params.push(("country", "us".to_string()));
        }

        params
    }

    /// `index` is the article's position in the payload. Titles repeat
    /// (`[Removed]`, missing), so the slug alone can collide within a batch.
    fn normalize(index: usize, raw: NewsApiArticle, filters: &QueryFilters) -> Article {
        let title = raw.title.unwrap_or_default();
        Article {
            id: format!("newsapi-{}-{}", text::slugify_title(&title), index),
            title,
            description: raw.description.unwrap_or_default(),
            content: raw.content.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            image_url: raw.url_to_image.unwrap_or_default(),
            source: raw.source.name.unwrap_or_default(),
            author: text::non_empty(raw.author),
            category: filters.categories.first().cloned(),
            published_at: raw.published_at.unwrap_or_default(),
            provider: ProviderTag::NewsApi,
        }
    }

    async fn fetch_live(&self, key: &str, filters: &QueryFilters, cancel: &CancelToken) -> Result<Vec<Article>> {
        let params = Self::query_params(key, filters);
        let url = Fetcher::build_url(&self.config.base_url, Self::endpoint(filters), &params)?;
        let payload: NewsApiResponse = self.fetcher.get_json(ProviderTag::NewsApi, url, cancel).await?;

        let articles = match payload.articles {
            Some(articles) if payload.status == "ok" => articles,
            _ => {
                warn!("NewsAPI returned no articles or status {}", payload.status);
                return Ok(Vec::new());
            }
        };

        Ok(articles
            .into_iter()
            .enumerate()
            .map(|(index, raw)| Self::normalize(index, raw, filters))
            .collect())
    }

    async fn probe(&self, key: &str) -> Result<HealthStatus> {
        let params = [
            ("apiKey", key.to_string()),
            ("country", "us".to_string()),
            ("pageSize", "1".to_string()),
        ];
        let url = Fetcher::build_url(&self.config.base_url, "top-headlines", &params)?;
        let payload: NewsApiResponse = self
            .fetcher
            .get_json(ProviderTag::NewsApi, url, &CancelToken::never())
            .await?;

        Ok(payload_health(Some(payload.status.as_str()), "ok", payload.message))
    }

    async fn fetch_source_names(&self, key: &str) -> Result<Vec<String>> {
        let url = Fetcher::build_url(&self.config.base_url, "sources", &[("apiKey", key.to_string())])?;
        let payload: NewsApiSourcesResponse = self
            .fetcher
            .get_json(ProviderTag::NewsApi, url, &CancelToken::never())
            .await?;

        Ok(payload
            .sources
            .into_iter()
            .filter_map(|source| text::non_empty(source.name))
            .take(MAX_LISTED_SOURCES)
            .collect())
    }
}

#[async_trait]
impl SourceClient for NewsApiClient {
    fn provider(&self) -> ProviderTag {
        ProviderTag::NewsApi
    }

    fn source_name(&self) -> String {
        "NewsAPI".to_string()
    }

    async fn fetch_articles(&self, filters: &QueryFilters, cancel: &CancelToken) -> SourceOutcome {
        let start = Instant::now();
        let Some(key) = self.config.usable_key(ProviderTag::NewsApi) else {
            return skipped(ProviderTag::NewsApi, start);
        };

        let result = self.fetch_live(key, filters, cancel).await;
        settle(ProviderTag::NewsApi, result, start)
    }

    async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let probe = match self.config.usable_key(ProviderTag::NewsApi) {
            Some(key) => Some(self.probe(key).await),
            None => None,
        };
        health_report(ProviderTag::NewsApi, self.source_name(), probe, start)
    }

    async fn categories(&self) -> Vec<String> {
        ["business", "technology", "sports", "science"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    async fn list_sources(&self) -> Vec<String> {
        let Some(key) = self.config.usable_key(ProviderTag::NewsApi) else {
            return Vec::new();
        };
        match self.fetch_source_names(key).await {
            Ok(names) => names,
            Err(e) => {
                error!("Error fetching sources from NewsAPI: {}", e);
                Vec::new()
            }
        }
    }
}
