use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::cancel::CancelToken;
use crate::config::ProviderConfig;
use crate::fetcher::Fetcher;
use crate::news_utils::{text, time};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::sources::{elapsed_ms, health_report, payload_health, settle, skipped};
use crate::traits::SourceClient;
use crate::types::{
    AggregatorError, Article, HealthReport, HealthStatus, ProviderTag, QueryFilters, Result, SourceOutcome,
    SourceStatus,
};

const SOURCE_NAME: &str = "The New York Times";
const IMAGE_HOST: &str = "https://www.nytimes.com/";
const RESULT_LIMIT: &str = "3";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NyTimesResponse {
    response: Option<NyTimesBody>,
}

/// Just enough of a response to tell success from an API gateway fault.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NyTimesStatus {
    status: Option<String>,
    fault: Option<NyTimesFault>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NyTimesFault {
    faultstring: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NyTimesBody {
    docs: Option<Vec<NyTimesArticle>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NyTimesArticle {
    #[serde(rename = "_id")]
    id: String,
    web_url: String,
    snippet: String,
    headline: NyTimesHeadline,
    byline: Option<NyTimesByline>,
    pub_date: String,
    section_name: Option<String>,
    // An array in the classic API, an object in newer responses.
    multimedia: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NyTimesHeadline {
    main: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NyTimesByline {
    original: Option<String>,
}

/// api.nytimes.com article search client.
///
/// This provider rate-limits hard, so on top of what the other clients do it
/// keeps a one-slot response cache, waits a random moment before each call,
/// and retries 429s with exponential backoff. When the live call still
/// fails, whatever is cached is served regardless of age.
pub struct NyTimesClient {
    fetcher: Fetcher,
    config: ProviderConfig,
    cache: ResponseCache,
    cache_ttl: Duration,
    max_jitter: Duration,
    retry_policy: RetryPolicy,
}

impl NyTimesClient {
    pub fn new(fetcher: Fetcher, config: ProviderConfig) -> Self {
        Self {
            fetcher,
            config,
            cache: ResponseCache::new(),
            cache_ttl: Duration::from_secs(10 * 60),
            max_jitter: Duration::from_millis(1000),
            retry_policy: RetryPolicy::rate_limit_only(3, Duration::from_secs(5), 2.0),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// The policy's predicate is replaced: only rate limiting is ever retried here.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy.with_predicate(|err| err.is_rate_limit());
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn query_params(key: &str, filters: &QueryFilters) -> Vec<(&'static str, String)> {
        let mut params = vec![("api-key", key.to_string()), ("page", filters.page.max(1).to_string())];

        if let Some(query) = filters.active_query() {
            params.push(("q", query.to_string()));
        }
        if !filters.categories.is_empty() {
            params.push(("fq", format!("news_desk:({})", filters.categories.join(" "))));
        }
        if let Some(from) = &filters.from_date {
            params.push(("begin_date", time::compact_date(from)));
        }
        if let Some(to) = &filters.to_date {
            params.push(("end_date", time::compact_date(to)));
        }
        params.push(("limit", RESULT_LIMIT.to_string()));

        params
    }

    fn image_url(multimedia: &serde_json::Value) -> String {
        multimedia
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .find(|item| item.get("type").and_then(|t| t.as_str()) == Some("image"))
            })
            .and_then(|item| item.get("url").and_then(|u| u.as_str()))
            .map(|path| format!("{}{}", IMAGE_HOST, path))
            .unwrap_or_default()
    }

    fn normalize(raw: NyTimesArticle) -> Article {
        let image_url = Self::image_url(&raw.multimedia);
        let author = raw
            .byline
            .and_then(|b| b.original)
            .map(|original| text::strip_byline_prefix(&original));

        Article {
            id: raw.id,
            title: raw.headline.main,
            description: raw.snippet.clone(),
            // Search results carry no body, the snippet is the best we get.
            content: raw.snippet,
            url: raw.web_url,
            image_url,
            source: SOURCE_NAME.to_string(),
            author: text::non_empty(author),
            category: text::non_empty(raw.section_name),
            published_at: raw.pub_date,
            provider: ProviderTag::NyTimes,
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }

    async fn probe(&self, key: &str) -> Result<HealthStatus> {
        let params = [
            ("api-key", key.to_string()),
            ("page", "0".to_string()),
            ("fl", "headline".to_string()),
        ];
        let url = Fetcher::build_url(&self.config.base_url, "articlesearch.json", &params)?;
        let payload: NyTimesStatus = self
            .fetcher
            .get_json(ProviderTag::NyTimes, url, &CancelToken::never())
            .await?;

        let message = payload.fault.and_then(|fault| fault.faultstring);
        Ok(payload_health(payload.status.as_deref(), "OK", message))
    }

    async fn fetch_live(&self, key: &str, filters: &QueryFilters, cancel: &CancelToken) -> Result<Vec<Article>> {
        let params = Self::query_params(key, filters);
        let url = Fetcher::build_url(&self.config.base_url, "articlesearch.json", &params)?;

        cancel.sleep(self.jitter()).await?;

        let payload: NyTimesResponse = RetryExecutor::execute_until(
            || self.fetcher.get_json(ProviderTag::NyTimes, url.clone(), cancel),
            &self.retry_policy,
            cancel,
        )
        .await?;

        let docs = payload.response.and_then(|body| body.docs).unwrap_or_default();
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let articles: Vec<Article> = docs.into_iter().map(Self::normalize).collect();
        self.cache.set(articles.clone()).await;
        Ok(articles)
    }
}

#[async_trait]
impl SourceClient for NyTimesClient {
    fn provider(&self) -> ProviderTag {
        ProviderTag::NyTimes
    }

    fn source_name(&self) -> String {
        SOURCE_NAME.to_string()
    }

    async fn fetch_articles(&self, filters: &QueryFilters, cancel: &CancelToken) -> SourceOutcome {
        let start = Instant::now();

        if let Some(cached) = self.cache.fresh_data(self.cache_ttl).await {
            info!("Using cached NY Times response ({} articles)", cached.len());
            return SourceOutcome::new(ProviderTag::NyTimes, cached, SourceStatus::Cached, elapsed_ms(start));
        }

        let Some(key) = self.config.usable_key(ProviderTag::NyTimes) else {
            return skipped(ProviderTag::NyTimes, start);
        };

        match self.fetch_live(key, filters, cancel).await {
            Err(err) if !matches!(err, AggregatorError::Cancelled) => match self.cache.get().await {
                Some(entry) => {
                    warn!(
                        "NY Times fetch failed ({}), serving {} cached articles from {}",
                        err,
                        entry.data.len(),
                        entry.fetched_at
                    );
                    SourceOutcome::new(
                        ProviderTag::NyTimes,
                        entry.data,
                        SourceStatus::StaleFallback { reason: err.to_string() },
                        elapsed_ms(start),
                    )
                }
                None => settle(ProviderTag::NyTimes, Err(err), start),
            },
            result => settle(ProviderTag::NyTimes, result, start),
        }
    }

    async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let probe = match self.config.usable_key(ProviderTag::NyTimes) {
            Some(key) => Some(self.probe(key).await),
            None => None,
        };
        health_report(ProviderTag::NyTimes, self.source_name(), probe, start)
    }

    async fn categories(&self) -> Vec<String> {
        vec!["Politics".to_string(), "World".to_string()]
    }

    async fn list_sources(&self) -> Vec<String> {
        vec![SOURCE_NAME.to_string()]
    }
}
