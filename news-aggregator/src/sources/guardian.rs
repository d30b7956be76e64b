use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::error;

use crate::cancel::CancelToken;
use crate::config::ProviderConfig;
use crate::fetcher::Fetcher;
use crate::news_utils::text;
use crate::sources::{health_report, payload_health, settle, skipped};
use crate::traits::SourceClient;
use crate::types::{Article, HealthReport, HealthStatus, ProviderTag, QueryFilters, Result, SourceOutcome};

const DEFAULT_PAGE_SIZE: u32 = 20;
const SHOW_FIELDS: &str = "headline,trailText,thumbnail,body,byline";
const SOURCE_NAME: &str = "The Guardian";

#[derive(Debug, Deserialize)]
struct GuardianEnvelope<T> {
    response: GuardianBody<T>,
}

#[derive(Debug, Deserialize)]
struct GuardianBody<T> {
    status: Option<String>,
    message: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GuardianArticle {
    id: String,
    section_name: Option<String>,
    web_publication_date: String,
    web_title: String,
    web_url: String,
    fields: Option<GuardianFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GuardianFields {
    thumbnail: Option<String>,
    trail_text: Option<String>,
    body: Option<String>,
    byline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GuardianSection {
    web_title: String,
}

/// content.guardianapis.com client. Ignores the `sources` filter: every
/// article is from The Guardian.
pub struct GuardianClient {
    fetcher: Fetcher,
    config: ProviderConfig,
}

impl GuardianClient {
    pub fn new(fetcher: Fetcher, config: ProviderConfig) -> Self {
        Self { fetcher, config }
    }

    fn query_params(key: &str, filters: &QueryFilters) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api-key", key.to_string()),
            ("page", filters.page.max(1).to_string()),
            ("page-size", filters.page_size.unwrap_or(DEFAULT_PAGE_SIZE).to_string()),
            ("show-fields", SHOW_FIELDS.to_string()),
        ];

        if let Some(query) = filters.active_query() {
            params.push(("q", query.to_string()));
        }
        if !filters.categories.is_empty() {
            params.push(("section", filters.categories.join("|")));
        }
        if let Some(from) = &filters.from_date {
            params.push(("from-date", from.clone()));
        }
        if let Some(to) = &filters.to_date {
            params.push(("to-date", to.clone()));
        }

        params
    }

    fn normalize(raw: GuardianArticle) -> Article {
        let fields = raw.fields.unwrap_or_default();
        Article {
            id: raw.id,
            title: raw.web_title,
            description: fields.trail_text.unwrap_or_default(),
            content: fields.body.unwrap_or_default(),
            url: raw.web_url,
            image_url: fields.thumbnail.unwrap_or_default(),
            source: SOURCE_NAME.to_string(),
            author: text::non_empty(fields.byline),
            category: text::non_empty(raw.section_name),
            published_at: raw.web_publication_date,
            provider: ProviderTag::Guardian,
        }
    }

    async fn fetch_live(&self, key: &str, filters: &QueryFilters, cancel: &CancelToken) -> Result<Vec<Article>> {
        let url = Fetcher::build_url(&self.config.base_url, "search", &Self::query_params(key, filters))?;
        let payload: GuardianEnvelope<GuardianArticle> =
            self.fetcher.get_json(ProviderTag::Guardian, url, cancel).await?;

        Ok(payload.response.results.into_iter().map(Self::normalize).collect())
    }

    async fn probe(&self, key: &str) -> Result<HealthStatus> {
        let params = [("api-key", key.to_string()), ("page-size", "1".to_string())];
        let url = Fetcher::build_url(&self.config.base_url, "search", &params)?;
        let payload: GuardianEnvelope<serde_json::Value> = self
            .fetcher
            .get_json(ProviderTag::Guardian, url, &CancelToken::never())
            .await?;

        let body = payload.response;
        Ok(payload_health(body.status.as_deref(), "ok", body.message))
    }

    async fn fetch_sections(&self, key: &str) -> Result<Vec<String>> {
        let url = Fetcher::build_url(&self.config.base_url, "sections", &[("api-key", key.to_string())])?;
        let payload: GuardianEnvelope<GuardianSection> = self
            .fetcher
            .get_json(ProviderTag::Guardian, url, &CancelToken::never())
            .await?;

        Ok(payload
            .response
            .results
            .into_iter()
            .map(|section| section.web_title)
            .filter(|title| !title.is_empty())
            .collect())
    }

    /// Section titles, usable as Guardian categories.
    pub async fn list_sections(&self) -> Vec<String> {
        let Some(key) = self.config.usable_key(ProviderTag::Guardian) else {
            return Vec::new();
        };
        match self.fetch_sections(key).await {
            Ok(sections) => sections,
            Err(e) => {
                error!("Error fetching sections from Guardian API: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SourceClient for GuardianClient {
    fn provider(&self) -> ProviderTag {
        ProviderTag::Guardian
    }

    fn source_name(&self) -> String {
        SOURCE_NAME.to_string()
    }

    async fn fetch_articles(&self, filters: &QueryFilters, cancel: &CancelToken) -> SourceOutcome {
        let start = Instant::now();
        let Some(key) = self.config.usable_key(ProviderTag::Guardian) else {
            return skipped(ProviderTag::Guardian, start);
        };

        let result = self.fetch_live(key, filters, cancel).await;
        settle(ProviderTag::Guardian, result, start)
    }

    async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let probe = match self.config.usable_key(ProviderTag::Guardian) {
            Some(key) => Some(self.probe(key).await),
            None => None,
        };
        health_report(ProviderTag::Guardian, self.source_name(), probe, start)
    }

    async fn categories(&self) -> Vec<String> {
        self.list_sections().await
    }

    async fn list_sources(&self) -> Vec<String> {
        vec![SOURCE_NAME.to_string()]
    }
}
