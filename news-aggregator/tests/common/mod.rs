#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use news_aggregator::{
    Article, CancelToken, HealthReport, HealthStatus, ProviderTag, QueryFilters, SourceClient, SourceOutcome,
    SourceStatus,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn article(id: &str, source: &str, published_at: &str) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Title {}", id),
        description: format!("Description {}", id),
        content: format!("Content {}", id),
        url: format!("https://example.com/{}", id),
        image_url: String::new(),
        source: source.to_string(),
        author: None,
        category: None,
        published_at: published_at.to_string(),
        provider: ProviderTag::NewsApi,
    }
}

pub fn with_category(mut article: Article, category: &str) -> Article {
    article.category = Some(category.to_string());
    article
}

pub fn with_author(mut article: Article, author: &str) -> Article {
    article.author = Some(author.to_string());
    article
}

pub fn ids(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.id.as_str()).collect()
}

/// Canned source client: returns fixed articles with a fixed status,
/// optionally after a cancellable delay.
pub struct StubSource {
    pub provider: ProviderTag,
    pub articles: Vec<Article>,
    pub status: SourceStatus,
    pub delay: Duration,
    pub categories: Vec<String>,
    pub calls: AtomicUsize,
}

impl StubSource {
    pub fn ok(provider: ProviderTag, articles: Vec<Article>) -> Self {
        Self {
            provider,
            articles,
            status: SourceStatus::Fresh,
            delay: Duration::ZERO,
            categories: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(provider: ProviderTag, reason: &str) -> Self {
        Self {
            status: SourceStatus::Failed {
                reason: reason.to_string(),
            },
            ..Self::ok(provider, Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for StubSource {
    fn provider(&self) -> ProviderTag {
        self.provider
    }

    fn source_name(&self) -> String {
        format!("stub-{}", self.provider)
    }

    async fn fetch_articles(&self, _filters: &QueryFilters, cancel: &CancelToken) -> SourceOutcome {
        let start = Instant::now();
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() && cancel.sleep(self.delay).await.is_err() {
            return SourceOutcome::empty(self.provider, SourceStatus::Cancelled, 0);
        }
        let elapsed = start.elapsed().as_millis() as u64;
        SourceOutcome::new(self.provider, self.articles.clone(), self.status.clone(), elapsed)
    }

    async fn health_check(&self) -> HealthReport {
        let status = match &self.status {
            SourceStatus::Skipped => HealthStatus::MissingKey,
            SourceStatus::Failed { reason } => HealthStatus::Error {
                message: reason.clone(),
            },
            _ => HealthStatus::Connected,
        };
        HealthReport {
            provider: self.provider,
            source_name: self.source_name(),
            status,
            elapsed_ms: 0,
        }
    }

    async fn categories(&self) -> Vec<String> {
        self.categories.clone()
    }

    async fn list_sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.articles.iter().map(|a| a.source.clone()).collect();
        names.dedup();
        names
    }
}
