use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use interfaces::defs::{Article, ProviderTag, QueryFilters, UserPreferences};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Aggregator/1.0".to_string(),
            timeout_seconds: 30,
            max_redirects: 5,
        }
    }
}

/// How a single provider call ended. The article list alone can't tell
/// "failed" apart from "nothing matched", this can.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Live response from the provider.
    Fresh,
    /// Served from the response cache without a network call.
    Cached,
    /// Live call failed; served whatever the cache held, however old.
    StaleFallback { reason: String },
    /// No usable credential, nothing was sent.
    Skipped,
    Failed { reason: String },
    Cancelled,
}

impl SourceStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SourceStatus::Failed { .. } | SourceStatus::StaleFallback { .. } | SourceStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub provider: ProviderTag,
    pub status: SourceStatus,
    pub article_count: usize,
    pub elapsed_ms: u64,
}

/// What a source client hands back: always a list, plus how it got it.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub articles: Vec<Article>,
    pub report: SourceReport,
}

impl SourceOutcome {
    pub fn new(provider: ProviderTag, articles: Vec<Article>, status: SourceStatus, elapsed_ms: u64) -> Self {
        let article_count = articles.len();
        Self {
            articles,
            report: SourceReport {
                provider,
                status,
                article_count,
                elapsed_ms,
            },
        }
    }

    pub fn empty(provider: ProviderTag, status: SourceStatus, elapsed_ms: u64) -> Self {
        Self::new(provider, Vec::new(), status, elapsed_ms)
    }
}

/// Outcome of a minimal connectivity request to one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthStatus {
    /// No usable API key, nothing was sent.
    MissingKey,
    Connected,
    /// The provider's own error text when it gave one.
    Error { message: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Connected)
    }

    pub fn message(&self) -> &str {
        match self {
            HealthStatus::MissingKey => "API key not set",
            HealthStatus::Connected => "Connected successfully",
            HealthStatus::Error { message } => message.as_str(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub provider: ProviderTag,
    pub source_name: String,
    pub status: HealthStatus,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub batch_id: Uuid,
    pub articles: Vec<Article>,
    pub reports: Vec<SourceReport>,
}

impl AggregateResult {
    pub fn failed_providers(&self) -> Vec<ProviderTag> {
        self.reports
            .iter()
            .filter(|r| r.status.is_failure())
            .map(|r| r.provider)
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        !self.reports.is_empty() && self.reports.iter().all(|r| r.status.is_failure())
    }

    pub fn was_cancelled(&self) -> bool {
        self.reports.iter().any(|r| r.status == SourceStatus::Cancelled)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        provider: ProviderTag,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: ProviderTag },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl AggregatorError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AggregatorError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
