use std::env;
use std::time::Duration;

use tracing::warn;

use crate::types::{FetchConfig, ProviderTag};

pub const NEWSAPI_BASE_URL: &str = "https://newsapi.org/v2";
pub const GUARDIAN_BASE_URL: &str = "https://content.guardianapis.com";
pub const NYTIMES_BASE_URL: &str = "https://api.nytimes.com/svc/search/v2";

/// Credential and endpoint for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl ProviderConfig {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
        }
    }

    /// The key, unless it is missing, blank, or the provider's placeholder.
    pub fn usable_key(&self, provider: ProviderTag) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != placeholder_key(provider))
    }
}

/// Sentinel values shipped in sample env files.
pub fn placeholder_key(provider: ProviderTag) -> &'static str {
    match provider {
        ProviderTag::NewsApi => "your_newsapi_key_here",
        ProviderTag::Guardian => "your_guardian_api_key_here",
        ProviderTag::NyTimes => "your_nytimes_api_key_here",
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub fetch: FetchConfig,
    pub newsapi: ProviderConfig,
    pub guardian: ProviderConfig,
    pub nytimes: ProviderConfig,
    pub nytimes_cache_ttl: Duration,
    pub nytimes_max_jitter: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            newsapi: ProviderConfig::new(None, NEWSAPI_BASE_URL),
            guardian: ProviderConfig::new(None, GUARDIAN_BASE_URL),
            nytimes: ProviderConfig::new(None, NYTIMES_BASE_URL),
            nytimes_cache_ttl: Duration::from_secs(10 * 60),
            nytimes_max_jitter: Duration::from_millis(1000),
        }
    }
}

impl AggregatorConfig {
    /// Reads keys and optional endpoint overrides from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.newsapi = provider_from_env("NEWSAPI_KEY", "NEWSAPI_BASE_URL", NEWSAPI_BASE_URL);
        config.guardian = provider_from_env("GUARDIAN_API_KEY", "GUARDIAN_BASE_URL", GUARDIAN_BASE_URL);
        config.nytimes = provider_from_env("NYTIMES_API_KEY", "NYTIMES_BASE_URL", NYTIMES_BASE_URL);

        if let Some(raw) = env_opt("NEWS_HTTP_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.fetch.timeout_seconds = secs,
                Err(_) => warn!("Ignoring NEWS_HTTP_TIMEOUT_SECS={}: not a number", raw),
            }
        }

        config
    }
}

fn provider_from_env(key_var: &str, url_var: &str, default_url: &str) -> ProviderConfig {
    ProviderConfig::new(env_opt(key_var), env_or(url_var, default_url))
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}
