use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::types::{HealthReport, ProviderTag, QueryFilters, SourceOutcome};

/// A news provider the aggregator can fan out to.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn provider(&self) -> ProviderTag;

    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch articles matching whatever part of `filters` the provider
    /// understands.
    ///
    /// Never fails: errors end up as an empty (or cached) article list, with
    /// the reason in the outcome's report.
    async fn fetch_articles(&self, filters: &QueryFilters, cancel: &CancelToken) -> SourceOutcome;

    /// One minimal request to check the credential and the connection.
    /// Bypasses caching and retries.
    async fn health_check(&self) -> HealthReport;

    /// Category names this provider accepts in `QueryFilters::categories`.
    async fn categories(&self) -> Vec<String> {
        Vec::new()
    }

    /// Outlet names this provider can be filtered by.
    async fn list_sources(&self) -> Vec<String> {
        Vec::new()
    }
}
