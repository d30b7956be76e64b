pub mod guardian;
pub mod newsapi;
pub mod nytimes;

pub use guardian::GuardianClient;
pub use newsapi::NewsApiClient;
pub use nytimes::NyTimesClient;

use std::time::Instant;

use tracing::{error, info, warn};

use crate::types::{AggregatorError, Article, HealthReport, HealthStatus, ProviderTag, SourceOutcome, SourceStatus};

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Wrap a live result into the outcome every client returns.
pub(crate) fn settle(
    provider: ProviderTag,
    result: Result<Vec<Article>, AggregatorError>,
    start: Instant,
) -> SourceOutcome {
    match result {
        Ok(articles) => {
            info!(%provider, "Fetched {} articles", articles.len());
            SourceOutcome::new(provider, articles, SourceStatus::Fresh, elapsed_ms(start))
        }
        Err(AggregatorError::Cancelled) => {
            info!(%provider, "Fetch cancelled");
            SourceOutcome::empty(provider, SourceStatus::Cancelled, elapsed_ms(start))
        }
        Err(e) => {
            error!(%provider, "Error fetching articles: {}", e);
            SourceOutcome::empty(provider, SourceStatus::Failed { reason: e.to_string() }, elapsed_ms(start))
        }
    }
}

pub(crate) fn skipped(provider: ProviderTag, start: Instant) -> SourceOutcome {
    warn!(%provider, "API key not set properly, skipping");
    SourceOutcome::empty(provider, SourceStatus::Skipped, elapsed_ms(start))
}

/// Turn a health probe into a report. HTTP errors surface the provider's
/// message rather than our wrapper text.
pub(crate) fn health_report(
    provider: ProviderTag,
    source_name: String,
    probe: Option<Result<HealthStatus, AggregatorError>>,
    start: Instant,
) -> HealthReport {
    let status = match probe {
        None => HealthStatus::MissingKey,
        Some(Ok(status)) => status,
        Some(Err(AggregatorError::Status { message, .. })) => HealthStatus::Error { message },
        Some(Err(e)) => HealthStatus::Error { message: e.to_string() },
    };

    if status.is_healthy() {
        info!(%provider, "Health check passed");
    } else {
        warn!(%provider, "Health check failed: {}", status.message());
    }

    HealthReport {
        provider,
        source_name,
        status,
        elapsed_ms: elapsed_ms(start),
    }
}

/// `Connected` when the payload's status field matches, else the payload's
/// message.
pub(crate) fn payload_health(status: Option<&str>, expected: &str, message: Option<String>) -> HealthStatus {
    if status == Some(expected) {
        HealthStatus::Connected
    } else {
        HealthStatus::Error {
            message: message.unwrap_or_else(|| "Unknown error".to_string()),
        }
    }
}
