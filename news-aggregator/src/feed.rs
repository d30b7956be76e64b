use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::aggregator::Aggregator;
use crate::cancel::{CancelHandle, CancelToken};
use crate::filter::FilterEngine;
use crate::ranking::PersonalizationRanker;
use crate::types::{Article, QueryFilters, SourceReport, UserPreferences};

/// Everything a front end shows after one refresh.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub generation: u64,
    pub articles: Vec<Article>,
    pub filtered: Vec<Article>,
    pub personalized: Vec<Article>,
    /// Per-source reports of the fetch behind `articles` and `filtered`.
    pub reports: Vec<SourceReport>,
    /// Per-source reports of the separate fetch behind `personalized`.
    pub personalized_reports: Vec<SourceReport>,
}

/// A long-lived view over an [`Aggregator`] that refreshes as filters or
/// preferences change.
///
/// Starting a refresh cancels the one still in flight, and a refresh that
/// was overtaken never replaces the stored snapshot, even if its responses
/// arrive last.
pub struct NewsFeed {
    aggregator: Arc<Aggregator>,
    generation: AtomicU64,
    in_flight: Mutex<Option<CancelHandle>>,
    latest: RwLock<Option<FeedSnapshot>>,
}

impl NewsFeed {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            latest: RwLock::new(None),
        }
    }

    /// Returns `None` when a newer refresh superseded this one.
    pub async fn refresh(&self, filters: &QueryFilters, preferences: &UserPreferences) -> Option<FeedSnapshot> {
        let (generation, token) = self.begin().await;

        let all = self.aggregator.fetch_all_with_report(filters, &token).await;
        if self.superseded(generation, &token) {
            debug!(generation, "Refresh superseded after first fetch");
            return None;
        }
        let filtered = FilterEngine::apply(&all.articles, filters);

        // The personalized view ranks its own fetch, not the one above.
        let fresh = self.aggregator.fetch_all_with_report(filters, &token).await;
        if self.superseded(generation, &token) {
            debug!(generation, "Refresh superseded after personalized fetch");
            return None;
        }
        let personalized = PersonalizationRanker::rank(fresh.articles, preferences);

        let snapshot = FeedSnapshot {
            generation,
            articles: all.articles,
            filtered,
            personalized,
            reports: all.reports,
            personalized_reports: fresh.reports,
        };

        let mut latest = self.latest.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        info!(
            generation,
            "Feed refreshed: {} articles, {} filtered, {} personalized",
            snapshot.articles.len(),
            snapshot.filtered.len(),
            snapshot.personalized.len()
        );
        *latest = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Cancel whatever refresh is running without starting another.
    pub async fn cancel(&self) {
        let mut in_flight = self.in_flight.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = in_flight.take() {
            handle.cancel();
        }
    }

    pub async fn latest(&self) -> Option<FeedSnapshot> {
        self.latest.read().await.clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Generation numbers are handed out under the `in_flight` lock, so the
    /// handle stored there always belongs to the newest refresh.
    async fn begin(&self) -> (u64, CancelToken) {
        let mut in_flight = self.in_flight.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = CancelHandle::new();
        let token = handle.token();
        if let Some(previous) = in_flight.replace(handle) {
            debug!(generation, "Cancelling previous refresh");
            previous.cancel();
        }
        (generation, token)
    }

    fn superseded(&self, generation: u64, token: &CancelToken) -> bool {
        token.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation
    }
}
