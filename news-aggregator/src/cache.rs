use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::types::Article;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub stored_at: Instant,
    pub fetched_at: DateTime<Utc>,
    pub data: Vec<Article>,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }
}

/// One-slot response cache owned by a single source client.
///
/// Reads on the happy path are gated by [`ResponseCache::fresh_data`]; the
/// failure path reads with [`ResponseCache::get`] and ignores age entirely.
#[derive(Debug, Default)]
pub struct ResponseCache {
    slot: RwLock<Option<CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<CacheEntry> {
        self.slot.read().await.clone()
    }

    /// Replaces whatever was cached.
    pub async fn set(&self, data: Vec<Article>) {
        debug!("Caching {} articles", data.len());
        let mut slot = self.slot.write().await;
        *slot = Some(CacheEntry {
            stored_at: Instant::now(),
            fetched_at: Utc::now(),
            data,
        });
    }

    pub async fn is_fresh(&self, max_age: Duration) -> bool {
        self.slot
            .read()
            .await
            .as_ref()
            .is_some_and(|entry| entry.age() < max_age)
    }

    /// Cached data if younger than `max_age`, checked and read under one lock.
    pub async fn fresh_data(&self, max_age: Duration) -> Option<Vec<Article>> {
        self.slot
            .read()
            .await
            .as_ref()
            .filter(|entry| entry.age() < max_age)
            .map(|entry| entry.data.clone())
    }

    pub async fn clear(&self) {
        *self.slot.write().await = None;
    }
}
