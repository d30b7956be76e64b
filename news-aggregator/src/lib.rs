pub mod types;
pub mod config;
pub mod cancel;
pub mod retry;
pub mod cache;
pub mod fetcher;
pub mod traits;
pub mod sources;
pub mod aggregator;
pub mod filter;
pub mod ranking;
pub mod feed;
pub mod preferences;
pub mod news_utils;

pub use types::*;
pub use config::{AggregatorConfig, ProviderConfig};
pub use cancel::{CancelHandle, CancelToken};
pub use retry::{RetryExecutor, RetryPolicy};
pub use cache::{CacheEntry, ResponseCache};
pub use fetcher::Fetcher;
pub use traits::SourceClient;
pub use sources::{GuardianClient, NewsApiClient, NyTimesClient};
pub use aggregator::Aggregator;
pub use filter::FilterEngine;
pub use ranking::PersonalizationRanker;
pub use feed::{FeedSnapshot, NewsFeed};
pub use preferences::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
