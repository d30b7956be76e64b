mod common;

use std::sync::Arc;
use std::time::Duration;

use news_aggregator::aggregator::sort_by_published_desc;
use news_aggregator::{
    Aggregator, CancelHandle, HealthStatus, NewsFeed, ProviderTag, QueryFilters, SourceClient, SourceStatus,
    UserPreferences,
};
use tracing::info;

use common::{article, ids, init_tracing, with_category, StubSource};

fn three_sources() -> (Arc<StubSource>, Arc<StubSource>, Arc<StubSource>) {
    let newsapi = Arc::new(
        StubSource::ok(
            ProviderTag::NewsApi,
            vec![
                article("n1", "BBC News", "2024-03-01T09:00:00Z"),
                article("n2", "Reuters", "2024-03-03T09:00:00Z"),
            ],
        )
        .with_categories(&["business", "technology"]),
    );
    let guardian = Arc::new(
        StubSource::ok(
            ProviderTag::Guardian,
            vec![with_category(article("g1", "The Guardian", "2024-03-02T09:00:00Z"), "world")],
        )
        .with_categories(&["world", "technology"]),
    );
    let nytimes = Arc::new(
        StubSource::ok(
            ProviderTag::NyTimes,
            vec![article("t1", "The New York Times", "2024-03-04T09:00:00+0000")],
        )
        .with_categories(&["Politics"]),
    );
    (newsapi, guardian, nytimes)
}

fn aggregator_over(sources: Vec<Arc<StubSource>>) -> Aggregator {
    Aggregator::new(
        sources
            .into_iter()
            .map(|s| s as Arc<dyn SourceClient>)
            .collect(),
    )
}

#[tokio::test]
async fn test_fetch_all_merges_and_sorts_newest_first() {
    init_tracing();
    let (newsapi, guardian, nytimes) = three_sources();
    let aggregator = aggregator_over(vec![newsapi, guardian, nytimes]);

    let articles = aggregator.fetch_all(&QueryFilters::default()).await;
    info!("Merged feed: {:?}", ids(&articles));
    assert_eq!(ids(&articles), vec!["t1", "n2", "g1", "n1"]);
}

#[tokio::test]
async fn test_failed_source_contributes_nothing() {
    init_tracing();
    let (newsapi, _guardian, nytimes) = three_sources();
    let broken = Arc::new(StubSource::failing(ProviderTag::Guardian, "HTTP 500"));
    let aggregator = aggregator_over(vec![newsapi, broken, nytimes]);

    let result = aggregator
        .fetch_all_with_report(&QueryFilters::default(), &CancelHandle::new().token())
        .await;

    assert_eq!(ids(&result.articles), vec!["t1", "n2", "n1"]);
    assert_eq!(result.failed_providers(), vec![ProviderTag::Guardian]);
    assert!(!result.all_failed());
    assert_eq!(result.reports.len(), 3);
    assert_eq!(result.reports[0].article_count, 2);
    assert_eq!(result.reports[1].article_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_sources_are_fetched_concurrently() {
    init_tracing();
    let delay = Duration::from_secs(1);
    let sources: Vec<Arc<StubSource>> = [
        (ProviderTag::NewsApi, "n1", "2024-03-01T09:00:00Z"),
        (ProviderTag::Guardian, "g1", "2024-03-02T09:00:00Z"),
        (ProviderTag::NyTimes, "t1", "2024-03-03T09:00:00Z"),
    ]
    .into_iter()
    .map(|(provider, id, published_at)| {
        Arc::new(StubSource::ok(provider, vec![article(id, "Wire", published_at)]).with_delay(delay))
    })
    .collect();
    let aggregator = aggregator_over(sources.clone());

    let started = tokio::time::Instant::now();
    let articles = aggregator.fetch_all(&QueryFilters::default()).await;
    let elapsed = started.elapsed();
    info!("Fan-out over {} sources took {:?}", sources.len(), elapsed);

    assert_eq!(articles.len(), 3);
    assert!(sources.iter().all(|s| s.calls() == 1));
    // Three one-second sources finish together, not one after another.
    assert!(elapsed >= delay);
    assert!(elapsed < Duration::from_millis(1500));
}

#[tokio::test]
async fn test_health_reports_each_source_in_order() {
    init_tracing();
    let skipped = StubSource {
        status: SourceStatus::Skipped,
        ..StubSource::ok(ProviderTag::NyTimes, Vec::new())
    };
    let aggregator = aggregator_over(vec![
        Arc::new(StubSource::ok(ProviderTag::NewsApi, Vec::new())),
        Arc::new(StubSource::failing(ProviderTag::Guardian, "Invalid authentication credentials")),
        Arc::new(skipped),
    ]);

    let reports = aggregator.health().await;
    let providers: Vec<ProviderTag> = reports.iter().map(|r| r.provider).collect();
    assert_eq!(providers, vec![ProviderTag::NewsApi, ProviderTag::Guardian, ProviderTag::NyTimes]);
    assert_eq!(reports[0].status, HealthStatus::Connected);
    assert_eq!(reports[1].status.message(), "Invalid authentication credentials");
    assert_eq!(reports[2].status, HealthStatus::MissingKey);
    assert_eq!(reports[2].source_name, "stub-nytimes");
}

#[tokio::test]
async fn test_all_sources_failing_yields_empty_feed() {
    init_tracing();
    let aggregator = aggregator_over(vec![
        Arc::new(StubSource::failing(ProviderTag::NewsApi, "401")),
        Arc::new(StubSource::failing(ProviderTag::Guardian, "timeout")),
        Arc::new(StubSource::failing(ProviderTag::NyTimes, "429")),
    ]);

    let result = aggregator
        .fetch_all_with_report(&QueryFilters::default(), &CancelHandle::new().token())
        .await;
    assert!(result.articles.is_empty());
    assert!(result.all_failed());
    assert!(aggregator.fetch_all(&QueryFilters::default()).await.is_empty());
}

#[tokio::test]
async fn test_all_sources_empty_is_not_an_error() {
    let aggregator = aggregator_over(vec![
        Arc::new(StubSource::ok(ProviderTag::NewsApi, Vec::new())),
        Arc::new(StubSource::ok(ProviderTag::Guardian, Vec::new())),
    ]);

    let result = aggregator
        .fetch_all_with_report(&QueryFilters::default(), &CancelHandle::new().token())
        .await;
    assert!(result.articles.is_empty());
    assert!(!result.all_failed());
    assert!(result.failed_providers().is_empty());
}

#[tokio::test]
async fn test_cancelled_batch_reports_cancelled_sources() {
    init_tracing();
    let slow = Arc::new(
        StubSource::ok(ProviderTag::NewsApi, vec![article("n1", "BBC News", "2024-03-01T09:00:00Z")])
            .with_delay(Duration::from_secs(30)),
    );
    let aggregator = aggregator_over(vec![slow]);
    let handle = CancelHandle::new();
    handle.cancel();

    let result = aggregator
        .fetch_all_with_report(&QueryFilters::default(), &handle.token())
        .await;
    assert!(result.articles.is_empty());
    assert!(result.was_cancelled());
    assert_eq!(result.reports[0].status, SourceStatus::Cancelled);
}

#[tokio::test]
async fn test_available_categories_and_sources_are_sorted_unions() {
    let (newsapi, guardian, nytimes) = three_sources();
    let aggregator = aggregator_over(vec![newsapi, guardian, nytimes]);

    assert_eq!(
        aggregator.available_categories().await,
        vec!["Politics", "business", "technology", "world"]
    );
    assert_eq!(
        aggregator.available_sources().await,
        vec!["BBC News", "Reuters", "The Guardian", "The New York Times"]
    );
}

#[test]
fn test_sort_keeps_ties_and_sinks_unparsable() {
    let mut articles = vec![
        article("bad", "X", "yesterday"),
        article("a", "X", "2024-01-01T00:00:00Z"),
        article("b", "X", "2024-01-01T00:00:00Z"),
        article("newest", "X", "2024-01-02"),
    ];
    sort_by_published_desc(&mut articles);
    assert_eq!(ids(&articles), vec!["newest", "a", "b", "bad"]);
}

#[tokio::test(start_paused = true)]
async fn test_feed_refresh_builds_filtered_and_personalized_views() {
    init_tracing();
    let (newsapi, guardian, nytimes) = three_sources();
    let feed = NewsFeed::new(Arc::new(aggregator_over(vec![newsapi.clone(), guardian, nytimes])));

    let filters = QueryFilters::default().with_categories(vec!["world".into()]);
    let preferences = UserPreferences {
        preferred_sources: vec!["Reuters".into()],
        ..Default::default()
    };

    let snapshot = feed.refresh(&filters, &preferences).await.expect("refresh completes");
    assert_eq!(snapshot.generation, 1);
    assert_eq!(ids(&snapshot.filtered), vec!["g1"]);
    assert_eq!(ids(&snapshot.personalized), vec!["n2", "t1", "g1", "n1"]);
    assert_eq!(snapshot.articles.len(), 4);
    // One fetch for the filtered view, one for the personalized view.
    assert_eq!(newsapi.calls(), 2);
    assert_eq!(snapshot.reports.len(), 3);
    assert_eq!(snapshot.personalized_reports.len(), 3);
    assert!(snapshot
        .personalized_reports
        .iter()
        .all(|r| r.status == SourceStatus::Fresh));

    let latest = feed.latest().await.expect("snapshot stored");
    assert_eq!(latest.generation, 1);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_refresh_never_replaces_newer_results() {
    init_tracing();
    let slow = Arc::new(
        StubSource::ok(ProviderTag::NewsApi, vec![article("n1", "BBC News", "2024-03-01T09:00:00Z")])
            .with_delay(Duration::from_millis(100)),
    );
    let feed = NewsFeed::new(Arc::new(aggregator_over(vec![slow.clone()])));
    let preferences = UserPreferences::default();

    let first_filters = QueryFilters::default().with_query("first");
    let second_filters = QueryFilters::default().with_query("Title");

    let first = feed.refresh(&first_filters, &preferences);
    let second = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        feed.refresh(&second_filters, &preferences).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.is_none(), "older refresh must be dropped");
    let second = second.expect("newest refresh completes");
    assert_eq!(second.generation, 2);
    assert_eq!(ids(&second.filtered), vec!["n1"]);

    let latest = feed.latest().await.expect("snapshot stored");
    assert_eq!(latest.generation, 2);
    assert_eq!(feed.current_generation(), 2);
    // Cancelled first fetch, then both fetches of the second refresh.
    assert_eq!(slow.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_feed_cancel_keeps_previous_snapshot() {
    init_tracing();
    let slow = Arc::new(
        StubSource::ok(ProviderTag::Guardian, vec![article("g1", "The Guardian", "2024-03-01T09:00:00Z")])
            .with_delay(Duration::from_millis(50)),
    );
    let feed = NewsFeed::new(Arc::new(aggregator_over(vec![slow])));
    let filters = QueryFilters::default();
    let preferences = UserPreferences::default();

    let first = feed.refresh(&filters, &preferences).await.expect("first refresh");

    let refresh = feed.refresh(&filters, &preferences);
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        feed.cancel().await;
    };
    let (cancelled, _) = tokio::join!(refresh, cancel);

    assert!(cancelled.is_none());
    let latest = feed.latest().await.expect("earlier snapshot kept");
    assert_eq!(latest.generation, first.generation);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_store_newest_snapshot() {
    init_tracing();
    let slow = Arc::new(
        StubSource::ok(ProviderTag::NewsApi, vec![article("n1", "BBC News", "2024-03-01T09:00:00Z")])
            .with_delay(Duration::from_millis(20)),
    );
    let feed = Arc::new(NewsFeed::new(Arc::new(aggregator_over(vec![slow]))));

    for round in 0..20 {
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let feed = feed.clone();
                tokio::spawn(async move {
                    feed.refresh(&QueryFilters::default(), &UserPreferences::default())
                        .await
                })
            })
            .collect();

        let mut completed = 0;
        for task in tasks {
            if task.await.expect("refresh task panicked").is_some() {
                completed += 1;
            }
        }

        // The newest refresh is never cancelled, so it always lands.
        let latest = feed.latest().await.expect("a snapshot is stored");
        assert!(completed >= 1, "round {}: every refresh was dropped", round);
        assert_eq!(latest.generation, feed.current_generation(), "round {}", round);
    }
}
