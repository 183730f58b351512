//! Full cycles across both platforms.

use std::sync::Arc;

use harvest_common::{Platform, Seed, SourcesFile};
use harvest_crawler::testing::{comment, instant_retry, FailingStore, Harness, MemorySink, MockSource, ScriptedGate};
use harvest_crawler::{run_cycle, CommentSource, CrawlError, Crawler, Pacing};
use harvest_store::{Ledger, LedgerDomain};

fn sources(list: Vec<MockSource>) -> Vec<Arc<dyn CommentSource>> {
    list.into_iter()
        .map(|s| Arc::new(s) as Arc<dyn CommentSource>)
        .collect()
}

fn reddit_and_youtube() -> Vec<Arc<dyn CommentSource>> {
    sources(vec![
        MockSource::new(Platform::Reddit)
            .on_seed("rust", &["r1", "r2"])
            .on_unit("r1", vec![comment("t1_a", "reddit one")])
            .on_unit("r2", vec![comment("t1_b", "reddit two")]),
        MockSource::new(Platform::YouTube)
            .on_unit("v1", vec![comment("yt_a", "youtube one")]),
    ])
}

fn file() -> SourcesFile {
    SourcesFile {
        subreddits: vec!["rust".into()],
        single_youtube_video: "v1".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn cycle_drains_reddit_before_youtube() {
    let h = Harness::new(ScriptedGate::accept_all()).await;

    let stats = run_cycle(&h.crawler, &reddit_and_youtube(), &file()).await.unwrap();

    assert_eq!(h.sink.texts(), vec!["reddit one", "reddit two", "youtube one"]);
    let reddit = stats.for_platform(Platform::Reddit).unwrap();
    assert_eq!(reddit.units_fetched, 2);
    assert_eq!(reddit.comments_saved, 2);
    let youtube = stats.for_platform(Platform::YouTube).unwrap();
    assert_eq!(youtube.units_fetched, 1);
    assert_eq!(stats.totals().comments_saved, 3);
    assert!(stats.finished_at >= stats.started_at);
}

#[tokio::test]
async fn second_cycle_skips_everything_already_seen() {
    let h = Harness::new(ScriptedGate::accept_all()).await;
    let sources = reddit_and_youtube();

    run_cycle(&h.crawler, &sources, &file()).await.unwrap();
    let again = run_cycle(&h.crawler, &sources, &file()).await.unwrap();

    assert_eq!(h.sink.records().len(), 3);
    let totals = again.totals();
    assert_eq!(totals.units_fetched, 0);
    assert_eq!(totals.units_skipped, 3);
    assert_eq!(totals.comments_saved, 0);
}

#[tokio::test]
async fn failed_seed_does_not_stop_later_seeds() {
    let h = Harness::new(ScriptedGate::accept_all()).await;
    let sources = sources(vec![MockSource::new(Platform::Reddit)
        .failing_seed("down")
        .on_seed("up", &["r1"])
        .on_unit("r1", vec![comment("t1_a", "still here")])]);
    let file = SourcesFile {
        subreddits: vec!["down".into(), "/r/up".into()],
        ..Default::default()
    };

    let stats = run_cycle(&h.crawler, &sources, &file).await.unwrap();

    let reddit = stats.for_platform(Platform::Reddit).unwrap();
    assert_eq!(reddit.seeds_failed, 1);
    assert_eq!(reddit.units_fetched, 1);
    assert_eq!(h.sink.texts(), vec!["still here"]);
}

#[tokio::test]
async fn failing_reddit_does_not_prevent_youtube() {
    let h = Harness::new(ScriptedGate::accept_all()).await;
    // r1 has no registered comments, so every fetch fails.
    let sources = sources(vec![
        MockSource::new(Platform::Reddit).on_seed("rust", &["r1"]),
        MockSource::new(Platform::YouTube).on_unit("v1", vec![comment("yt_a", "youtube one")]),
    ]);

    let stats = run_cycle(&h.crawler, &sources, &file()).await.unwrap();

    let reddit = stats.for_platform(Platform::Reddit).unwrap();
    assert_eq!(reddit.units_failed, 1);
    assert!(!h.store.has(LedgerDomain::Units, "r1").await.unwrap());
    assert_eq!(h.sink.texts(), vec!["youtube one"]);
}

#[tokio::test]
async fn platform_without_a_source_is_skipped() {
    let h = Harness::new(ScriptedGate::accept_all()).await;
    let sources = sources(vec![MockSource::new(Platform::Reddit)
        .on_seed("rust", &["r1"])
        .on_unit("r1", vec![comment("t1_a", "reddit one")])]);

    let stats = run_cycle(&h.crawler, &sources, &file()).await.unwrap();

    assert!(stats.for_platform(Platform::YouTube).is_none());
    assert_eq!(stats.totals().comments_saved, 1);
}

#[tokio::test]
async fn unit_listed_twice_is_crawled_once() {
    let h = Harness::new(ScriptedGate::accept_all()).await;
    let source = Arc::new(
        MockSource::new(Platform::Reddit)
            .on_seed("rust", &["r1"])
            .on_unit("r1", vec![comment("t1_a", "hello")]),
    );
    let file = SourcesFile {
        single_reddit_post: "r1".into(),
        subreddits: vec!["rust".into()],
        ..Default::default()
    };

    let stats = run_cycle(&h.crawler, &[source.clone() as Arc<dyn CommentSource>], &file)
        .await
        .unwrap();

    assert_eq!(source.fetch_count("r1"), 1);
    let reddit = stats.for_platform(Platform::Reddit).unwrap();
    assert_eq!(reddit.units_fetched, 1);
    assert_eq!(reddit.units_skipped, 1);
}

#[tokio::test]
async fn storage_failure_aborts_the_cycle() {
    let sink = Arc::new(MemorySink::new());
    let crawler = Crawler::new(
        Arc::new(FailingStore),
        Arc::new(ScriptedGate::accept_all()),
        sink.clone(),
        instant_retry(),
        Pacing::none(),
    );

    let err = run_cycle(&crawler, &reddit_and_youtube(), &file()).await.unwrap_err();

    assert!(matches!(err, CrawlError::Storage(_)));
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn seed_for_another_platform_is_counted_as_failed() {
    let h = Harness::new(ScriptedGate::accept_all()).await;
    let source = MockSource::new(Platform::Reddit).on_unit("r1", vec![comment("t1_a", "hello")]);
    let seeds = vec![
        Seed::YouTubeVideo("v1".into()),
        Seed::RedditPost("r1".into()),
    ];

    let stats = h.crawler.crawl_source(&source, &seeds).await.unwrap();

    assert_eq!(stats.seeds_failed, 1);
    assert_eq!(stats.units_fetched, 1);
    assert_eq!(source.fetches(), vec!["r1".to_string()]);
}
