mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics_util::debugging::DebuggingRecorder;

use yatube::application::front_page::FrontPageService;
use yatube::application::pagination::PageNumber;
use yatube::application::repos::{CreatePostParams, PostsWriteRepo, UsersWriteRepo};
use yatube::cache::{CacheConfig, FeedCacheKey, PageCache};

use support::{InMemoryRepos, feed_service};

fn front_page(repos: &Arc<InMemoryRepos>, config: CacheConfig) -> FrontPageService {
    FrontPageService::new(feed_service(repos), Arc::new(PageCache::new(&config)))
}

async fn publish(repos: &InMemoryRepos, author_id: i64, text: &str) {
    repos
        .create_post(CreatePostParams {
            author_id,
            text: text.to_string(),
            group_id: None,
            image: None,
        })
        .await
        .expect("create post");
}

#[tokio::test]
async fn new_posts_stay_hidden_until_the_snapshot_is_invalidated() {
    let repos = InMemoryRepos::new();
    let leo = repos.create_user("leo").await.expect("user");
    publish(&repos, leo.id, "first entry").await;
    let service = front_page(&repos, CacheConfig::default());

    let rendered = service
        .get_or_render_global_feed(PageNumber::FIRST)
        .await
        .expect("render");
    assert!(!rendered.from_cache);
    assert!(rendered.html.contains("first entry"));

    publish(&repos, leo.id, "second entry").await;

    let cached = service
        .get_or_render_global_feed(PageNumber::FIRST)
        .await
        .expect("cached render");
    assert!(cached.from_cache);
    assert_eq!(cached.html, rendered.html);
    assert!(!cached.html.contains("second entry"));

    service.invalidate();

    let fresh = service
        .get_or_render_global_feed(PageNumber::FIRST)
        .await
        .expect("fresh render");
    assert!(!fresh.from_cache);
    assert!(fresh.html.contains("second entry"));
}

#[tokio::test]
async fn disabled_cache_always_renders() {
    let repos = InMemoryRepos::new();
    let leo = repos.create_user("leo").await.expect("user");
    publish(&repos, leo.id, "first entry").await;
    let service = front_page(
        &repos,
        CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        },
    );

    service
        .get_or_render_global_feed(PageNumber::FIRST)
        .await
        .expect("render");
    publish(&repos, leo.id, "second entry").await;

    let again = service
        .get_or_render_global_feed(PageNumber::FIRST)
        .await
        .expect("render");
    assert!(!again.from_cache);
    assert!(again.html.contains("second entry"));
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn requested_page_numbers_are_cached_separately() {
    let repos = InMemoryRepos::new();
    let leo = repos.create_user("leo").await.expect("user");
    publish(&repos, leo.id, "only entry").await;
    let service = front_page(&repos, CacheConfig::default());

    let first = service
        .get_or_render_global_feed(PageNumber::FIRST)
        .await
        .expect("render");
    let past_end = service
        .get_or_render_global_feed(PageNumber::new(7))
        .await
        .expect("render");

    assert!(!past_end.from_cache);
    assert_eq!(first.html, past_end.html, "page 7 clamps to page 1");
    assert_eq!(service.cache().len(), 2);
}

#[test]
fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let cache = PageCache::new(&CacheConfig {
        enabled: true,
        ttl_seconds: 20,
        capacity: 1,
    });
    let start = Instant::now();
    let first = FeedCacheKey::global(PageNumber::new(1));
    let second = FeedCacheKey::global(PageNumber::new(2));

    assert!(cache.get_at(&first, start).is_none());
    cache.insert_at(first, "one", start);
    assert!(cache.get_at(&first, start).is_some());
    cache.insert_at(second, "two", start);
    assert!(
        cache
            .get_at(&second, start + Duration::from_secs(21))
            .is_none()
    );

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in [
        "yatube_page_cache_hit_total",
        "yatube_page_cache_miss_total",
        "yatube_page_cache_evict_total",
        "yatube_page_cache_expired_total",
    ] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
