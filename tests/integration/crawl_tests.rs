//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, including checkpoint files on disk.

use spindle_crawl::config::{CheckpointConfig, Config, CrawlerConfig, UserAgentConfig};
use spindle_crawl::crawler::{crawl, CrawlEngine, CrawlEvent};
use spindle_crawl::{Checkpoint, CheckpointStore, CrawlError, FileCheckpointStore};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration checkpointing to `checkpoint_path`
fn create_test_config(checkpoint_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 4,
            fetch_timeout_ms: 500,
            checkpoint_interval: 2,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: Some("https://example.com/contact".to_string()),
        },
        checkpoint: CheckpointConfig {
            enabled: true,
            path: checkpoint_path.to_path_buf(),
        },
    }
}

fn html(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", anchors))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: &str, links: &[&str], expected_hits: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(links))
        .expect(expected_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_follows_links_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir.path().join("checkpoint.json"));

    // Every page is linked several times, in several spellings
    let absolute_a = format!("{}/a", base_url);
    mount_page(&mock_server, "/", &["/a", absolute_a.as_str(), "/b#section", "/"], 1).await;
    mount_page(&mock_server, "/a", &["/b", "/c", "mailto:owner@example.com"], 1).await;
    mount_page(&mock_server, "/b", &["/a?", "/c", "javascript:void(0)"], 1).await;
    mount_page(&mock_server, "/c", &["/", "/missing"], 1).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = crawl(&config, &base_url).await.unwrap();

    assert!(summary.drained);
    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.visited, 5);
    assert_eq!(summary.pending, 0);
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir.path().join("checkpoint.json"));

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact)",
        ))
        .respond_with(html(&[]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = crawl(&config, &mock_server.uri()).await.unwrap();
    assert_eq!(summary.fetched, 1);
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir.path().join("checkpoint.json"));

    mount_page(&mock_server, "/", &["/old"], 1).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/new"))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/docs/new", &["child"], 1).await;
    mount_page(&mock_server, "/docs/child", &[], 1).await;

    let summary = crawl(&config, &mock_server.uri()).await.unwrap();
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_slow_page_times_out_and_crawl_continues() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&temp_dir.path().join("checkpoint.json"));
    config.crawler.fetch_timeout_ms = 200;

    mount_page(&mock_server, "/", &["/slow", "/fast"], 1).await;
    mount_page(&mock_server, "/fast", &[], 1).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html(&["/never"]).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let summary = crawl(&config, &mock_server.uri()).await.unwrap();

    assert!(summary.drained);
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_checkpoint_file_written_on_completion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().unwrap();
    let checkpoint_path = temp_dir.path().join("state").join("checkpoint.json");
    let config = create_test_config(&checkpoint_path);

    mount_page(&mock_server, "/", &["/a", "/b"], 1).await;
    mount_page(&mock_server, "/a", &[], 1).await;
    mount_page(&mock_server, "/b", &[], 1).await;

    let summary = crawl(&config, &base_url).await.unwrap();
    assert!(summary.checkpoints >= 2);

    let saved = FileCheckpointStore::new(&checkpoint_path)
        .load()
        .unwrap()
        .expect("checkpoint file missing");
    let expected: HashSet<String> = ["/", "/a", "/b"]
        .iter()
        .map(|p| format!("{}{}", base_url, p))
        .collect();
    assert_eq!(saved.visited, expected);
    assert!(saved.frontier.is_empty());
    assert!(!checkpoint_path.with_file_name("checkpoint.json.tmp").exists());
}

#[tokio::test]
async fn test_resume_from_checkpoint_ignores_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().unwrap();
    let checkpoint_path = temp_dir.path().join("checkpoint.json");
    let config = create_test_config(&checkpoint_path);

    // A previous run visited / and /a, and had /b left to do
    let store = FileCheckpointStore::new(&checkpoint_path);
    store
        .snapshot(&Checkpoint::new(
            HashSet::from([format!("{}/", base_url), format!("{}/a", base_url)]),
            vec![format!("{}/b", base_url)],
        ))
        .unwrap();

    mount_page(&mock_server, "/", &[], 0).await;
    mount_page(&mock_server, "/a", &[], 0).await;
    mount_page(&mock_server, "/b", &["/", "/a", "/c"], 1).await;
    mount_page(&mock_server, "/c", &[], 1).await;

    let summary = crawl(&config, "https://unrelated.invalid/").await.unwrap();

    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.visited, 4);

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.visited.len(), 4);
    assert!(saved.frontier.is_empty());
}

#[tokio::test]
async fn test_corrupt_checkpoint_starts_from_seed() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let checkpoint_path = temp_dir.path().join("checkpoint.json");
    std::fs::write(&checkpoint_path, b"{ not json").unwrap();
    let config = create_test_config(&checkpoint_path);

    mount_page(&mock_server, "/", &["/a"], 1).await;
    mount_page(&mock_server, "/a", &[], 1).await;

    let summary = crawl(&config, &mock_server.uri()).await.unwrap();
    assert_eq!(summary.fetched, 2);

    // The corrupt file was replaced by a valid one
    assert!(FileCheckpointStore::new(&checkpoint_path)
        .load()
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_cleared_checkpoint_crawls_again() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let checkpoint_path = temp_dir.path().join("checkpoint.json");
    let config = create_test_config(&checkpoint_path);

    mount_page(&mock_server, "/", &[], 2).await;

    let first = crawl(&config, &mock_server.uri()).await.unwrap();
    assert_eq!(first.fetched, 1);

    // The seed is already visited, so nothing is fetched
    let second = crawl(&config, &mock_server.uri()).await.unwrap();
    assert_eq!(second.fetched, 0);
    assert_eq!(second.skipped, 1);

    FileCheckpointStore::new(&checkpoint_path).clear().unwrap();
    let third = crawl(&config, &mock_server.uri()).await.unwrap();
    assert_eq!(third.fetched, 1);
}

#[tokio::test]
async fn test_checkpointing_disabled_writes_nothing() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let checkpoint_path = temp_dir.path().join("checkpoint.json");
    let mut config = create_test_config(&checkpoint_path);
    config.checkpoint.enabled = false;

    mount_page(&mock_server, "/", &["/a"], 1).await;
    mount_page(&mock_server, "/a", &[], 1).await;

    let summary = crawl(&config, &mock_server.uri()).await.unwrap();
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.checkpoints, 0);
    assert!(!checkpoint_path.exists());
}

#[tokio::test]
async fn test_invalid_seed_without_checkpoint_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir.path().join("checkpoint.json"));

    let result = crawl(&config, "example.com/no-scheme").await;
    assert!(matches!(result, Err(CrawlError::InvalidSeed { .. })));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&temp_dir.path().join("checkpoint.json"));
    config.crawler.workers = 0;

    let result = CrawlEngine::from_config(&config);
    assert!(matches!(result, Err(CrawlError::Config(_))));
}

#[tokio::test]
async fn test_observer_sees_every_fetched_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir.path().join("checkpoint.json"));

    mount_page(&mock_server, "/", &["/a", "/b"], 1).await;
    mount_page(&mock_server, "/a", &["/b"], 1).await;
    mount_page(&mock_server, "/b", &[], 1).await;

    let events: Arc<Mutex<Vec<CrawlEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let engine = CrawlEngine::from_config(&config)
        .unwrap()
        .with_observer(Arc::new(move |event: CrawlEvent| {
            sink.lock().unwrap().push(event)
        }));

    engine.run(&base_url).await.unwrap();

    let events = events.lock().unwrap().clone();
    let fetched: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            CrawlEvent::UrlFetched { url } => Some(url.clone()),
            _ => None,
        })
        .collect();
    let expected: HashSet<String> = ["/", "/a", "/b"]
        .iter()
        .map(|p| format!("{}{}", base_url, p))
        .collect();
    assert_eq!(fetched, expected);
    assert_eq!(
        events.last(),
        Some(&CrawlEvent::Completed {
            fetched: 3,
            drained: true
        })
    );
}
