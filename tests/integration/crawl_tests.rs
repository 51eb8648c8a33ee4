//! Integration tests for the crawler
//!
//! Most tests drive the coordinator over an in-memory site graph so the crawl
//! order and outcome are fully determined. One test runs the whole cycle
//! against a wiremock server with the real HTTP transport.

use async_trait::async_trait;
use site_archiver::config::{Config, CrawlerConfig, OutputConfig, TrackingConfig, UserAgentConfig};
use site_archiver::crawler::{
    Coordinator, CrawlOptions, HttpTransport, TransportError, TransportResponse,
};
use site_archiver::output::extract_statistics;
use site_archiver::storage::{SqliteStorage, Storage};
use site_archiver::{ArchiverError, CrawlState};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An in-memory site: `host + path` to (status, body)
///
/// Every request is logged so tests can check nothing is fetched twice.
struct FakeSite {
    pages: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(pages: &[(&str, u16, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(key, status, body)| (key.to_string(), (*status, body.to_string())))
                .collect(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self, key: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|requested| requested.as_str() == key)
            .count()
    }
}

#[async_trait]
impl HttpTransport for FakeSite {
    async fn get(&self, url: &Url) -> Result<TransportResponse, TransportError> {
        let key = format!("{}{}", url.host_str().unwrap_or_default(), url.path());
        self.requests.lock().unwrap().push(key.clone());

        // Let other workers interleave
        tokio::task::yield_now().await;

        let (status, body) = self
            .pages
            .get(&key)
            .cloned()
            .unwrap_or((404, String::new()));

        Ok(TransportResponse {
            status,
            final_url: url.to_string(),
            body,
        })
    }
}

/// The graph most tests crawl
///
/// Reachable in-domain pages: `/`, `/a`, `/b`, `/c`, `/d` and
/// `blog.site.test/post`. `/missing` is linked but returns 404, `/orphan` is
/// never linked.
fn site_graph() -> Arc<FakeSite> {
    FakeSite::new(&[
        (
            "site.test/",
            200,
            r#"<html><body>
                <a href="/a">A</a>
                <a href="/b">B</a>
                <a href="https://external.test/">External</a>
                <a href="mailto:team@site.test">Mail</a>
            </body></html>"#,
        ),
        (
            "site.test/a",
            200,
            r#"<a href="/c">C</a><a href="/">Home</a><a href="/a#section">Self</a>"#,
        ),
        (
            "site.test/b",
            200,
            r#"<a href="c">C</a><a href="/d?utm_source=newsletter">D</a>"#,
        ),
        (
            "site.test/c",
            200,
            r#"<a href="https://blog.site.test/post">Blog</a><a href="/a/">A again</a>"#,
        ),
        ("site.test/d", 200, r#"<a href="/missing">Broken</a>"#),
        ("blog.site.test/post", 200, r#"<a href="https://site.test/">Home</a>"#),
        ("site.test/orphan", 200, "<p>Nobody links here</p>"),
        ("external.test/", 200, "<p>Elsewhere</p>"),
    ])
}

fn full_reachable_set() -> BTreeSet<String> {
    [
        "https://site.test",
        "https://site.test/a",
        "https://site.test/b",
        "https://site.test/c",
        "https://site.test/d",
        "https://blog.site.test/post",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Creates a test configuration writing under `dir`
fn create_test_config(dir: &Path, max_pages: u32, workers: u32) -> Config {
    Config {
        seeds: vec!["https://site.test/".to_string()],
        crawler: CrawlerConfig {
            max_pages,
            workers,
            request_timeout_secs: 5,
            canonical_scheme: "https".to_string(),
            max_duration_secs: None,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        tracking: TrackingConfig::default(),
        output: OutputConfig {
            database_path: dir.join("crawl.db").display().to_string(),
            archive_dir: dir.join("html_pages").display().to_string(),
            text_dir: dir.join("text_pages").display().to_string(),
        },
    }
}

async fn crawl(config: Config, site: Arc<FakeSite>) -> site_archiver::crawler::CrawlReport {
    Coordinator::with_transport(config, CrawlOptions::default(), site)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed")
}

fn visited_urls(dir: &Path) -> BTreeSet<String> {
    let storage = SqliteStorage::new(&dir.join("crawl.db")).expect("Failed to open database");
    storage
        .load_visited()
        .expect("Failed to load visited log")
        .into_iter()
        .map(|record| record.url)
        .collect()
}

fn archived_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = std::fs::read_dir(dir.join("html_pages"))
        .map(|entries| {
            entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

#[tokio::test]
async fn test_two_page_site_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::new(&[
        (
            "site.test/",
            200,
            r#"<html><body><a href="/about">About</a><a href="https://external.test/">Out</a></body></html>"#,
        ),
        ("site.test/about", 200, "<html><body><p>About us</p></body></html>"),
    ]);

    let report = crawl(create_test_config(dir.path(), 10, 1), site.clone()).await;

    assert_eq!(report.state, CrawlState::Exhausted);
    assert_eq!(
        visited_urls(dir.path()),
        ["https://site.test", "https://site.test/about"]
            .iter()
            .map(|s| s.to_string())
            .collect::<BTreeSet<_>>()
    );
    assert_eq!(
        archived_files(dir.path()),
        vec!["site.test.html", "site.test_about.html"]
    );
    assert_eq!(site.request_count("external.test/"), 0);

    let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
    for record in storage.load_visited().unwrap() {
        assert!(!record.url.contains("external.test"));
        assert!(!record.html_file_path.contains("external.test"));
        assert!(Path::new(&record.html_file_path).exists());
    }
}

#[tokio::test]
async fn test_exhausts_full_reachable_set() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_graph();

    let report = crawl(create_test_config(dir.path(), 100, 1), site.clone()).await;

    assert_eq!(report.state, CrawlState::Exhausted);
    assert_eq!(report.pages_visited, 6);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.pending, 0);
    assert_eq!(visited_urls(dir.path()), full_reachable_set());
    assert_eq!(archived_files(dir.path()).len(), 6);

    // Domain scoping
    assert_eq!(site.request_count("external.test/"), 0);
    assert_eq!(site.request_count("site.test/orphan"), 0);
}

#[tokio::test]
async fn test_breadth_first_order_with_one_worker() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_graph();

    crawl(create_test_config(dir.path(), 100, 1), site.clone()).await;

    let requests = site.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![
            "site.test/",
            "site.test/a",
            "site.test/b",
            "site.test/c",
            "site.test/d",
            "blog.site.test/post",
            "site.test/missing",
        ]
    );
}

#[tokio::test]
async fn test_saturation_visits_exactly_k() {
    let dir = tempfile::tempdir().unwrap();

    let report = crawl(create_test_config(dir.path(), 3, 1), site_graph()).await;

    assert_eq!(report.state, CrawlState::Saturated);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(
        visited_urls(dir.path()),
        ["https://site.test", "https://site.test/a", "https://site.test/b"]
            .iter()
            .map(|s| s.to_string())
            .collect::<BTreeSet<_>>()
    );

    let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
    assert_eq!(
        storage.load_pending().unwrap(),
        Some(vec![
            "https://site.test/c".to_string(),
            "https://site.test/d".to_string()
        ])
    );
}

#[tokio::test]
async fn test_saturation_holds_with_many_workers() {
    for k in [1, 2, 4, 5] {
        let dir = tempfile::tempdir().unwrap();
        let report = crawl(create_test_config(dir.path(), k, 8), site_graph()).await;

        assert_eq!(report.state, CrawlState::Saturated);
        assert_eq!(report.pages_visited, k as usize);
        assert_eq!(visited_urls(dir.path()).len(), k as usize);
        assert_eq!(archived_files(dir.path()).len(), k as usize);
    }
}

#[tokio::test]
async fn test_resume_visits_union_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_graph();

    let first = crawl(create_test_config(dir.path(), 3, 1), site.clone()).await;
    assert_eq!(first.state, CrawlState::Saturated);

    let second = crawl(create_test_config(dir.path(), 100, 1), site.clone()).await;
    assert_eq!(second.state, CrawlState::Exhausted);
    assert_eq!(second.pages_visited, 3);
    assert_eq!(second.total_visited, 6);

    assert_eq!(visited_urls(dir.path()), full_reachable_set());
    for key in [
        "site.test/",
        "site.test/a",
        "site.test/b",
        "site.test/c",
        "site.test/d",
        "blog.site.test/post",
    ] {
        assert_eq!(site.request_count(key), 1, "{} fetched more than once", key);
    }

    let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
    let runs = storage.list_runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].pages_visited, 3);
    assert_eq!(runs[1].pages_visited, 3);
}

#[tokio::test]
async fn test_visited_set_independent_of_worker_count() {
    for workers in [1, 2, 4, 8] {
        let dir = tempfile::tempdir().unwrap();
        let report = crawl(create_test_config(dir.path(), 100, workers), site_graph()).await;

        assert_eq!(report.state, CrawlState::Exhausted, "workers = {}", workers);
        assert_eq!(
            visited_urls(dir.path()),
            full_reachable_set(),
            "workers = {}",
            workers
        );
    }
}

#[tokio::test]
async fn test_exhausted_checkpoint_resumes_to_nothing() {
    let dir = tempfile::tempdir().unwrap();
    crawl(create_test_config(dir.path(), 100, 2), site_graph()).await;

    let site = site_graph();
    let report = crawl(create_test_config(dir.path(), 100, 2), site.clone()).await;

    assert_eq!(report.state, CrawlState::Exhausted);
    assert_eq!(report.pages_visited, 0);
    assert!(site.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_url_not_checkpointed() {
    let dir = tempfile::tempdir().unwrap();
    let flaky = FakeSite::new(&[
        ("site.test/", 200, r#"<a href="/later">Later</a>"#),
        ("site.test/later", 503, ""),
    ]);
    let first = crawl(create_test_config(dir.path(), 10, 1), flaky.clone()).await;
    assert_eq!(first.state, CrawlState::Exhausted);
    assert_eq!(first.pages_visited, 1);
    assert_eq!(first.skipped, 1);
    assert_eq!(flaky.request_count("site.test/later"), 1);

    let storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
    assert_eq!(storage.load_pending().unwrap(), Some(Vec::new()));
    drop(storage);

    // Seeding the failed page again fetches it; the root stays visited
    let healthy = FakeSite::new(&[
        ("site.test/", 200, r#"<a href="/later">Later</a>"#),
        ("site.test/later", 200, "<p>Back</p>"),
    ]);
    let mut config = create_test_config(dir.path(), 10, 1);
    config.seeds = vec!["https://site.test/".to_string(), "https://site.test/later".to_string()];
    let options = CrawlOptions {
        fresh: true,
        ..CrawlOptions::default()
    };
    let second = Coordinator::with_transport(config, options, healthy.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(second.pages_visited, 1);
    assert_eq!(healthy.request_count("site.test/"), 0);
    assert!(visited_urls(dir.path()).contains("https://site.test/later"));
}

#[tokio::test]
async fn test_archive_failure_skips_page_but_keeps_links() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "regular file").unwrap();

    let pages = [
        ("site.test/", 200, r#"<a href="/a">A</a>"#),
        ("site.test/a", 200, "<p>Leaf</p>"),
    ];
    let site = FakeSite::new(&pages);
    let mut config = create_test_config(dir.path(), 10, 1);
    config.output.archive_dir = blocker.display().to_string();

    let report = crawl(config, site.clone()).await;

    assert_eq!(report.state, CrawlState::Exhausted);
    assert_eq!(report.pages_visited, 0);
    assert_eq!(report.skipped, 2);
    assert!(visited_urls(dir.path()).is_empty());
    // The root's links were queued even though the root was not archived
    assert_eq!(site.request_count("site.test/a"), 1);

    // Once the archive is writable, both pages are crawled
    let config = create_test_config(dir.path(), 10, 1);
    let options = CrawlOptions {
        fresh: true,
        ..CrawlOptions::default()
    };
    let second = Coordinator::with_transport(config, options, FakeSite::new(&pages))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(second.pages_visited, 2);
    assert_eq!(
        visited_urls(dir.path()),
        ["https://site.test", "https://site.test/a"]
            .iter()
            .map(|s| s.to_string())
            .collect::<BTreeSet<_>>()
    );
}

#[tokio::test]
async fn test_no_checkpoint_and_no_seeds_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path(), 10, 1);
    config.seeds.clear();

    let result = Coordinator::with_transport(config, CrawlOptions::default(), site_graph());
    assert!(matches!(result, Err(ArchiverError::Seeds(_))));
}

#[tokio::test]
async fn test_seeds_file_used_when_no_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let seeds_path = dir.path().join("seeds.txt");
    std::fs::write(&seeds_path, "# start deep\nhttps://site.test/c\n").unwrap();

    let mut config = create_test_config(dir.path(), 100, 1);
    config.seeds.clear();
    let options = CrawlOptions {
        seeds_file: Some(seeds_path),
        ..CrawlOptions::default()
    };
    let report = Coordinator::with_transport(config, options, site_graph())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, CrawlState::Exhausted);
    assert_eq!(visited_urls(dir.path()), full_reachable_set());
}

#[tokio::test]
async fn test_unreadable_seeds_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let options = CrawlOptions {
        seeds_file: Some(dir.path().join("missing.txt")),
        ..CrawlOptions::default()
    };

    let result = Coordinator::with_transport(
        create_test_config(dir.path(), 10, 1),
        options,
        site_graph(),
    );
    assert!(matches!(result, Err(ArchiverError::Config(_))));
}

#[tokio::test]
async fn test_extractor_reads_crawl_output() {
    let dir = tempfile::tempdir().unwrap();
    crawl(create_test_config(dir.path(), 100, 2), site_graph()).await;

    // A missing archive is skipped, not fatal
    std::fs::remove_file(dir.path().join("html_pages/site.test_d.html")).unwrap();

    let mut storage = SqliteStorage::new(&dir.path().join("crawl.db")).unwrap();
    let date = chrono::NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let summary = extract_statistics(&mut storage, &dir.path().join("text_pages"), date).unwrap();

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.skipped, 1);

    let stats = storage.load_page_stats().unwrap();
    let root = stats
        .iter()
        .find(|s| s.url == "https://site.test")
        .expect("root page has statistics");
    assert_eq!(root.link_count, 3);
    assert_eq!(root.internal_link_count, 2);
    assert_eq!(root.external_link_count, 1);
    assert!(dir
        .path()
        .join("text_pages/2026-10-18_site.test.txt")
        .exists());
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let page = |body: String| ResponseTemplate::new(200).set_body_string(body);

    // Every request must carry the UTM tags
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("utm_source", "analyse"))
        .and(query_param("utm_medium", "crawl_scrap"))
        .respond_with(page(format!(
            r#"<html><body>
                <a href="{}/page1">Page 1</a>
                <a href="/page2/">Page 2</a>
                <a href="https://external.test/">External</a>
            </body></html>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .and(query_param("utm_source", "analyse"))
        .respond_with(page(r#"<a href="/">Home</a><a href="/old">Old</a>"#.to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Reached directly and through the redirect
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(page("<p>Leaf</p>".to_string()))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/page2"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path(), 10, 2);
    config.seeds = vec![format!("{}/", base_url)];
    config.crawler.canonical_scheme = "http".to_string();

    let report = Coordinator::new(config, CrawlOptions::default())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.state, CrawlState::Exhausted);

    // The redirect target was archived under the URL that was asked for
    let expected: BTreeSet<String> = ["", "/page1", "/page2", "/old"]
        .iter()
        .map(|p| format!("{}{}", base_url, p))
        .collect();
    assert_eq!(visited_urls(dir.path()), expected);
    assert_eq!(archived_files(dir.path()).len(), 4);
}
