//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end: pages, images, manifest and files.

use image_trawler::config::Config;
use image_trawler::crawler::{crawl, Coordinator};
use image_trawler::output::MANIFEST_HEADERS;
use image_trawler::state::{ImageState, PageState};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration writing into `dir`, with fast retries
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.crawler.max_workers = 4;
    config.crawler.user_agent = "TestBot/1.0".to_string();
    config.retry.backoff_factor = 0.05;
    config.output.image_dir = dir.path().join("images").to_string_lossy().into_owned();
    config.output.manifest_path = dir
        .path()
        .join("image_data.csv")
        .to_string_lossy()
        .into_owned();
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

fn image(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(bytes.to_vec())
        .insert_header("content-type", "image/jpeg")
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Manifest row: image URL, local path, page URL
struct Row {
    image_url: String,
    local_path: PathBuf,
    page_url: String,
}

fn read_manifest(dir: &TempDir) -> Vec<Row> {
    let mut reader = csv::Reader::from_path(dir.path().join("image_data.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.iter().collect::<Vec<_>>(), MANIFEST_HEADERS.to_vec());

    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            Row {
                image_url: r[0].to_string(),
                local_path: PathBuf::from(&r[1]),
                page_url: r[2].to_string(),
            }
        })
        .collect()
}

/// Every manifest row must point at a real, non-empty file
fn assert_rows_backed_by_files(rows: &[Row]) {
    for row in rows {
        let meta = std::fs::metadata(&row.local_path)
            .unwrap_or_else(|e| panic!("{} missing: {}", row.local_path.display(), e));
        assert!(meta.len() > 0, "{} is empty", row.local_path.display());
    }
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    let dir = TempDir::new().unwrap();

    let seed_page = format!(
        r#"<html><body>
            <img src="/img1.jpg">
            <a href="/b">B</a>
            <a href="http://localhost:{}/c">Same server, other host</a>
        </body></html>"#,
        port
    );
    mount_get(&server, "/", html(&seed_page)).await;
    mount_get(
        &server,
        "/b",
        html(r#"<img src="/img1.jpg"><img src="/gallery/img2.png"><a href="/">home</a>"#),
    )
    .await;
    mount_get(&server, "/c", html(r#"<img src="/img3.jpg">"#)).await;
    mount_get(&server, "/img1.jpg", image(b"first image")).await;
    mount_get(&server, "/gallery/img2.png", image(b"second image")).await;
    mount_get(&server, "/img3.jpg", image(b"never fetched")).await;

    let seed = format!("{}/", server.uri());
    let stats = crawl(create_test_config(&dir), &seed).await.unwrap();

    assert!(!stats.cancelled);
    assert_eq!(stats.pages(PageState::Completed), 2);
    assert_eq!(stats.images(ImageState::Stored), 2);
    assert_eq!(stats.manifest_rows, 2);
    assert!(stats.offsite_links >= 1);

    assert_eq!(requests_to(&server, "/c").await, 0);
    assert_eq!(requests_to(&server, "/img3.jpg").await, 0);
    assert_eq!(requests_to(&server, "/").await, 1);

    let rows = read_manifest(&dir);
    assert_eq!(rows.len(), 2);
    assert_rows_backed_by_files(&rows);

    let img1 = rows
        .iter()
        .find(|r| r.image_url.ends_with("/img1.jpg"))
        .unwrap();
    assert_eq!(img1.page_url, seed);
    assert_eq!(
        img1.local_path,
        dir.path().join("images").join("127.0.0.1").join("img1.jpg")
    );
    assert_eq!(std::fs::read(&img1.local_path).unwrap(), b"first image");

    let img2 = rows
        .iter()
        .find(|r| r.image_url.ends_with("/gallery/img2.png"))
        .unwrap();
    assert_eq!(
        img2.local_path,
        dir.path()
            .join("images")
            .join("127.0.0.1")
            .join("b")
            .join("img2.png")
    );
}

#[tokio::test]
async fn test_shared_image_downloaded_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(
        &server,
        "/",
        html(r#"<img src="/shared.jpg"><a href="/one">1</a><a href="/two">2</a>"#),
    )
    .await;
    mount_get(&server, "/one", html(r#"<img src="/shared.jpg">"#)).await;
    mount_get(&server, "/two", html(r#"<img src="shared.jpg">"#)).await;

    Mock::given(method("GET"))
        .and(path("/shared.jpg"))
        .respond_with(image(b"shared"))
        .expect(1)
        .mount(&server)
        .await;

    let stats = crawl(create_test_config(&dir), &server.uri()).await.unwrap();

    assert_eq!(stats.images(ImageState::Stored), 1);
    assert_eq!(stats.duplicate_images, 2);

    let rows = read_manifest(&dir);
    assert_eq!(rows.len(), 1);
    assert_rows_backed_by_files(&rows);
}

#[tokio::test]
async fn test_page_fetched_once_despite_many_references() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(
        &server,
        "/",
        html(r#"<a href="/p1">1</a><a href="/p2">2</a><a href="/p3">3</a><a href="/d">d</a>"#),
    )
    .await;
    for p in ["/p1", "/p2", "/p3"] {
        mount_get(&server, p, html(r#"<a href="/d">d</a><a href="/d#again">d</a>"#)).await;
    }

    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(html(r#"<a href="/">home</a>"#).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let stats = crawl(create_test_config(&dir), &server.uri()).await.unwrap();
    assert_eq!(stats.pages(PageState::Completed), 5);
    assert_eq!(requests_to(&server, "/").await, 1);
}

/// Answers 503 for the first `failures` requests, then `success`,
/// remembering when each request arrived
struct FlakyResponder {
    failures: usize,
    success: ResponseTemplate,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut arrivals = self.arrivals.lock().unwrap();
        arrivals.push(Instant::now());
        if arrivals.len() <= self.failures {
            ResponseTemplate::new(503)
        } else {
            self.success.clone()
        }
    }
}

#[tokio::test]
async fn test_transient_page_failures_retried_with_growing_backoff() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let arrivals = Arc::new(Mutex::new(Vec::new()));

    mount_get(&server, "/", html(r#"<a href="/flaky">flaky</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(FlakyResponder {
            failures: 2,
            success: html(r#"<img src="/after.jpg">"#),
            arrivals: Arc::clone(&arrivals),
        })
        .mount(&server)
        .await;
    mount_get(&server, "/after.jpg", image(b"eventually")).await;

    let mut config = create_test_config(&dir);
    config.retry.backoff_factor = 0.1;
    let stats = crawl(config, &server.uri()).await.unwrap();

    assert_eq!(stats.pages(PageState::Completed), 2);
    assert_eq!(stats.pages(PageState::Failed), 0);
    assert_eq!(stats.images(ImageState::Stored), 1);

    // 0.1s before the first retry, 0.2s before the second
    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 3);
    let first_gap = arrivals[1] - arrivals[0];
    let second_gap = arrivals[2] - arrivals[1];
    assert!(first_gap >= Duration::from_millis(100), "first gap {:?}", first_gap);
    assert!(second_gap >= Duration::from_millis(200), "second gap {:?}", second_gap);
    assert!(second_gap > first_gap, "{:?} then {:?}", first_gap, second_gap);

    let rows = read_manifest(&dir);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].page_url.ends_with("/flaky"));
    assert_eq!(std::fs::read(&rows[0].local_path).unwrap(), b"eventually");
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(&server, "/", html(r#"<img src="/down.jpg"><img src="/ok.jpg">"#)).await;
    mount_get(&server, "/ok.jpg", image(b"ok")).await;
    Mock::given(method("GET"))
        .and(path("/down.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let stats = crawl(create_test_config(&dir), &server.uri()).await.unwrap();

    assert_eq!(stats.images(ImageState::Failed), 1);
    assert_eq!(stats.images(ImageState::Stored), 1);

    let rows = read_manifest(&dir);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].image_url.ends_with("/ok.jpg"));

    // No partial file left for the failed download
    let host_dir = dir.path().join("images").join("127.0.0.1");
    let names: Vec<String> = std::fs::read_dir(&host_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["ok.jpg".to_string()]);
}

#[tokio::test]
async fn test_not_found_page_is_not_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(
        &server,
        "/",
        html(r#"<a href="/missing">gone</a><a href="/present">here</a>"#),
    )
    .await;
    mount_get(&server, "/missing", ResponseTemplate::new(404)).await;
    mount_get(&server, "/present", html(r#"<img src="/here.jpg">"#)).await;
    mount_get(&server, "/here.jpg", image(b"here")).await;

    let stats = crawl(create_test_config(&dir), &server.uri()).await.unwrap();

    // 404 is not retried
    assert_eq!(requests_to(&server, "/missing").await, 1);
    assert_eq!(stats.pages(PageState::Failed), 1);
    assert_eq!(stats.pages(PageState::Completed), 2);
    assert_eq!(read_manifest(&dir).len(), 1);
}

#[tokio::test]
async fn test_excluded_extensions_never_requested() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(
        &server,
        "/",
        html(r#"<img src="/logo.svg"><img src="/spinner.GIF?v=3"><img src="/photo.jpg">"#),
    )
    .await;
    mount_get(&server, "/photo.jpg", image(b"photo")).await;
    Mock::given(method("GET"))
        .and(path("/logo.svg"))
        .respond_with(image(b"<svg/>"))
        .expect(0)
        .mount(&server)
        .await;

    let stats = crawl(create_test_config(&dir), &server.uri()).await.unwrap();

    assert_eq!(stats.images(ImageState::Skipped), 2);
    assert_eq!(stats.images(ImageState::Stored), 1);
    assert_eq!(requests_to(&server, "/spinner.GIF").await, 0);
    assert_eq!(read_manifest(&dir).len(), 1);
}

#[tokio::test]
async fn test_non_html_page_not_parsed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(&server, "/", html(r#"<a href="/data.json">data</a>"#)).await;
    mount_get(
        &server,
        "/data.json",
        ResponseTemplate::new(200)
            .set_body_raw(br#"{"html": "<img src='/x.jpg'>"}"#.to_vec(), "application/json"),
    )
    .await;

    let stats = crawl(create_test_config(&dir), &server.uri()).await.unwrap();

    assert_eq!(stats.pages(PageState::Failed), 1);
    assert_eq!(requests_to(&server, "/x.jpg").await, 0);
    assert!(read_manifest(&dir).is_empty());
}

#[tokio::test]
async fn test_file_name_collisions_are_disambiguated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(&server, "/", html(r#"<img src="/a/pic.jpg"><img src="/b/pic.jpg">"#)).await;
    mount_get(&server, "/a/pic.jpg", image(b"from a")).await;
    mount_get(&server, "/b/pic.jpg", image(b"from b")).await;

    crawl(create_test_config(&dir), &server.uri()).await.unwrap();

    let rows = read_manifest(&dir);
    assert_eq!(rows.len(), 2);
    assert_ne!(rows[0].local_path, rows[1].local_path);
    assert_rows_backed_by_files(&rows);

    for row in &rows {
        let expected: &[u8] = if row.image_url.ends_with("/a/pic.jpg") {
            b"from a"
        } else {
            b"from b"
        };
        assert_eq!(std::fs::read(&row.local_path).unwrap(), expected);
    }
}

#[tokio::test]
async fn test_manifest_truncated_between_runs() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(&server, "/", html(r#"<img src="/one.jpg">"#)).await;
    mount_get(&server, "/one.jpg", image(b"one")).await;

    crawl(create_test_config(&dir), &server.uri()).await.unwrap();
    crawl(create_test_config(&dir), &server.uri()).await.unwrap();

    assert_eq!(read_manifest(&dir).len(), 1);
}

#[tokio::test]
async fn test_cancellation_drains_in_flight_work() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_get(
        &server,
        "/",
        html(r#"<img src="/slow.jpg"><a href="/next">next</a>"#),
    )
    .await;
    mount_get(
        &server,
        "/slow.jpg",
        image(b"slow").set_delay(Duration::from_millis(400)),
    )
    .await;
    mount_get(
        &server,
        "/next",
        html(r#"<a href="/never">never</a><img src="/never.jpg">"#)
            .set_delay(Duration::from_millis(400)),
    )
    .await;
    mount_get(&server, "/never", html("<p>unreachable</p>")).await;

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = tx.send(true);
    });

    let stats = Coordinator::new(create_test_config(&dir), &server.uri())
        .unwrap()
        .with_shutdown(rx)
        .run()
        .await
        .unwrap();

    assert!(stats.cancelled);

    // In-flight work finished and was recorded
    assert_eq!(stats.images(ImageState::Stored), 1);
    assert_eq!(stats.pages(PageState::Completed), 2);
    let rows = read_manifest(&dir);
    assert_eq!(rows.len(), 1);
    assert_rows_backed_by_files(&rows);

    // Nothing discovered after the signal was admitted
    assert_eq!(requests_to(&server, "/never").await, 0);
    assert_eq!(requests_to(&server, "/never.jpg").await, 0);
}

#[tokio::test]
async fn test_invalid_seed_is_fatal() {
    let dir = TempDir::new().unwrap();
    assert!(crawl(create_test_config(&dir), "ftp://example.com/").await.is_err());
    assert!(crawl(create_test_config(&dir), "/relative/path").await.is_err());
}
