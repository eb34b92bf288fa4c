//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, including the CSV and checkpoint files.

use roster_crawl::config::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, TargetConfig, TransientRetries,
    UserAgentConfig,
};
use roster_crawl::crawler::{Coordinator, StopReason};
use roster_crawl::storage::{CheckpointStore, JsonCheckpointStore};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling partition "x" of the mock server
fn create_test_config(base_url: &str, output_dir: &Path) -> Config {
    Config {
        target: TargetConfig {
            listing_url: format!("{}/companies/{{partition}}-{{page}}", base_url),
            partition: "x".to_string(),
            start_page: 1,
        },
        crawler: CrawlerConfig {
            concurrency_limit: 4,
            request_timeout_ms: 5_000,
            retry_delay_ms: 10, // Very short for testing
            item_retries: 3,
            transient_retries: TransientRetries::Limited(5),
            max_pages: None,
        },
        selectors: SelectorConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            output_dir: output_dir.to_path_buf(),
        },
    }
}

fn listing_html(names: &[&str]) -> String {
    let entries: String = names
        .iter()
        .map(|name| format!(r#"<li><a href="/company/{}">{}</a></li>"#, name, name))
        .collect();
    format!(
        r#"<html><body><ul class="company-list">{}</ul></body></html>"#,
        entries
    )
}

fn detail_html(homepage: Option<&str>) -> String {
    match homepage {
        Some(url) => format!(
            r#"<html><body><a class="company-website" href="{}">Website</a></body></html>"#,
            url
        ),
        None => "<html><body><p>No website listed</p></body></html>".to_string(),
    }
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Reads the output CSV as (source, name, homepage) rows, header excluded
fn read_rows(config: &Config) -> Vec<(String, String, String)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(config.output_path())
        .expect("Failed to open output");

    let headers = reader.headers().expect("Missing header").clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["sourceurl", "company_name", "company_homepage_url"]
    );

    let mut rows: Vec<(String, String, String)> = reader
        .records()
        .map(|record| {
            let record = record.expect("Malformed row");
            (
                record[0].to_string(),
                record[1].to_string(),
                record[2].to_string(),
            )
        })
        .collect();
    rows.sort();
    rows
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}

#[tokio::test]
async fn test_full_crawl_two_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/companies/x-1", listing_html(&["Acme", "Bolt"])).await;
    mount_page(&server, "/companies/x-2", listing_html(&["Crane"])).await;
    mount_page(&server, "/companies/x-3", listing_html(&[])).await;
    mount_page(&server, "/company/Acme", detail_html(Some("https://acme.test/"))).await;
    mount_page(&server, "/company/Bolt", detail_html(None)).await;
    mount_status(&server, "/company/Crane", 404).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base, dir.path());

    let mut coordinator =
        Coordinator::new(config.clone(), false).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.stop_reason, StopReason::NoItems);
    assert_eq!(report.pages_crawled, 2);
    assert_eq!(report.records_written, 3);
    assert_eq!(report.not_found, 1);
    assert_eq!(report.final_cursor, 3);

    let page1 = format!("{}/companies/x-1", base);
    let page2 = format!("{}/companies/x-2", base);
    assert_eq!(
        read_rows(&config),
        vec![
            (page1.clone(), "Acme".to_string(), "https://acme.test/".to_string()),
            (page1, "Bolt".to_string(), String::new()),
            (page2, "Crane".to_string(), "NOT_FOUND".to_string()),
        ]
    );

    let checkpoint = JsonCheckpointStore::new(config.checkpoint_path())
        .load()
        .unwrap()
        .expect("Checkpoint missing");
    assert_eq!(checkpoint.last_page_num, 3);
    assert_eq!(checkpoint.processed_companies.len(), 3);
    assert_eq!(requests_to(&server, "/company/Crane").await, 1);
}

#[tokio::test]
async fn test_rows_are_fully_quoted() {
    let server = MockServer::start().await;
    mount_page(&server, "/companies/x-1", listing_html(&["Acme"])).await;
    mount_page(&server, "/companies/x-2", listing_html(&[])).await;
    mount_page(&server, "/company/Acme", detail_html(Some("https://acme.test/"))).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    let raw = std::fs::read_to_string(config.output_path()).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines[0], "sourceurl,company_name,company_homepage_url");
    assert_eq!(
        lines[1],
        format!(
            r#""{}/companies/x-1","Acme","https://acme.test/""#,
            server.uri()
        )
    );
}

#[tokio::test]
async fn test_resume_adds_no_rows() {
    let server = MockServer::start().await;
    mount_page(&server, "/companies/x-1", listing_html(&["Acme", "Bolt"])).await;
    mount_page(&server, "/companies/x-2", listing_html(&[])).await;
    mount_page(&server, "/company/Acme", detail_html(Some("https://acme.test/"))).await;
    mount_page(&server, "/company/Bolt", detail_html(None)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(read_rows(&config).len(), 2);

    // Simulate a crash after page 1's companies were written but before the
    // cursor moved past it.
    let store = JsonCheckpointStore::new(config.checkpoint_path());
    let saved = store.load().unwrap().unwrap();
    store.save(1, &saved.processed_companies).unwrap();

    let report = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.records_written, 0);
    assert_eq!(report.final_cursor, 2);
    assert_eq!(read_rows(&config).len(), 2);
    assert_eq!(requests_to(&server, "/company/Acme").await, 1);
    assert_eq!(requests_to(&server, "/company/Bolt").await, 1);
}

#[tokio::test]
async fn test_fresh_starts_over() {
    let server = MockServer::start().await;
    mount_page(&server, "/companies/x-1", listing_html(&["Acme"])).await;
    mount_page(&server, "/companies/x-2", listing_html(&[])).await;
    mount_page(&server, "/company/Acme", detail_html(None)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());

    Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();
    Coordinator::new(config.clone(), true)
        .unwrap()
        .run()
        .await
        .unwrap();

    // The output is append-only, so a fresh run writes the row again.
    assert_eq!(read_rows(&config).len(), 2);
    assert_eq!(requests_to(&server, "/company/Acme").await, 2);
}

#[tokio::test]
async fn test_server_errors_retried_until_success() {
    let server = MockServer::start().await;
    mount_page(&server, "/companies/x-1", listing_html(&["Acme"])).await;
    mount_page(&server, "/companies/x-2", listing_html(&[])).await;

    // Mounted first so it takes priority until exhausted.
    Mock::given(method("GET"))
        .and(path("/company/Acme"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/company/Acme", detail_html(Some("https://acme.test/"))).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let report = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.records_written, 1);
    assert!(report.dropped.is_empty());
    assert_eq!(requests_to(&server, "/company/Acme").await, 3);

    let rows = read_rows(&config);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].2, "https://acme.test/");
}

#[tokio::test]
async fn test_forbidden_detail_dropped_after_seven_attempts() {
    let server = MockServer::start().await;
    mount_page(&server, "/companies/x-1", listing_html(&["Acme", "Bolt"])).await;
    mount_page(&server, "/companies/x-2", listing_html(&[])).await;
    mount_page(&server, "/company/Acme", detail_html(None)).await;
    mount_status(&server, "/company/Bolt", 403).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let report = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.dropped, vec!["Bolt".to_string()]);
    assert_eq!(report.records_written, 1);
    assert_eq!(report.final_cursor, 2);
    assert_eq!(requests_to(&server, "/company/Bolt").await, 7);

    let rows = read_rows(&config);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, "Acme");

    let checkpoint = JsonCheckpointStore::new(config.checkpoint_path())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.processed_companies, vec!["Acme".to_string()]);
}

#[tokio::test]
async fn test_missing_listing_page_stops_crawl() {
    let server = MockServer::start().await;
    mount_status(&server, "/companies/x-1", 404).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), dir.path());
    let report = Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::ListingUnavailable);
    assert_eq!(report.pages_crawled, 0);
    assert_eq!(report.final_cursor, 1);
    assert!(read_rows(&config).is_empty());
}

#[tokio::test]
async fn test_partitions_use_separate_files() {
    let server = MockServer::start().await;
    mount_page(&server, "/companies/y-1", listing_html(&["Yarrow"])).await;
    mount_page(&server, "/companies/y-2", listing_html(&[])).await;
    mount_page(&server, "/company/Yarrow", detail_html(None)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path());
    config.target.partition = "y".to_string();

    Coordinator::new(config.clone(), false)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(dir.path().join("companies_y.csv").exists());
    assert!(dir.path().join("checkpoint_y.json").exists());
    assert!(!dir.path().join("companies_x.csv").exists());
}
