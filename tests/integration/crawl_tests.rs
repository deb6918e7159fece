//! Integration tests for the crawler
//!
//! These tests use wiremock to serve catalog pages and run the full crawl
//! cycle end-to-end through `RunController`.

use catalog_crawl::config::{Config, PaginationMode};
use catalog_crawl::crawler::{ExtractionError, PageExtraction, PageExtractor, ProductRecord};
use catalog_crawl::output::ErrorStage;
use catalog_crawl::{RunController, RunState};
use scraper::{Html, Selector};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Renders a listing page with `count` products
fn catalog_page(page: u32, count: usize, has_next: bool) -> String {
    let products: String = (0..count)
        .map(|i| {
            format!(
                r#"<div class="col"><div class="thumbnail">
                     <h4 class="pull-right price">${}.99</h4>
                     <a class="title" href="/product/{}-{}">Laptop {}-{}</a>
                   </div></div>"#,
                100 + i,
                page,
                i,
                page,
                i
            )
        })
        .collect();
    let next = if has_next {
        format!(r#"<a rel="next" href="?page={}">Next</a>"#, page + 1)
    } else {
        String::new()
    };

    format!(
        r#"<html><body><div class="wrapper"><div class="container test-site">
             <a class="category-link active" href="/computers/laptops">Laptops</a>
             <div class="row">{}</div>{}
           </div></div></body></html>"#,
        products, next
    )
}

/// Creates a test configuration pointed at the mock catalog
fn create_test_config(server: &MockServer, output: &Path, max_pages: u32) -> Config {
    let mut config = Config::default();
    config.site.base_url = format!("{}/catalog?page=1", server.uri());
    config.crawler.max_pages = max_pages;
    config.crawler.timeout_seconds = 5.0;
    config.crawler.politeness_delay_ms = 5; // Very short for testing
    config.crawler.retry_backoff_ms = 10;
    config.output.path = output.display().to_string();
    config
}

async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn data_rows(csv: &str) -> Vec<String> {
    csv.lines().skip(1).map(str::to_string).collect()
}

async fn requests_for_page(server: &MockServer, page: u32) -> usize {
    let query = format!("page={}", page);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.query() == Some(query.as_str()))
        .count()
}

#[tokio::test]
async fn test_crawl_until_empty_page() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(catalog_page(1, 5, true))).await;
    mount_page(&server, 2, html(catalog_page(2, 3, true))).await;
    mount_page(&server, 3, html(catalog_page(3, 0, false))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let config = create_test_config(&server, &output, 3);

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.pages_attempted, 3);
    assert_eq!(summary.pages_succeeded, 2);
    assert_eq!(summary.pages_empty, 1);
    assert_eq!(summary.records_written, 8);
    assert_eq!(summary.exit_code(), 0);

    let csv = std::fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("Title,Price,Category,Link\n"));
    let rows = data_rows(&csv);
    assert_eq!(rows.len(), 8);
    assert_eq!(
        rows[0],
        format!("Laptop 1-0,$100.99,Laptops,{}/product/1-0", server.uri())
    );
    assert!(rows[7].starts_with("Laptop 2-2,"));
}

#[tokio::test]
async fn test_consecutive_server_errors_abort() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(catalog_page(1, 2, true))).await;
    mount_page(&server, 2, ResponseTemplate::new(500)).await;
    mount_page(&server, 3, ResponseTemplate::new(500)).await;
    mount_page(&server, 4, html(catalog_page(4, 2, true))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let config = create_test_config(&server, &output, 10);

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Aborted);
    assert_ne!(summary.exit_code(), 0);
    assert_eq!(summary.pages_succeeded, 1);
    assert_eq!(summary.pages_failed, 2);
    assert_eq!(summary.records_written, 2);

    // Transient failures are retried exactly once
    assert_eq!(requests_for_page(&server, 2).await, 2);

    let csv = std::fs::read_to_string(&output).unwrap();
    let rows = data_rows(&csv);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.starts_with("Laptop 1-")));
}

#[tokio::test]
async fn test_permanent_errors_abort_and_keep_earlier_pages() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(catalog_page(1, 3, true))).await;
    mount_page(&server, 2, html(catalog_page(2, 1, true))).await;
    mount_page(&server, 3, ResponseTemplate::new(404)).await;
    mount_page(&server, 4, ResponseTemplate::new(404)).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let mut config = create_test_config(&server, &output, 10);
    config.crawler.worker_count = 1;

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Aborted);
    assert_eq!(summary.pages_attempted, 4);
    assert_eq!(summary.records_written, 4);
    assert_eq!(summary.errors.len(), 2);
    assert_eq!(summary.errors[0].page_index, Some(3));
    assert!(summary.errors[0].message.contains("404"));

    // Permanent failures are not retried
    assert_eq!(requests_for_page(&server, 3).await, 1);

    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(data_rows(&csv).len(), 4);
}

#[tokio::test]
async fn test_transient_failure_then_success_gives_same_output() {
    let flaky = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&flaky)
        .await;
    for page in 1..=2 {
        mount_page(&flaky, page, html(catalog_page(page, 2, true))).await;
    }

    let steady = MockServer::start().await;
    for page in 1..=2 {
        mount_page(&steady, page, html(catalog_page(page, 2, true))).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let flaky_output = dir.path().join("flaky.csv");
    let steady_output = dir.path().join("steady.csv");

    let flaky_summary = RunController::new(create_test_config(&flaky, &flaky_output, 2))
        .unwrap()
        .run()
        .await
        .unwrap();
    let steady_summary = RunController::new(create_test_config(&steady, &steady_output, 2))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(flaky_summary.state, RunState::Completed);
    assert_eq!(flaky_summary.pages_failed, 0);
    assert_eq!(flaky_summary.records_written, steady_summary.records_written);

    // Links are absolute, so compare rows with the server address stripped
    let flaky_csv = std::fs::read_to_string(&flaky_output)
        .unwrap()
        .replace(&flaky.uri(), "");
    let steady_csv = std::fs::read_to_string(&steady_output)
        .unwrap()
        .replace(&steady.uri(), "");
    assert_eq!(flaky_csv, steady_csv);
}

#[tokio::test]
async fn test_output_identical_across_worker_counts() {
    let server = MockServer::start().await;
    let counts = [4, 1, 3, 2, 5, 3];
    for (i, count) in counts.iter().enumerate() {
        let page = i as u32 + 1;
        // Later pages answer faster so workers finish out of order
        let delay = Duration::from_millis(60 - 10 * i as u64);
        mount_page(&server, page, html(catalog_page(page, *count, true)).set_delay(delay)).await;
    }
    mount_page(&server, 7, html(catalog_page(7, 0, false))).await;

    let dir = tempfile::tempdir().unwrap();
    let mut outputs = Vec::new();

    for workers in [1, 4] {
        let output = dir.path().join(format!("products-{}.csv", workers));
        let mut config = create_test_config(&server, &output, 10);
        config.crawler.worker_count = workers;

        let summary = RunController::new(config).unwrap().run().await.unwrap();
        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.records_written, counts.iter().sum::<usize>());

        outputs.push(std::fs::read(&output).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_page_budget_limits_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(html(catalog_page(1, 3, true)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let config = create_test_config(&server, &output, 4);

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert!(summary.pages_attempted <= 4);
    assert_eq!(summary.pages_succeeded, 4);
    assert_eq!(summary.records_written, 12);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 4);
}

#[tokio::test]
async fn test_empty_first_page_completes_without_file() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(catalog_page(1, 0, false))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let config = create_test_config(&server, &output, 3);

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.pages_empty, 1);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.records_written, 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_malformed_page_counts_as_failure() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(catalog_page(1, 1, true))).await;
    mount_page(
        &server,
        2,
        html("<html><body><p>Maintenance</p></body></html>".to_string()),
    )
    .await;
    mount_page(&server, 3, html(catalog_page(3, 1, true))).await;
    mount_page(&server, 4, html(catalog_page(4, 0, false))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let config = create_test_config(&server, &output, 10);

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    // One failure between successes does not abort the run
    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.errors[0].page_index, Some(2));
}

#[tokio::test]
async fn test_next_control_pagination() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(catalog_page(1, 2, true))).await;
    mount_page(&server, 2, html(catalog_page(2, 2, false))).await;
    mount_page(&server, 3, html(catalog_page(3, 2, true))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let mut config = create_test_config(&server, &output, 10);
    config.site.pagination = PaginationMode::NextControl;
    config.crawler.worker_count = 1;

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.pages_attempted, 2);
    assert_eq!(summary.pages_succeeded, 2);
    assert_eq!(summary.records_written, 4);
}

#[tokio::test]
async fn test_resume_appends_to_existing_output() {
    let server = MockServer::start().await;
    for page in 1..=4 {
        mount_page(&server, page, html(catalog_page(page, 1, true))).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");

    let first = create_test_config(&server, &output, 2);
    RunController::new(first).unwrap().run().await.unwrap();

    let mut resumed = create_test_config(&server, &output, 2);
    resumed.crawler.start_page = 3;
    resumed.output.append = true;
    let summary = RunController::new(resumed).unwrap().run().await.unwrap();

    assert_eq!(summary.records_written, 2);

    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(csv.matches("Title,Price,Category,Link").count(), 1);
    let rows = data_rows(&csv);
    let titles: Vec<&str> = rows.iter().map(|row| &row[..10]).collect();
    assert_eq!(titles, vec!["Laptop 1-0", "Laptop 2-0", "Laptop 3-0", "Laptop 4-0"]);
}

#[tokio::test]
async fn test_batched_writes_keep_page_order() {
    let server = MockServer::start().await;
    let counts = [3, 1, 2, 4];
    for (i, count) in counts.iter().enumerate() {
        let page = i as u32 + 1;
        // Early pages answer slowest so later pages finish first
        let delay = Duration::from_millis(40 - 10 * i as u64);
        mount_page(&server, page, html(catalog_page(page, *count, true)).set_delay(delay)).await;
    }
    mount_page(&server, 5, html(catalog_page(5, 0, false))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.csv");
    let mut config = create_test_config(&server, &output, 10);
    config.output.batch_size = 2;

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.records_written, 10);
    assert_eq!(summary.error_count(), 0);

    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(csv.matches("Title,Price,Category,Link").count(), 1);
    let titles: Vec<String> = data_rows(&csv)
        .iter()
        .map(|row| row.split(',').next().unwrap_or_default().to_string())
        .collect();
    let expected: Vec<String> = counts
        .iter()
        .enumerate()
        .flat_map(|(i, count)| (0..*count).map(move |j| format!("Laptop {}-{}", i + 1, j)))
        .collect();
    assert_eq!(titles, expected);
}

#[tokio::test]
async fn test_batched_write_failures_are_recorded() {
    let server = MockServer::start().await;
    mount_page(&server, 1, html(catalog_page(1, 2, true))).await;
    mount_page(&server, 2, html(catalog_page(2, 0, false))).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing").join("products.csv");
    let mut config = create_test_config(&server, &output, 5);
    config.output.batch_size = 1;

    let summary = RunController::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.records_written, 0);
    // At least one failed flush during the run, then the final flush and its retry
    assert!(summary.error_count() >= 3);
    assert!(summary
        .errors
        .iter()
        .all(|e| e.stage == ErrorStage::Write && e.page_index.is_none()));
    assert!(!output.exists());
}

/// Extractor for a plain list markup, to exercise the extraction seam
struct ListExtractor;

impl PageExtractor for ListExtractor {
    fn extract(&self, document: &Html) -> Result<PageExtraction, ExtractionError> {
        let item = Selector::parse("li.item").unwrap();
        let records: Vec<ProductRecord> = document
            .select(&item)
            .map(|element| {
                let text: String = element.text().collect();
                ProductRecord {
                    title: text.trim().to_string(),
                    price: element.value().attr("data-price").unwrap_or("").to_string(),
                    category: "Books".to_string(),
                    url: "https://books.example/item".to_string(),
                }
            })
            .collect();

        Ok(PageExtraction {
            has_more: !records.is_empty(),
            records,
            skipped: 0,
        })
    }
}

#[tokio::test]
async fn test_custom_extractor() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        html(r#"<ul><li class="item" data-price="$5">Dune</li><li class="item" data-price="$7">Emma</li></ul>"#.to_string()),
    )
    .await;
    mount_page(&server, 2, html("<ul></ul>".to_string())).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("books.csv");
    let config = create_test_config(&server, &output, 5);

    let summary = RunController::new(config)
        .unwrap()
        .extractor(Arc::new(ListExtractor))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.records_written, 2);

    let csv = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        data_rows(&csv),
        vec![
            "Dune,$5,Books,https://books.example/item",
            "Emma,$7,Books,https://books.example/item"
        ]
    );
}
