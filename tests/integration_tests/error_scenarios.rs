//! Error scenario integration tests
//!
//! Tests various failure modes and error handling:
//! 1. Article timeouts
//! 2. HTTP error responses on every article
//! 3. Malformed HTML
//! 4. Front pages without usable links
//! 5. Retry of transient failures
//! 6. Errors surfaced through the unified error type

use portada::crawler::CrawlPipeline;
use portada::error::{Error, ErrorCategory, PortadaErrorTrait};
use portada::models::{Source, SourceState};
use portada::utils::error::{CrawlerError, FetchError};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{article_html, front_page_html, mock_source, test_config};

async fn mount_front_page(server: &MockServer, hrefs: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(front_page_html(hrefs)))
        .mount(server)
        .await;
}

// ============================================================================
// Article failures
// ============================================================================

#[tokio::test]
async fn test_article_timeout_counted_as_failure() {
    let mock_server = MockServer::start().await;
    mount_front_page(
        &mock_server,
        &["/nota/1-rapida-uno", "/nota/2-rapida-dos", "/nota/3-muy-lenta"],
    )
    .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/nota/[12]-rapida-.*$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(article_html("Nota", "2025-01-01")),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nota/3-muy-lenta"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article_html("Lenta", "2025-01-01"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config();
    config.crawler.request_timeout_secs = 1;
    let pipeline = CrawlPipeline::new(&config).unwrap();
    let report = pipeline
        .run(&[mock_source("Diario", &mock_server.uri(), "/")])
        .await
        .unwrap();

    let source = &report.sources[0];
    assert_eq!(source.state, SourceState::Done);
    assert_eq!(source.extracted, 2);
    assert_eq!(source.failed, 1);
    assert_eq!(pipeline.stats().fetch_failures, 1);
}

#[tokio::test]
async fn test_all_articles_failing_still_done() {
    let mock_server = MockServer::start().await;
    mount_front_page(
        &mock_server,
        &["/nota/1-no-existe", "/nota/2-no-existe", "/nota/3-no-existe"],
    )
    .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/nota/.*$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let report = pipeline
        .run(&[mock_source("Diario", &mock_server.uri(), "/")])
        .await
        .unwrap();

    let source = &report.sources[0];
    assert_eq!(source.state, SourceState::Done);
    assert_eq!(source.extracted, 0);
    assert_eq!(source.failed, 3);
    assert_eq!(report.secs_per_article(), None);
}

#[tokio::test]
async fn test_malformed_html_is_tolerated() {
    let mock_server = MockServer::start().await;
    mount_front_page(
        &mock_server,
        &["/nota/1-html-roto", "/nota/2-html-roto", "/nota/3-html-roto"],
    )
    .await;

    // Unclosed tags everywhere; the parser recovers the structure
    let broken = "<html><body><h1>Nota con HTML roto<div class=\"entry-content\">\
        <p>Primer párrafo sin cerrar con texto suficiente para contar\
        <p>Segundo párrafo sin cerrar también con texto suficiente\
        <p>Tercer párrafo que completa el largo mínimo del cuerpo";
    Mock::given(method("GET"))
        .and(path_regex(r"^/nota/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(broken))
        .mount(&mock_server)
        .await;

    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let report = pipeline
        .run(&[mock_source("Diario", &mock_server.uri(), "/")])
        .await
        .unwrap();

    // Every page parses without panicking; each task ends as a record or a failure
    let source = &report.sources[0];
    assert_eq!(source.state, SourceState::Done);
    assert_eq!(source.extracted + source.failed, 3);
}

// ============================================================================
// Front page failures
// ============================================================================

#[tokio::test]
async fn test_front_page_with_only_offsite_links() {
    let mock_server = MockServer::start().await;
    mount_front_page(
        &mock_server,
        &[
            "https://otro-diario.com/nota/1-externa",
            "https://otro-diario.com/nota/2-externa",
            "/categoria/politica",
        ],
    )
    .await;

    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let report = pipeline
        .run(&[mock_source("Diario", &mock_server.uri(), "/")])
        .await
        .unwrap();

    let source = &report.sources[0];
    assert_eq!(source.state, SourceState::FailedEmpty);
    assert_eq!(source.located, 3);
    assert_eq!(source.resolved, 0);
}

#[tokio::test]
async fn test_unreachable_front_page() {
    // Nothing listens on port 9 of localhost
    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let report = pipeline
        .run(&[Source::new("Caido", "http://127.0.0.1:9/")])
        .await
        .unwrap();

    assert_eq!(report.sources[0].state, SourceState::FailedFetch);
    assert_eq!(pipeline.stats().fetch_failures, 1);
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_front_page_retried_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_front_page(
        &mock_server,
        &["/nota/1-reintento-uno", "/nota/2-reintento-dos", "/nota/3-reintento-tres"],
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/nota/.*$"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(article_html("Nota", "2025-01-01")),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config();
    config.crawler.max_retries = 2;
    let pipeline = CrawlPipeline::new(&config).unwrap();
    let report = pipeline
        .run(&[mock_source("Diario", &mock_server.uri(), "/")])
        .await
        .unwrap();

    assert_eq!(report.sources[0].state, SourceState::Done);
    assert_eq!(report.total_extracted(), 3);
}

// ============================================================================
// Unified error type
// ============================================================================

#[tokio::test]
async fn test_empty_source_list_is_config_error() {
    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let err = pipeline.run(&[]).await.unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.category(), ErrorCategory::Config);
    assert!(!err.is_recoverable());
}

#[test]
fn test_fetch_errors_map_to_network_category() {
    let err: Error = FetchError::HttpStatus(503).into();
    assert_eq!(err.category(), ErrorCategory::Network);
    assert!(err.is_recoverable());

    let err: Error = FetchError::HttpStatus(404).into();
    assert!(!err.is_recoverable());

    let err: Error = CrawlerError::NoUrls.into();
    assert_eq!(err.category(), ErrorCategory::Discovery);
}
