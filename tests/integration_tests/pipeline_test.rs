//! End-to-end pipeline integration tests
//!
//! Tests the complete workflow:
//! 1. Front page fetch (mocked)
//! 2. Article discovery and URL resolution
//! 3. Concurrent article fetch and extraction
//! 4. Article storage with URL deduplication
//! 5. Statistics tracking

use chrono::NaiveDateTime;
use portada::crawler::{CrawlPipeline, PageFetcher};
use portada::models::SourceState;
use portada::storage::{ArticleStore, SqliteArticleStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{
    article_html, front_page_html, mock_source, test_config, GALLERY_HTML, MAINTENANCE_HTML,
};

async fn mount_html(server: &MockServer, route: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

// ============================================================================
// Complete Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_pipeline_single_source() {
    let mock_server = MockServer::start().await;

    mount_html(
        &mock_server,
        "/",
        200,
        front_page_html(&[
            "/nota/1001-plan-de-bacheo",
            "/nota/1002-nuevas-luminarias",
            "/nota/1003-nota-borrada",
            "/nota/1004-galeria-de-fotos",
        ]),
    )
    .await;
    mount_html(
        &mock_server,
        "/nota/1001-plan-de-bacheo",
        200,
        article_html("Comenzó el plan de bacheo", "2025-04-14T08:45:00-03:00"),
    )
    .await;
    mount_html(
        &mock_server,
        "/nota/1002-nuevas-luminarias",
        200,
        article_html("Nuevas luminarias en Trinidad", "2025-04-15"),
    )
    .await;
    mount_html(&mock_server, "/nota/1003-nota-borrada", 404, String::new()).await;
    mount_html(
        &mock_server,
        "/nota/1004-galeria-de-fotos",
        200,
        GALLERY_HTML.to_string(),
    )
    .await;

    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let source = mock_source("Diario", &mock_server.uri(), "/");
    let report = pipeline.run(&[source]).await.unwrap();

    assert_eq!(report.sources.len(), 1);
    let source_report = &report.sources[0];
    assert_eq!(source_report.state, SourceState::Done);
    assert_eq!(source_report.located, 4);
    assert_eq!(source_report.resolved, 4);
    assert_eq!(source_report.extracted, 2);
    assert_eq!(source_report.failed, 2);

    let mut titles: Vec<&str> = report.records().map(|r| r.title()).collect();
    titles.sort_unstable();
    assert_eq!(
        titles,
        vec!["Comenzo el plan de bacheo", "Nuevas luminarias en Trinidad"]
    );

    let bacheo = report
        .records()
        .find(|r| r.url().ends_with("/nota/1001-plan-de-bacheo"))
        .unwrap();
    assert_eq!(bacheo.source_name(), "Diario");
    assert_eq!(bacheo.subtitle(), Some("Bajada de la nota"));
    assert_eq!(
        bacheo.published_at(),
        Some(NaiveDateTime::parse_from_str("2025-04-14 08:45:00", "%Y-%m-%d %H:%M:%S").unwrap())
    );

    // Front page + three article pages fetched, one 404
    let stats = pipeline.stats();
    assert_eq!(stats.pages_fetched, 4);
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.articles_extracted, 2);
    assert_eq!(stats.articles_invalid, 1);
}

#[tokio::test]
async fn test_pipeline_store_deduplicates_second_run() {
    let temp_dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    let hrefs = [
        "/nota/2001-primera-nota",
        "/nota/2002-segunda-nota",
        "/nota/2003-tercera-nota",
    ];
    mount_html(&mock_server, "/", 200, front_page_html(&hrefs)).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/nota/200\d-.*$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article_html("Nota del municipio", "2025-05-01T10:00:00Z")),
        )
        .mount(&mock_server)
        .await;

    let store = SqliteArticleStore::new(temp_dir.path().join("noticias.db")).unwrap();
    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let source = mock_source("Diario", &mock_server.uri(), "/");

    let first = pipeline.run(std::slice::from_ref(&source)).await.unwrap();
    let stats = store.insert_bulk(&first.into_records());
    assert_eq!(stats.inserted, 3);
    assert_eq!(stats.duplicates, 0);

    let second = pipeline.run(&[source]).await.unwrap();
    let stats = store.insert_bulk(&second.into_records());
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.duplicates, 3);
    assert_eq!(stats.errors, 0);

    assert_eq!(store.count().unwrap(), 3);
    assert_eq!(store.by_source("Diario").unwrap().len(), 3);
}

#[tokio::test]
async fn test_pipeline_mixed_sources() {
    let mock_server = MockServer::start().await;

    // Healthy source
    mount_html(
        &mock_server,
        "/uno/",
        200,
        front_page_html(&[
            "/uno/nota/1-intendenta-recorrio-obras",
            "/uno/nota/2-concejo-deliberante-sesion",
            "/uno/nota/3-recoleccion-de-residuos",
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/uno/nota/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(article_html(
            "Nota de la fuente uno",
            "2025-02-01T09:00:00-03:00",
        )))
        .mount(&mock_server)
        .await;

    // Front page down
    mount_html(&mock_server, "/dos/", 500, String::new()).await;

    // Not a front page
    mount_html(&mock_server, "/tres/", 200, MAINTENANCE_HTML.to_string()).await;

    let sources = [
        mock_source("Uno", &mock_server.uri(), "/uno/"),
        mock_source("Dos", &mock_server.uri(), "/dos/"),
        mock_source("Tres", &mock_server.uri(), "/tres/"),
    ];

    let pipeline = CrawlPipeline::new(&test_config()).unwrap();
    let report = pipeline.run(&sources).await.unwrap();

    // Reports keep the configured source order
    let states: Vec<(&str, SourceState)> = report
        .sources
        .iter()
        .map(|s| (s.source.as_str(), s.state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("Uno", SourceState::Done),
            ("Dos", SourceState::FailedFetch),
            ("Tres", SourceState::FailedEmpty),
        ]
    );
    assert_eq!(report.total_extracted(), 3);
    assert!(report.records().all(|r| r.source_name() == "Uno"));
    assert_eq!(report.count_in_state(SourceState::Done), 1);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_global_limiter_bounds_article_fetches() {
    let mock_server = MockServer::start().await;

    let hrefs: Vec<String> = (1..=6).map(|i| format!("/nota/{i}-nota-lenta-{i}")).collect();
    let href_refs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
    mount_html(&mock_server, "/", 200, front_page_html(&href_refs)).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/nota/\d-nota-lenta-\d$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article_html("Nota lenta", "2025-01-01"))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config();
    config.crawler.max_concurrent_requests = 2;
    let limiter = Arc::new(Semaphore::new(config.crawler.max_concurrent_requests));
    let fetcher =
        Arc::new(PageFetcher::with_limiter(&config.crawler, Arc::clone(&limiter)).unwrap());
    let pipeline = CrawlPipeline::with_fetcher(&config, fetcher);

    let start = Instant::now();
    let report = pipeline
        .run(&[mock_source("Lento", &mock_server.uri(), "/")])
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.total_extracted(), 6);
    // Six 200ms fetches, two at a time
    assert!(
        elapsed >= Duration::from_millis(600),
        "Fetches should be bounded by the limiter: {elapsed:?}"
    );
    assert_eq!(limiter.available_permits(), 2);
}

#[tokio::test]
async fn test_sources_crawled_concurrently() {
    let mock_server = MockServer::start().await;

    for prefix in ["a", "b", "c"] {
        mount_html(
            &mock_server,
            &format!("/{prefix}/"),
            200,
            front_page_html(&[
                &format!("/{prefix}/nota/1-primera-nota"),
                &format!("/{prefix}/nota/2-segunda-nota"),
                &format!("/{prefix}/nota/3-tercera-nota"),
            ]),
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/[abc]/nota/.*$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(article_html("Nota", "2025-01-01"))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&mock_server)
        .await;

    let sources: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|p| mock_source(p, &mock_server.uri(), &format!("/{p}/")))
        .collect();

    let mut config = test_config();
    config.crawler.limit_per_host = 10;
    let pipeline = CrawlPipeline::new(&config).unwrap();

    let start = Instant::now();
    let report = pipeline.run(&sources).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.total_extracted(), 9);
    // Nine 150ms fetches under a cap of 15 finish well before a serial run would
    assert!(
        elapsed < Duration::from_millis(1350),
        "Sources should be crawled concurrently: {elapsed:?}"
    );
}
