//! Source crawl orchestration
//!
//! Drives every configured source through discovery and extraction.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Front page  │     │  Article    │     │    Url      │     │  Extract    │
//! │   fetch     │────▶│  Locator    │────▶│  Resolver   │────▶│  tasks (N)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!       │                                                            │
//!       └──────────────── shared PageFetcher limiter ────────────────┘
//! ```
//!
//! Sources run concurrently with each other and every article of a source
//! runs as its own task. All fetches, front pages and articles alike, go
//! through one [`PageFetcher`] so a single limiter bounds the whole run.
//! Failures are absorbed at the smallest scope: a bad article never affects
//! its siblings, a bad source never affects the run.
//!
//! # Example
//!
//! ```no_run
//! use portada::config::Config;
//! use portada::crawler::pipeline::CrawlPipeline;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::with_default_sources();
//! let pipeline = CrawlPipeline::new(&config)?;
//!
//! let report = pipeline.run(&config.enabled_sources()).await?;
//! println!("Extracted {} articles", report.total_extracted());
//! # Ok(())
//! # }
//! ```

use futures::future::join_all;
use scraper::Html;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::locator::ArticleLocator;
use crate::crawler::url::UrlResolver;
use crate::error::{Error, PortadaErrorTrait, Result};
use crate::models::{ArticleRecord, CrawlReport, Source, SourceReport, SourceState};
use crate::parser::ArticleParser;
use crate::utils::error::CrawlerError;

// ============================================================================
// Pipeline Statistics
// ============================================================================

/// Run-wide counters (thread-safe)
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Pages fetched successfully
    pub pages_fetched: AtomicU64,

    /// Fetches that ended in a `FetchError`
    pub fetch_failures: AtomicU64,

    /// Valid article records produced
    pub articles_extracted: AtomicU64,

    /// Article pages that did not hold a usable article
    pub articles_invalid: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_fetch(&self, ok: bool) {
        let counter = if ok {
            &self.pages_fetched
        } else {
            &self.fetch_failures
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extracted(&self) {
        self.articles_extracted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.articles_invalid.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            articles_extracted: self.articles_extracted.load(Ordering::Relaxed),
            articles_invalid: self.articles_invalid.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pages_fetched: u64,
    pub fetch_failures: u64,
    pub articles_extracted: u64,
    pub articles_invalid: u64,
}

impl StatsSnapshot {
    /// Share of fetches that succeeded (0.0 - 1.0)
    pub fn fetch_success_rate(&self) -> f64 {
        let total = self.pages_fetched + self.fetch_failures;
        if total == 0 {
            return 1.0;
        }
        self.pages_fetched as f64 / total as f64
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// Front page discovery outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Candidate containers accepted by the locator
    pub located: usize,
    /// Validated, deduplicated article URLs
    pub urls: Vec<String>,
}

impl Discovery {
    /// Classify an empty outcome as a discovery failure
    pub fn check(&self, min_articles: usize) -> std::result::Result<(), CrawlerError> {
        if self.located == 0 {
            Err(CrawlerError::NoCandidates { min: min_articles })
        } else if self.urls.is_empty() {
            Err(CrawlerError::NoUrls)
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Pipeline Implementation
// ============================================================================

/// Crawl orchestrator
pub struct CrawlPipeline {
    fetcher: Arc<PageFetcher>,
    locator: ArticleLocator,
    resolver: UrlResolver,
    parser: Arc<ArticleParser>,
    stats: Arc<PipelineStats>,
}

impl CrawlPipeline {
    /// Create a pipeline with its own fetcher built from the config
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = PageFetcher::new(&config.crawler)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a pipeline around an existing fetcher
    pub fn with_fetcher(config: &Config, fetcher: Arc<PageFetcher>) -> Self {
        Self {
            fetcher,
            locator: ArticleLocator::new(&config.discovery, &config.validation),
            resolver: UrlResolver::new(&config.validation),
            parser: Arc::new(ArticleParser::new(&config.validation)),
            stats: PipelineStats::new(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Crawl every source and collect the results
    ///
    /// Never fails because of a source or an article; per-source outcomes
    /// are in the report.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when `sources` is empty
    pub async fn run(&self, sources: &[Source]) -> Result<CrawlReport> {
        if sources.is_empty() {
            let err = Error::config("No sources to crawl");
            warn!(
                category = %err.category(),
                recoverable = err.is_recoverable(),
                error = %err,
                "Crawl not started"
            );
            return Err(err);
        }

        let started = Instant::now();
        info!(sources = sources.len(), "Starting crawl");

        let reports = join_all(sources.iter().map(|source| self.crawl_source(source))).await;

        let report = CrawlReport {
            sources: reports,
            elapsed: started.elapsed(),
        };

        info!(
            located = report.total_located(),
            resolved = report.total_resolved(),
            extracted = report.total_extracted(),
            failed = report.total_failed(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Crawl finished"
        );

        Ok(report)
    }

    /// Drive one source to a terminal state
    pub async fn crawl_source(&self, source: &Source) -> SourceReport {
        let started = Instant::now();
        let mut report = SourceReport::new(&source.name);

        info!(source = %source.name, url = %source.url, "Crawling source");

        let base_url = match Url::parse(&source.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(source = %source.name, error = %e, "Invalid front page URL");
                advance(&mut report, SourceState::FailedFetch);
                report.elapsed = started.elapsed();
                return report;
            }
        };

        let html = match self.fetcher.fetch_with_retry(&source.url).await {
            Ok(html) => {
                self.stats.record_fetch(true);
                html
            }
            Err(e) => {
                self.stats.record_fetch(false);
                warn!(
                    source = %source.name,
                    category = %e.category(),
                    recoverable = e.is_recoverable(),
                    error = %e,
                    "Front page fetch failed"
                );
                advance(&mut report, SourceState::FailedFetch);
                report.elapsed = started.elapsed();
                return report;
            }
        };
        advance(&mut report, SourceState::FrontPageFetched);

        let discovery = self.discover(&html, &base_url);
        drop(html);
        report.located = discovery.located;
        report.resolved = discovery.urls.len();

        if let Err(e) = discovery.check(self.locator.min_articles()) {
            if discovery.located > 0 {
                advance(&mut report, SourceState::ArticlesLocated);
            }
            warn!(
                source = %source.name,
                category = %e.category(),
                reason = %e,
                "No articles discovered"
            );
            advance(&mut report, SourceState::FailedEmpty);
            report.elapsed = started.elapsed();
            return report;
        }
        advance(&mut report, SourceState::ArticlesLocated);
        advance(&mut report, SourceState::UrlsResolved);

        advance(&mut report, SourceState::Extracting);
        let handles: Vec<_> = discovery
            .urls
            .iter()
            .map(|url| {
                let fetcher = Arc::clone(&self.fetcher);
                let parser = Arc::clone(&self.parser);
                let stats = Arc::clone(&self.stats);
                let url = url.clone();
                let source_name = source.name.clone();
                tokio::spawn(async move {
                    extract_article(&fetcher, &parser, &stats, &url, &source_name).await
                })
            })
            .collect();

        for (url, joined) in discovery.urls.iter().zip(join_all(handles).await) {
            match joined {
                Ok(Ok(record)) => report.records.push(record),
                Ok(Err(e)) => {
                    debug!(
                        source = %source.name,
                        url = %url,
                        category = %e.category(),
                        error = %e,
                        "Article skipped"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(source = %source.name, url = %url, error = %e, "Article task aborted");
                    report.failed += 1;
                }
            }
        }
        report.extracted = report.records.len();
        advance(&mut report, SourceState::Done);
        report.elapsed = started.elapsed();

        info!(
            source = %report.source,
            located = report.located,
            resolved = report.resolved,
            extracted = report.extracted,
            failed = report.failed,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Source finished"
        );

        report
    }

    /// Locate candidates and resolve their URLs
    ///
    /// Synchronous: the parsed document never lives across an await.
    pub fn discover(&self, html: &str, base_url: &Url) -> Discovery {
        let document = Html::parse_document(html);
        let candidates = self.locator.locate(&document);
        if candidates.is_empty() {
            return Discovery::default();
        }

        let urls = self.resolver.resolve(&candidates, base_url);
        debug!(
            base = %base_url,
            located = candidates.len(),
            resolved = urls.len(),
            "Front page discovered"
        );

        Discovery {
            located: candidates.len(),
            urls,
        }
    }
}

/// One article task: fetch, then parse
async fn extract_article(
    fetcher: &PageFetcher,
    parser: &ArticleParser,
    stats: &PipelineStats,
    url: &str,
    source_name: &str,
) -> std::result::Result<ArticleRecord, CrawlerError> {
    let html = fetcher.fetch_with_retry(url).await;
    stats.record_fetch(html.is_ok());

    match parser.parse(&html?, url, source_name) {
        Ok(record) => {
            stats.record_extracted();
            Ok(record)
        }
        Err(e) => {
            stats.record_invalid();
            Err(e.into())
        }
    }
}

fn advance(report: &mut SourceReport, next: SourceState) {
    debug_assert!(
        report.state.can_transition_to(next),
        "illegal transition {} -> {}",
        report.state,
        next
    );
    debug!(source = %report.source, from = %report.state, to = %next, "Source state changed");
    report.state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> CrawlPipeline {
        CrawlPipeline::new(&Config::default()).unwrap()
    }

    fn front_page(hrefs: &[&str]) -> String {
        hrefs
            .iter()
            .map(|href| format!(r#"<article><h2><a href="{href}">Titulo</a></h2></article>"#))
            .collect()
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = PipelineStats::new();
        stats.record_fetch(true);
        stats.record_fetch(true);
        stats.record_fetch(false);
        stats.record_extracted();
        stats.record_invalid();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.pages_fetched, 2);
        assert_eq!(snapshot.fetch_failures, 1);
        assert_eq!(snapshot.articles_extracted, 1);
        assert_eq!(snapshot.articles_invalid, 1);
        assert!((snapshot.fetch_success_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(StatsSnapshot::default().fetch_success_rate(), 1.0);
    }

    #[tokio::test]
    async fn test_discover_filters_off_domain() {
        let html = front_page(&[
            "/nota/1-intendenta-recorrio",
            "/nota/2-obras-en-rivadavia",
            "https://www.example.com/nota/3-nuevo-hospital",
            "/nota/4-concejo-deliberante",
            "https://other.com/nota/5-fuera",
        ]);
        let base = Url::parse("https://example.com/").unwrap();
        let discovery = pipeline().discover(&html, &base);

        assert_eq!(discovery.located, 5);
        assert_eq!(discovery.urls.len(), 4);
        assert!(discovery.urls.iter().all(|u| !u.contains("other.com")));
        assert!(discovery.check(3).is_ok());
    }

    #[tokio::test]
    async fn test_discover_empty_page() {
        let base = Url::parse("https://example.com/").unwrap();
        let discovery = pipeline().discover("<p>mantenimiento</p>", &base);
        assert_eq!(discovery, Discovery::default());
        assert!(matches!(
            discovery.check(3),
            Err(CrawlerError::NoCandidates { min: 3 })
        ));
    }

    #[tokio::test]
    async fn test_discover_without_valid_urls() {
        let html = front_page(&["/categoria/politica", "/tag/obras", "https://other.com/a/b/c"]);
        let base = Url::parse("https://example.com/").unwrap();
        let discovery = pipeline().discover(&html, &base);
        assert_eq!(discovery.located, 3);
        let err = discovery.check(3).unwrap_err();
        assert!(matches!(err, CrawlerError::NoUrls));
        assert_eq!(err.category(), crate::error::ErrorCategory::Discovery);
    }

    #[tokio::test]
    async fn test_empty_source_list_is_fatal() {
        let err = pipeline().run(&[]).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.category(), crate::error::ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_invalid_source_url_fails_fetch() {
        let report = pipeline()
            .crawl_source(&Source::new("Roto", "no es una url"))
            .await;
        assert_eq!(report.state, SourceState::FailedFetch);
        assert!(report.records.is_empty());
    }
}
