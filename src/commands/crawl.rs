use anyhow::{Context, Result};
use std::time::Instant;

use portada::classifier::{KeywordFilter, RelevanceFilter};
use portada::config::Config;
use portada::crawler::CrawlPipeline;
use portada::models::{CrawlReport, SourceState};
use portada::storage::{ArticleStore, BulkInsertStats, MemoryArticleStore, SqliteArticleStore};
use portada::utils::truncate_text;

/// Command-line overrides for a crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub source: Option<String>,
    pub concurrency: Option<usize>,
    pub dry_run: bool,
    pub classify: bool,
}

pub async fn crawl(mut config: Config, options: CrawlOptions) -> Result<()> {
    if let Some(concurrency) = options.concurrency {
        config.crawler.max_concurrent_requests = concurrency;
    }
    if options.classify {
        config.classifier.enabled = true;
    }
    config.validate().context("Invalid configuration")?;

    let sources = match &options.source {
        Some(name) => vec![config
            .source_by_name(name)
            .cloned()
            .with_context(|| format!("Unknown source: {name}"))?],
        None => config.enabled_sources(),
    };

    println!("Starting news harvest");
    println!("=====================");
    println!("Sources: {}", sources.len());
    println!("Concurrency: {}", config.crawler.max_concurrent_requests);
    if options.dry_run {
        println!("Dry run: results are not persisted");
    } else {
        println!("Database: {}", config.database.sqlite_path.display());
    }
    println!();

    let start = Instant::now();

    let store: Box<dyn ArticleStore> = if options.dry_run {
        Box::new(MemoryArticleStore::new())
    } else {
        Box::new(SqliteArticleStore::new(&config.database.sqlite_path)?)
    };

    let pipeline = CrawlPipeline::new(&config)?;
    let report = pipeline.run(&sources).await?;

    print_source_lines(&report);

    let totals = SummaryTotals::from_report(&report);
    let records = report.into_records();
    let insert_stats = store.insert_bulk(&records);

    let keywords = KeywordFilter::new(&config.classifier.keywords);
    let candidates = keywords.filter(records);
    if !keywords.is_empty() {
        println!("\nKeyword matches: {}", candidates.len());
    }

    if config.classifier.enabled {
        classify(&config, store.as_ref(), &candidates).await?;
    }

    print_summary(&totals, &insert_stats, start.elapsed().as_secs_f64());

    let stats = pipeline.stats();
    println!(
        "Fetch success rate: {:.1}% ({} pages, {} failures)",
        stats.fetch_success_rate() * 100.0,
        stats.pages_fetched,
        stats.fetch_failures
    );

    Ok(())
}

async fn classify(
    config: &Config,
    store: &dyn ArticleStore,
    candidates: &[portada::ArticleRecord],
) -> Result<()> {
    let filter = RelevanceFilter::from_config(&config.classifier)
        .context("Failed to create relevance classifier")?;

    println!("\nClassifying {} articles...", candidates.len());

    for record in candidates {
        let verdict = filter.evaluate(record).await;
        if verdict.is_relevant {
            println!(
                "  [{:.2}] {} ({})",
                verdict.score,
                truncate_text(record.title(), 70),
                record.source_name()
            );
        }
        if let Err(e) = store.save_classification(record.url(), &verdict) {
            tracing::warn!(url = %record.url(), error = %e, "Failed to store classification");
        }
    }

    let stats = filter.stats();
    println!("\nClassification");
    println!("--------------");
    println!("Analyzed: {}", stats.analyzed);
    println!("Relevant: {}", stats.relevant);
    println!("Not relevant: {}", stats.not_relevant);
    println!("Errors: {}", stats.errors);

    Ok(())
}

fn print_source_lines(report: &CrawlReport) {
    println!(
        "{:<28} {:<14} {:>7} {:>8} {:>9} {:>6} {:>8}",
        "Source", "State", "Located", "Resolved", "Extracted", "Failed", "Elapsed"
    );
    for source in &report.sources {
        println!(
            "{:<28} {:<14} {:>7} {:>8} {:>9} {:>6} {:>7.1}s",
            truncate_text(&source.source, 28),
            source.state.as_str(),
            source.located,
            source.resolved,
            source.extracted,
            source.failed,
            source.elapsed.as_secs_f64()
        );
    }
}

/// Report figures captured before the records are moved out
struct SummaryTotals {
    sources: usize,
    done: usize,
    failed_fetch: usize,
    failed_empty: usize,
    extracted: usize,
    failed: usize,
    secs_per_article: Option<f64>,
}

impl SummaryTotals {
    fn from_report(report: &CrawlReport) -> Self {
        Self {
            sources: report.sources.len(),
            done: report.count_in_state(SourceState::Done),
            failed_fetch: report.count_in_state(SourceState::FailedFetch),
            failed_empty: report.count_in_state(SourceState::FailedEmpty),
            extracted: report.total_extracted(),
            failed: report.total_failed(),
            secs_per_article: report.secs_per_article(),
        }
    }
}

fn print_summary(totals: &SummaryTotals, inserted: &BulkInsertStats, elapsed_secs: f64) {
    println!("\nCrawl Summary");
    println!("=============");
    println!(
        "Sources: {} ({} done, {} fetch failures, {} empty)",
        totals.sources, totals.done, totals.failed_fetch, totals.failed_empty
    );
    println!("Records: {}", totals.extracted);
    println!("Failed articles: {}", totals.failed);
    println!("Inserted: {}", inserted.inserted);
    println!("Duplicates: {}", inserted.duplicates);
    println!("Errors: {}", inserted.errors);
    println!("Elapsed: {elapsed_secs:.1}s");
    match totals.secs_per_article {
        Some(avg) => println!("Average: {avg:.2}s per article"),
        None => println!("Average: n/a"),
    }
}
