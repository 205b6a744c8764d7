use anyhow::Result;

use portada::config::Config;
use portada::storage::{ArticleStore, SqliteArticleStore};

pub fn stats(config: &Config, source: Option<&str>) -> Result<()> {
    let database = &config.database.sqlite_path;
    if !database.exists() {
        println!("Database not found: {}", database.display());
        println!("Run a crawl first to create the database.");
        return Ok(());
    }

    let store = SqliteArticleStore::new(database)?;

    println!("Article Statistics");
    println!("==================");
    println!("Database: {}", database.display());
    println!();

    if let Some(name) = source {
        let records = store.by_source(name)?;
        println!("{name}: {} articles", records.len());
        if let Some(latest) = records.first() {
            match latest.published_at() {
                Some(date) => println!("  Latest: {} ({date})", latest.title()),
                None => println!("  Latest: {}", latest.title()),
            }
        }
        return Ok(());
    }

    let total = store.count()?;
    println!("Total articles: {total}");
    for entry in store.source_counts()? {
        println!(
            "  {:<28} {:>6} ({:.1}%)",
            entry.source,
            entry.articles,
            if total > 0 {
                entry.articles as f64 / total as f64 * 100.0
            } else {
                0.0
            }
        );
    }

    Ok(())
}

pub fn sources(config: &Config) {
    println!("Configured Sources");
    println!("==================");
    for source in &config.sources {
        println!(
            "  [{}] {:<28} {}",
            if source.enabled { "x" } else { " " },
            source.name,
            source.url
        );
    }
    println!();
    println!(
        "{} of {} sources enabled",
        config.enabled_sources().len(),
        config.sources.len()
    );
}
