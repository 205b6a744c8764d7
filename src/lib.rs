//! portada - Regional news harvester
//!
//! Crawls the front pages of a configured list of news sites, locates the
//! article teasers on each, and extracts title, subtitle, body and
//! publication date from every linked article under a global concurrency cap.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Fetching, front page discovery and the crawl pipeline
//! - [`parser`] - Article content and publication date extraction
//! - [`models`] - Core data structures and types
//! - [`storage`] - Article persistence (SQLite, in-memory)
//! - [`classifier`] - Keyword pre-filter and remote relevance classification
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use portada::config::Config;
//! use portada::crawler::CrawlPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let pipeline = CrawlPipeline::new(&config)?;
//!     let report = pipeline.run(&config.enabled_sources()).await?;
//!     println!("{} articles", report.total_extracted());
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod parser;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::classifier::{Classification, KeywordFilter, RelevanceFilter};
    pub use crate::config::Config;
    pub use crate::crawler::CrawlPipeline;
    pub use crate::error::{Error, ErrorCategory, PortadaErrorTrait, Result};
    pub use crate::models::{ArticleRecord, CrawlReport, Source, SourceReport, SourceState};
    pub use crate::parser::ArticleParser;
    pub use crate::storage::{ArticleStore, MemoryArticleStore, SqliteArticleStore};
}

// Direct re-exports for convenience
pub use models::{ArticleRecord, CrawlReport, Source, SourceReport, SourceState};
