//! Front page discovery and article crawling
//!
//! [`fetcher`] retrieves pages under the shared limiter, [`locator`] and
//! [`url`] turn a front page into article URLs, and [`pipeline`] drives
//! every source through both.

pub mod fetcher;
pub mod locator;
pub mod pipeline;
pub mod url;

pub use fetcher::PageFetcher;
pub use locator::{ArticleCandidate, ArticleLocator};
pub use pipeline::{CrawlPipeline, Discovery, PipelineStats, StatsSnapshot};
pub use url::UrlResolver;
