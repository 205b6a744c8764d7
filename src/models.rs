// Core data structures for the portada harvester

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::utils::error::ExtractError;

/// One news site to crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    /// Front page URL
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
        }
    }
}

/// An extracted article
///
/// Only constructible through [`ArticleRecord::new`], which rejects empty
/// `url`, `source_name`, `title` or `body`. The record is never mutated
/// after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    url: String,
    source_name: String,
    title: String,
    subtitle: Option<String>,
    body: String,
    published_at: Option<NaiveDateTime>,
    scraped_at: DateTime<Utc>,
}

impl ArticleRecord {
    /// Build a record stamped with the current time
    pub fn new(
        url: impl Into<String>,
        source_name: impl Into<String>,
        title: impl Into<String>,
        subtitle: Option<String>,
        body: impl Into<String>,
        published_at: Option<NaiveDateTime>,
    ) -> Result<Self, ExtractError> {
        Self::with_scraped_at(
            url,
            source_name,
            title,
            subtitle,
            body,
            published_at,
            Utc::now(),
        )
    }

    /// Build a record with an explicit extraction time (used when loading from storage)
    pub fn with_scraped_at(
        url: impl Into<String>,
        source_name: impl Into<String>,
        title: impl Into<String>,
        subtitle: Option<String>,
        body: impl Into<String>,
        published_at: Option<NaiveDateTime>,
        scraped_at: DateTime<Utc>,
    ) -> Result<Self, ExtractError> {
        let url = url.into();
        let source_name = source_name.into();
        let title = title.into();
        let body = body.into();

        for (field, value) in [
            ("url", &url),
            ("source_name", &source_name),
            ("title", &title),
            ("body", &body),
        ] {
            if value.trim().is_empty() {
                return Err(ExtractError::MissingField(field));
            }
        }

        Ok(Self {
            url,
            source_name,
            title,
            subtitle: subtitle.filter(|s| !s.trim().is_empty()),
            body,
            published_at,
            scraped_at,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn published_at(&self) -> Option<NaiveDateTime> {
        self.published_at
    }

    pub fn scraped_at(&self) -> DateTime<Utc> {
        self.scraped_at
    }

    /// SHA-256 over title and body, hex encoded
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.body.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Title, subtitle and body in one lowercase string, for keyword matching
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(self.title.len() + self.body.len() + 2);
        text.push_str(&self.title);
        text.push(' ');
        if let Some(subtitle) = &self.subtitle {
            text.push_str(subtitle);
            text.push(' ');
        }
        text.push_str(&self.body);
        text.to_lowercase()
    }
}

/// Per-source crawl state
///
/// `Pending → FrontPageFetched → ArticlesLocated → UrlsResolved → Extracting → Done`,
/// with `FailedFetch` and `FailedEmpty` as the two early exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Pending,
    FrontPageFetched,
    ArticlesLocated,
    UrlsResolved,
    Extracting,
    Done,
    FailedEmpty,
    FailedFetch,
}

impl SourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::FrontPageFetched => "front_page_fetched",
            Self::ArticlesLocated => "articles_located",
            Self::UrlsResolved => "urls_resolved",
            Self::Extracting => "extracting",
            Self::Done => "done",
            Self::FailedEmpty => "failed_empty",
            Self::FailedFetch => "failed_fetch",
        }
    }

    /// Whether the source has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::FailedEmpty | Self::FailedFetch)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: SourceState) -> bool {
        use SourceState::*;
        matches!(
            (self, next),
            (Pending, FrontPageFetched)
                | (Pending, FailedFetch)
                | (FrontPageFetched, ArticlesLocated)
                | (FrontPageFetched, FailedEmpty)
                | (ArticlesLocated, UrlsResolved)
                | (ArticlesLocated, FailedEmpty)
                | (UrlsResolved, Extracting)
                | (Extracting, Done)
        )
    }
}

impl std::fmt::Display for SourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of crawling one source
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub state: SourceState,
    /// Candidate containers found on the front page
    pub located: usize,
    /// Distinct article URLs after validation
    pub resolved: usize,
    /// Valid records extracted
    pub extracted: usize,
    /// URLs that yielded no record
    pub failed: usize,
    pub elapsed: Duration,
    pub records: Vec<ArticleRecord>,
}

impl SourceReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: SourceState::Pending,
            located: 0,
            resolved: 0,
            extracted: 0,
            failed: 0,
            elapsed: Duration::ZERO,
            records: Vec::new(),
        }
    }
}

/// Aggregate outcome of a run over all sources
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub sources: Vec<SourceReport>,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn total_located(&self) -> usize {
        self.sources.iter().map(|s| s.located).sum()
    }

    pub fn total_resolved(&self) -> usize {
        self.sources.iter().map(|s| s.resolved).sum()
    }

    pub fn total_extracted(&self) -> usize {
        self.sources.iter().map(|s| s.extracted).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.sources.iter().map(|s| s.failed).sum()
    }

    /// Sources that finished in the given state
    pub fn count_in_state(&self, state: SourceState) -> usize {
        self.sources.iter().filter(|s| s.state == state).count()
    }

    /// Average wall-clock seconds per extracted article
    pub fn secs_per_article(&self) -> Option<f64> {
        let extracted = self.total_extracted();
        (extracted > 0).then(|| self.elapsed.as_secs_f64() / extracted as f64)
    }

    pub fn records(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.sources.iter().flat_map(|s| s.records.iter())
    }

    pub fn into_records(self) -> Vec<ArticleRecord> {
        self.sources.into_iter().flat_map(|s| s.records).collect()
    }
}
