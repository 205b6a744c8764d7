//! Repository pattern for article persistence
//!
//! The crawl only depends on [`ArticleStore`]; the URL is the dedup key and
//! nothing else about the schema leaks out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              crawl command / relevance filter               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ArticleStore                           │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                           │
//!                  ▼                           ▼
//!        ┌─────────────────┐         ┌─────────────────┐
//!        │     SQLite      │         │    In-memory    │
//!        └─────────────────┘         └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use portada::storage::{ArticleStore, SqliteArticleStore};
//!
//! let store = SqliteArticleStore::new("data/noticias.db")?;
//! let stats = store.insert_bulk(&records);
//! println!("{} new, {} duplicates", stats.inserted, stats.duplicates);
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::classifier::Classification;
use crate::models::ArticleRecord;

/// Publication timestamps; fractional seconds are written only when present
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ============================================================================
// Core Types
// ============================================================================

/// Result of inserting one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same URL already exists
    Duplicate,
}

/// Aggregate result of a bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkInsertStats {
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
}

impl BulkInsertStats {
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.errors
    }
}

/// Per-source article count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
    pub source: String,
    pub articles: usize,
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Persistence contract for extracted articles
pub trait ArticleStore: Send + Sync {
    /// Insert a record unless its URL is already stored
    fn insert(&self, record: &ArticleRecord) -> Result<InsertOutcome>;

    /// Insert many records; failures are counted, never raised
    fn insert_bulk(&self, records: &[ArticleRecord]) -> BulkInsertStats {
        let mut stats = BulkInsertStats::default();
        for record in records {
            match self.insert(record) {
                Ok(InsertOutcome::Inserted) => stats.inserted += 1,
                Ok(InsertOutcome::Duplicate) => stats.duplicates += 1,
                Err(e) => {
                    tracing::warn!(url = %record.url(), error = %e, "Failed to store article");
                    stats.errors += 1;
                }
            }
        }
        stats
    }

    /// Total stored articles
    fn count(&self) -> Result<usize>;

    /// Articles of one source, newest extraction first
    fn by_source(&self, source_name: &str) -> Result<Vec<ArticleRecord>>;

    /// Article counts per source, largest first
    fn source_counts(&self) -> Result<Vec<SourceCount>>;

    /// Attach a classification verdict to a stored article
    fn save_classification(&self, url: &str, classification: &Classification) -> Result<()>;

    /// Verdict stored for a URL, if any
    fn classification(&self, url: &str) -> Result<Option<Classification>>;

    /// Remove every article and verdict
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of [`ArticleStore`]
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteArticleStore {
    conn: Mutex<Connection>,
}

impl SqliteArticleStore {
    /// Open (or create) the database file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory SQLite")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection mutex poisoned"))
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS articles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    url TEXT NOT NULL UNIQUE,
                    source_name TEXT NOT NULL,
                    title TEXT NOT NULL,
                    subtitle TEXT,
                    body TEXT NOT NULL,
                    published_at TEXT,
                    scraped_at TEXT NOT NULL,
                    content_hash TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_articles_source
                    ON articles(source_name);

                CREATE INDEX IF NOT EXISTS idx_articles_hash
                    ON articles(content_hash);

                CREATE TABLE IF NOT EXISTS classifications (
                    url TEXT PRIMARY KEY REFERENCES articles(url) ON DELETE CASCADE,
                    is_relevant INTEGER NOT NULL,
                    score REAL NOT NULL,
                    rationale TEXT NOT NULL,
                    keywords TEXT NOT NULL,
                    classified_at TEXT NOT NULL
                );
                "#,
        )
        .context("Failed to create SQLite schema")?;

        Ok(())
    }
}

/// Raw `articles` row before validation
struct ArticleRow {
    url: String,
    source_name: String,
    title: String,
    subtitle: Option<String>,
    body: String,
    published_at: Option<String>,
    scraped_at: String,
}

impl ArticleRow {
    fn into_record(self) -> Result<ArticleRecord> {
        let published_at = self
            .published_at
            .as_deref()
            .map(|s| NaiveDateTime::parse_from_str(s, DATETIME_FORMAT))
            .transpose()
            .context("Invalid published_at in database")?;
        let scraped_at = DateTime::parse_from_rfc3339(&self.scraped_at)
            .map(|dt| dt.with_timezone(&Utc))
            .context("Invalid scraped_at in database")?;

        ArticleRecord::with_scraped_at(
            self.url,
            self.source_name,
            self.title,
            self.subtitle,
            self.body,
            published_at,
            scraped_at,
        )
        .map_err(|e| anyhow!("Invalid stored article: {e}"))
    }
}

impl ArticleStore for SqliteArticleStore {
    fn insert(&self, record: &ArticleRecord) -> Result<InsertOutcome> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                r#"
                    INSERT OR IGNORE INTO articles
                        (url, source_name, title, subtitle, body, published_at, scraped_at, content_hash)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                params![
                    record.url(),
                    record.source_name(),
                    record.title(),
                    record.subtitle(),
                    record.body(),
                    record
                        .published_at()
                        .map(|d| d.format(DATETIME_FORMAT).to_string()),
                    record.scraped_at().to_rfc3339(),
                    record.content_hash(),
                ],
            )
            .context("Failed to insert article")?;

        Ok(if changed == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn by_source(&self, source_name: &str) -> Result<Vec<ArticleRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT url, source_name, title, subtitle, body, published_at, scraped_at
                 FROM articles WHERE source_name = ?1 ORDER BY scraped_at DESC, id DESC",
            )
            .context("Failed to prepare source query")?;

        let rows = stmt
            .query_map(params![source_name], |row| {
                Ok(ArticleRow {
                    url: row.get(0)?,
                    source_name: row.get(1)?,
                    title: row.get(2)?,
                    subtitle: row.get(3)?,
                    body: row.get(4)?,
                    published_at: row.get(5)?,
                    scraped_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ArticleRow::into_record).collect()
    }

    fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT source_name, COUNT(*) FROM articles
             GROUP BY source_name ORDER BY COUNT(*) DESC, source_name",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok(SourceCount {
                    source: row.get(0)?,
                    articles: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }

    fn save_classification(&self, url: &str, classification: &Classification) -> Result<()> {
        let conn = self.conn()?;
        let keywords = serde_json::to_string(&classification.keywords)?;
        conn.execute(
            r#"
                INSERT OR REPLACE INTO classifications
                    (url, is_relevant, score, rationale, keywords, classified_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            params![
                url,
                classification.is_relevant,
                classification.score,
                classification.rationale,
                keywords,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to save classification")?;
        Ok(())
    }

    fn classification(&self, url: &str) -> Result<Option<Classification>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT is_relevant, score, rationale, keywords FROM classifications WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, bool>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .context("Failed to get classification")?;

        row.map(|(is_relevant, score, rationale, keywords)| -> Result<Classification> {
            Ok(Classification {
                is_relevant,
                score,
                rationale,
                keywords: serde_json::from_str(&keywords)?,
            })
        })
        .transpose()
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch("DELETE FROM classifications; DELETE FROM articles;")
            .context("Failed to clear store")?;
        Ok(())
    }
}

// ============================================================================
// In-memory Implementation
// ============================================================================

#[derive(Default)]
struct MemoryState {
    records: Vec<ArticleRecord>,
    urls: HashSet<String>,
    classifications: HashMap<String, Classification>,
}

/// In-memory implementation of [`ArticleStore`]
///
/// Useful for dry runs and tests without a database file.
#[derive(Default)]
pub struct MemoryArticleStore {
    state: RwLock<MemoryState>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| anyhow!("Store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| anyhow!("Store lock poisoned"))
    }
}

impl ArticleStore for MemoryArticleStore {
    fn insert(&self, record: &ArticleRecord) -> Result<InsertOutcome> {
        let mut state = self.write()?;
        if !state.urls.insert(record.url().to_string()) {
            return Ok(InsertOutcome::Duplicate);
        }
        state.records.push(record.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    fn by_source(&self, source_name: &str) -> Result<Vec<ArticleRecord>> {
        Ok(self
            .read()?
            .records
            .iter()
            .rev()
            .filter(|r| r.source_name() == source_name)
            .cloned()
            .collect())
    }

    fn source_counts(&self) -> Result<Vec<SourceCount>> {
        let state = self.read()?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &state.records {
            *counts.entry(record.source_name()).or_default() += 1;
        }

        let mut counts: Vec<SourceCount> = counts
            .into_iter()
            .map(|(source, articles)| SourceCount {
                source: source.to_string(),
                articles,
            })
            .collect();
        counts.sort_by(|a, b| b.articles.cmp(&a.articles).then_with(|| a.source.cmp(&b.source)));
        Ok(counts)
    }

    fn save_classification(&self, url: &str, classification: &Classification) -> Result<()> {
        let mut state = self.write()?;
        if !state.urls.contains(url) {
            anyhow::bail!("No stored article for {url}");
        }
        state
            .classifications
            .insert(url.to_string(), classification.clone());
        Ok(())
    }

    fn classification(&self, url: &str) -> Result<Option<Classification>> {
        Ok(self.read()?.classifications.get(url).cloned())
    }

    fn clear(&self) -> Result<()> {
        *self.write()? = MemoryState::default();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
