//! Article persistence
//!
//! Extracted records are stored through the [`ArticleStore`] contract:
//! SQLite for real runs, an in-memory store for dry runs and tests.

pub mod repository;

pub use repository::{
    ArticleStore, BulkInsertStats, InsertOutcome, MemoryArticleStore, SourceCount,
    SqliteArticleStore,
};
