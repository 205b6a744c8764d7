//! Keyword pre-filter
//!
//! Cheap local check run before the remote classifier: a record is kept
//! when its title, subtitle or body mentions any configured keyword.

use crate::models::ArticleRecord;
use crate::utils::normalize_text;

/// Case-insensitive substring matcher over article text
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Keywords are lowercased and diacritic-normalized like extracted text
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| normalize_text(k.as_ref().trim()).to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keywords found in the record, in configuration order
    pub fn matched<'a>(&'a self, record: &ArticleRecord) -> Vec<&'a str> {
        let text = record.searchable_text();
        self.keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Whether the record should go on to classification
    ///
    /// An empty keyword list keeps everything.
    pub fn matches(&self, record: &ArticleRecord) -> bool {
        self.keywords.is_empty() || !self.matched(record).is_empty()
    }

    /// Keep the matching records
    pub fn filter(&self, records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
