//! Article page parser
//!
//! Combines the content and date cascades into one synchronous call that
//! parses the page, extracts everything and drops the DOM before returning.

use scraper::Html;
use tracing::debug;

use crate::config::ValidationConfig;
use crate::models::ArticleRecord;
use crate::parser::content::ContentExtractor;
use crate::parser::date::DateExtractor;
use crate::utils::error::ExtractError;

/// Article page parser
#[derive(Debug, Clone)]
pub struct ArticleParser {
    content: ContentExtractor,
    dates: DateExtractor,
}

impl ArticleParser {
    #[must_use]
    pub fn new(validation: &ValidationConfig) -> Self {
        Self {
            content: ContentExtractor::new(validation),
            dates: DateExtractor::new(),
        }
    }

    /// Parse one article page into a record
    ///
    /// # Errors
    ///
    /// Returns `ExtractError::TitleNotFound` or `ExtractError::BodyTooShort`
    /// when the page does not hold a usable article, and
    /// `ExtractError::MissingField` if the record cannot be built.
    pub fn parse(
        &self,
        html: &str,
        url: &str,
        source_name: &str,
    ) -> Result<ArticleRecord, ExtractError> {
        let document = Html::parse_document(html);

        let content = self.content.extract(&document);
        if let Some(reason) = content.rejection {
            debug!(url = %url, reason = %reason, "Article rejected");
            return Err(reason);
        }

        let published_at = self.dates.extract(&document, url);

        ArticleRecord::new(
            url,
            source_name,
            content.title,
            content.subtitle,
            content.body,
            published_at,
        )
    }
}

impl Default for ArticleParser {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}
