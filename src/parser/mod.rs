//! HTML parsing and data extraction
//!
//! Article pages go through [`ArticleParser`], which runs the content
//! cascade ([`content`]) and the publication date cascade ([`date`]) over a
//! single parsed document.

pub mod content;
pub mod date;
pub mod html;
pub mod sanitize;
pub mod selectors;

pub use content::{ContentExtractor, ExtractedContent};
pub use date::{parse_iso_date, parse_spanish_date, DateExtractor};
pub use html::ArticleParser;
