//! Error types for the portada harvester
//!
//! This module defines the domain error types used throughout the crawl.
//! None of them is fatal to a run: the orchestrator absorbs each one at the
//! smallest scope that produced it and turns it into a statistic.

use thiserror::Error;

/// Errors that can occur while retrieving a single page
#[derive(Error, Debug)]
pub enum FetchError {
    /// Per-request timeout expired
    #[error("Request timeout")]
    Timeout,

    /// Server answered with a status >= 400
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Transport level failure (DNS, connection reset, TLS, ...)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Body could not be turned into text
    #[error("Decoding error: {0}")]
    Decode(String),

    /// URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Concurrency limiter was closed while waiting for a slot
    #[error("Fetcher limiter closed")]
    LimiterClosed,
}

impl FetchError {
    /// Build a `FetchError` from a reqwest error, keeping timeouts apart
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }

    /// Whether a later attempt has a reasonable chance of succeeding
    ///
    /// Timeouts, transport failures, 429 and 5xx are transient; every other
    /// status, decoding problem or malformed URL will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::HttpStatus(code) => *code == 429 || (500..=599).contains(code),
            Self::Decode(_) | Self::InvalidUrl(_) | Self::LimiterClosed => false,
        }
    }
}

/// Reasons an extracted article page is not usable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Neither a primary heading nor `og:title` produced text
    #[error("Title not found in article")]
    TitleNotFound,

    /// Body text shorter than the configured minimum
    #[error("Body too short: {len} chars (minimum {min})")]
    BodyTooShort { len: usize, min: usize },

    /// A required record field was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// General crawl errors, scoped to a source or a single article task
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Extraction produced an invalid article
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Front page did not look like a list of articles
    #[error("Fewer than {min} article candidates found")]
    NoCandidates { min: usize },

    /// Candidates were found but none yielded a valid article URL
    #[error("No article URLs resolved")]
    NoUrls,
}
