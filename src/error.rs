//! Unified error handling for the portada crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain-specific errors
//! usable on their own.
//!
//! # Architecture
//!
//! - [`PortadaErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use portada::error::{Error, PortadaErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::debug!(category = ?err.category(), error = %err, "Skipping");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::classifier::ClassifierError;
pub use crate::utils::error::{CrawlerError, ExtractError, FetchError};

/// Common trait for all portada error types
pub trait PortadaErrorTrait: std::error::Error {
    /// Check if a later attempt or the next item can still succeed
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP status, timeout, transport, decoding)
    Network,
    /// Content extraction errors
    Parsing,
    /// Front page yielded no usable articles
    Discovery,
    /// Relevance classification errors
    Classification,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Short lowercase label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Discovery => "discovery",
            Self::Classification => "classification",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the portada crate
#[derive(Error, Debug)]
pub enum Error {
    /// Source or article level crawl errors
    #[error("Crawler error: {0}")]
    Crawler(#[from] CrawlerError),

    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Extraction-specific errors
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Classification service errors
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl PortadaErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        self.is_transient()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl PortadaErrorTrait for ExtractError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

impl PortadaErrorTrait for CrawlerError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Extract(_) | Self::NoCandidates { .. } | Self::NoUrls => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Extract(_) => ErrorCategory::Parsing,
            Self::NoCandidates { .. } | Self::NoUrls => ErrorCategory::Discovery,
        }
    }
}

impl PortadaErrorTrait for ClassifierError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Classification
    }
}

impl PortadaErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Crawler(e) => e.is_recoverable(),
            Self::Fetch(e) => e.is_recoverable(),
            Self::Extract(e) => e.is_recoverable(),
            Self::Classifier(e) => e.is_recoverable(),
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Crawler(e) => e.category(),
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Extract(_) => ErrorCategory::Parsing,
            Self::Classifier(_) => ErrorCategory::Classification,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
