//! Error types for description parsing.

use thiserror::Error;

/// Errors raised while turning description documents into models.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptionError {
    /// The document is not well-formed or lacks a required element
    #[error("Parse error: {0}")]
    Parse(String),

    /// A URL inside the document could not be resolved against its base
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as written in the document
        url: String,
        /// Why resolution failed
        reason: String,
    },
}

/// Convenience Result type alias for description parsing.
pub type Result<T> = std::result::Result<T, DescriptionError>;
