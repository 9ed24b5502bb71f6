//! Error types for the edgequake-doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Doc2MdError`]: **Fatal** for one upload. The file is rejected
//!   (no file, unsupported type, over the size ceiling) or could not be
//!   turned into any Markdown at all. Returned as `Err(Doc2MdError)` from the
//!   [`crate::convert::Converter`] entry points.
//!
//! * [`ExtractError`]: **Non-fatal**. A category-specific extraction
//!   strategy is missing or failed. The orchestrator logs it and degrades to
//!   plain-text rendering, so callers only ever see it wrapped inside
//!   [`Doc2MdError::ExtractionFailed`] when that fallback fails too.
//!
//! Type identification and converter selection never fail; they degrade to
//! an "unsupported" verdict or the `text` category instead.

use crate::pipeline::select::ConverterCategory;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doc2md library.
#[derive(Debug, Error)]
pub enum Doc2MdError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The request carried no usable file part.
    #[error("{0}")]
    NoFileProvided(String),

    /// Detection concluded the file is not a supported document type.
    #[error("Unsupported file type: {}", mime_type.as_deref().unwrap_or("unknown"))]
    UnsupportedType {
        filename: String,
        mime_type: Option<String>,
    },

    /// Content length exceeds the configured ceiling.
    #[error("File size exceeds maximum allowed size of {limit} bytes")]
    SizeLimitExceeded { limit: u64, actual: u64 },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The category strategy and the plain-text fallback both failed.
    #[error("Could not extract content from '{filename}': {detail}")]
    ExtractionFailed { filename: String, detail: String },

    /// The upload could not be written to the staging directory.
    #[error("Failed to stage upload: {source}")]
    StagingFailed {
        #[source]
        source: std::io::Error,
    },

    // ── Local file errors (CLI / library file helpers) ───────────────────
    /// A local input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be written.
    #[error("Failed to write output to '{path}': {source}")]
    OutputWriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error raised by one extraction strategy.
///
/// Never surfaces on its own: the orchestrator answers it with the
/// plain-text fallback.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// No strategy is registered for the category.
    #[error("no extraction strategy registered for '{category}'")]
    Unavailable { category: ConverterCategory },

    /// The strategy ran and reported a failure.
    #[error("{category} extraction failed: {detail}")]
    Failed {
        category: ConverterCategory,
        detail: String,
    },

    /// The strategy panicked, or its blocking task was cancelled.
    #[error("{category} extraction task aborted: {detail}")]
    TaskPanicked {
        category: ConverterCategory,
        detail: String,
    },
}

impl ExtractError {
    /// Shorthand for [`ExtractError::Failed`].
    pub fn failed(category: ConverterCategory, detail: impl std::fmt::Display) -> Self {
        ExtractError::Failed {
            category,
            detail: detail.to_string(),
        }
    }
}
