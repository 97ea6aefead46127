//! Error types for pipeline composition.

use thiserror::Error;

use crate::source::SourceError;

/// Errors that can occur while composing the decorator pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Incompatible decorator settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requested decorator is not available for this file
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Error raised by the underlying source while composing
    #[error(transparent)]
    Source(#[from] SourceError),
}
