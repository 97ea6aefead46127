//! Error types for the spectrum accessor.

use crate::pipeline::PipelineError;
use crate::source::SourceError;

/// Errors that can occur while accessing spectra
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Invalid or conflicting settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The file does not support a requested feature
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Lookup by identifier found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// A bulk walk was cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// Error raised by the record source
    #[error(transparent)]
    Source(#[from] SourceError),

    /// TOML configuration parse error
    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AccessError {
    /// Whether this error reports a missing record or identifier.
    pub fn is_not_found(&self) -> bool {
        match self {
            AccessError::NotFound(_) => true,
            AccessError::Source(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<PipelineError> for AccessError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Configuration(msg) => AccessError::Configuration(msg),
            PipelineError::UnsupportedFeature(msg) => AccessError::UnsupportedFeature(msg),
            PipelineError::Source(e) => AccessError::Source(e),
        }
    }
}
