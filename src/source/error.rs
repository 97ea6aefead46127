//! Error types raised by record sources.

use thiserror::Error;

/// Errors that can occur while reading from a decoding engine.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Index or identifier outside what the source holds
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested tier or processing feature is unavailable for this file
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The engine failed while decoding a record
    #[error("Record read error: {0}")]
    ReadError(String),

    /// Releasing a native record handle failed
    #[error("Release error: {0}")]
    ReleaseError(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SourceError {
    /// Whether this error signals a missing record or trace.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}
