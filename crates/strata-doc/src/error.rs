//! Error types for document payload access.

use thiserror::Error;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors that can occur when constructing or reading documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Payload touched after its stream was disposed. Fatal to the operation,
    /// not to the run, unless left unhandled.
    #[error("document payload used after dispose")]
    UseAfterDispose,

    /// A supplied stream could not be read, buffered, or decoded.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Underlying I/O failure while materializing a payload.
    #[error("payload I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata resolution failure surfaced through a document.
    #[error(transparent)]
    Metadata(#[from] strata_meta::MetadataError),
}
