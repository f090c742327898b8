//! Error types for metadata access and conversion.

use thiserror::Error;

/// Result type for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Errors that can occur when reading or converting metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// A value is present under the key but cannot be converted to the
    /// requested type. `get_as` recovers from this locally by returning the
    /// caller's default; `require` surfaces it.
    #[error("cannot convert metadata key '{key}' from {from} to {to}")]
    Conversion {
        key: String,
        from: &'static str,
        to: &'static str,
    },

    /// Strict lookup (`require`) on a key absent from every layer.
    #[error("metadata key not found: {0}")]
    KeyNotFound(String),

    /// A lazy value's compute function failed.
    #[error("failed to resolve lazy value '{key}': {message}")]
    Resolution { key: String, message: String },
}
