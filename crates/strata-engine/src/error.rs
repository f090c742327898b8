//! Error types for the pipeline engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while configuring or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A module's execute failed. Wraps the underlying error with the module
    /// and pipeline identity (and the offending document's source path when
    /// the module attached one).
    #[error("module '{module}' failed in pipeline '{pipeline}': {message}")]
    ModuleFailed {
        pipeline: String,
        module: String,
        message: String,
    },

    /// Two documents in one pipeline's output share a non-empty source path.
    #[error("duplicate source path '{path}' in pipeline '{pipeline}'")]
    DuplicateSource { pipeline: String, path: String },

    /// A pipeline with this name is already registered.
    #[error("pipeline already registered: {0}")]
    DuplicatePipeline(String),

    /// No pipeline with this name exists.
    #[error("pipeline not found: {0}")]
    UnknownPipeline(String),

    /// Nested module execution exceeded the configured depth limit.
    #[error("nested execution exceeded depth limit of {0}")]
    NestingTooDeep(usize),

    /// A value could not be converted to the requested type.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// Document payload failure.
    #[error(transparent)]
    Document(#[from] strata_doc::DocumentError),

    /// Metadata resolution or strict-access failure.
    #[error(transparent)]
    Metadata(#[from] strata_meta::MetadataError),
}
