//! Execution context handed to every module.
//!
//! The context is the module's window into the engine: engine-wide settings,
//! the outputs of already-completed pipelines, the document factory, the
//! execution cache, and `execute_nested` — the recursive invocation mechanism
//! that lets a module drive a sub-graph of modules against an arbitrary
//! document list. Contexts are cheap to clone and safe to move across tasks;
//! sibling nested executions share nothing mutable beyond the cache and the
//! append-only document pool.

use std::sync::Arc;

use serde_json::Value;
use strata_doc::{Content, Document, DocumentFactory};
use strata_meta::{FromMetadata, Metadata, MetadataValue, convert, kind};
use tracing::{debug, error};

use crate::cache::ExecutionCache;
use crate::collection::DocumentCollection;
use crate::error::{EngineError, Result};
use crate::module::Module;

struct ContextInner {
    settings: Metadata,
    factory: Arc<dyn DocumentFactory>,
    cache: Arc<ExecutionCache>,
    documents: DocumentCollection,
    max_nesting: usize,
}

/// Per-module execution context.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
    pipeline: String,
    module: String,
    depth: usize,
}

impl ExecutionContext {
    pub(crate) fn root(
        settings: Metadata,
        factory: Arc<dyn DocumentFactory>,
        cache: Arc<ExecutionCache>,
        documents: DocumentCollection,
        max_nesting: usize,
        pipeline: &str,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                settings,
                factory,
                cache,
                documents,
                max_nesting,
            }),
            pipeline: pipeline.to_string(),
            module: String::new(),
            depth: 0,
        }
    }

    /// Engine-wide initial metadata (read-only).
    pub fn settings(&self) -> &Metadata {
        &self.inner.settings
    }

    /// Outputs of all pipelines completed earlier in this pass, deduplicated
    /// by document identity.
    pub fn documents(&self) -> &DocumentCollection {
        &self.inner.documents
    }

    /// The shared execution cache for per-module memoization.
    pub fn cache(&self) -> &ExecutionCache {
        &self.inner.cache
    }

    /// Name of the pipeline this execution belongs to.
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Name of the currently executing module (empty at the pipeline root).
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Current nesting depth (0 = top-level pipeline execution).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The canonical way modules construct derived documents. Delegates to
    /// the document factory: clones `source` when given, otherwise starts
    /// from the engine's initial metadata.
    pub fn new_document(
        &self,
        source: Option<&Document>,
        content: Option<Content>,
        extra_metadata: Vec<(String, MetadataValue)>,
    ) -> Result<Document> {
        Ok(self.inner.factory.derive(source, content, extra_metadata)?)
    }

    /// Run a module list as its own mini-pipeline and return its outputs.
    ///
    /// With `inputs` absent or empty, a single synthetic document built from
    /// the initial metadata plus `extra_metadata` is the sole input (letting
    /// a module synthesize content from nothing); with non-empty inputs,
    /// `extra_metadata` is unused. Fully recursive — a running module may
    /// call this to arbitrary depth, bounded by the configured limit so a
    /// runaway recursion fails deterministically instead of exhausting the
    /// stack.
    pub async fn execute_nested(
        &self,
        modules: &[Arc<dyn Module>],
        inputs: Option<Vec<Document>>,
        extra_metadata: Vec<(String, MetadataValue)>,
    ) -> Result<Vec<Document>> {
        if self.depth >= self.inner.max_nesting {
            return Err(EngineError::NestingTooDeep(self.inner.max_nesting));
        }

        let mut documents = match inputs {
            Some(docs) if !docs.is_empty() => docs,
            _ => vec![self.inner.factory.new_document(extra_metadata)],
        };

        for module in modules {
            let name = module.name().to_string();
            let child = ExecutionContext {
                inner: self.inner.clone(),
                pipeline: self.pipeline.clone(),
                module: name.clone(),
                depth: self.depth + 1,
            };

            debug!(
                pipeline = %self.pipeline,
                module = %name,
                depth = child.depth,
                inputs = documents.len(),
                "module started"
            );

            documents = match module.execute(documents, &child).await {
                Ok(outputs) => outputs,
                // Already carries module/pipeline identity from a deeper
                // wrap; keep the innermost context.
                Err(err @ EngineError::ModuleFailed { .. }) => return Err(err),
                Err(err) => {
                    error!(
                        pipeline = %self.pipeline,
                        module = %name,
                        error = %err,
                        "module failed"
                    );
                    return Err(EngineError::ModuleFailed {
                        pipeline: self.pipeline.clone(),
                        module: name,
                        message: err.to_string(),
                    });
                }
            };

            debug!(
                pipeline = %self.pipeline,
                module = %name,
                outputs = documents.len(),
                "module completed"
            );
        }

        Ok(documents)
    }

    /// Convert an arbitrary value with the metadata conversion rules. A
    /// failure names the source and target types and, when a document is
    /// given, its source path.
    pub fn convert<T: FromMetadata>(&self, value: &Value, document: Option<&Document>) -> Result<T> {
        convert(value).ok_or_else(|| {
            let mut message = format!("cannot convert {} to {}", kind(value), T::type_name());
            if let Some(path) = document.and_then(|d| d.source()) {
                message.push_str(&format!(" (document: {})", path.display()));
            }
            EngineError::Conversion(message)
        })
    }

    /// Build a module failure carrying this context's identity and, when
    /// known, the offending document's source path.
    pub fn module_failure(
        &self,
        document: Option<&Document>,
        message: impl Into<String>,
    ) -> EngineError {
        let mut message = message.into();
        if let Some(path) = document.and_then(|d| d.source()) {
            message.push_str(&format!(" (document: {})", path.display()));
        }
        EngineError::ModuleFailed {
            pipeline: self.pipeline.clone(),
            module: self.module.clone(),
            message,
        }
    }
}
