//! The engine: pipeline registry and pass execution.
//!
//! A pass runs every registered pipeline in registration order. Each pipeline
//! starts from a single synthetic document carrying the engine's initial
//! metadata and sees, through its context, the outputs of every pipeline that
//! completed earlier in the same pass. Outputs are committed only when the
//! whole pass succeeds, so a failed pass never leaves a half-updated result
//! set behind.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use strata_doc::{DefaultFactory, Document, DocumentFactory};
use strata_meta::Metadata;
use tracing::{debug, info};

use crate::cache::ExecutionCache;
use crate::collection::DocumentCollection;
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::error::{EngineError, Result};
use crate::pipeline::Pipeline;

/// Outcome of one engine pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// 1-based pass counter.
    pub pass: u64,
    pub elapsed_ms: u64,
    pub pipelines: Vec<PipelineSummary>,
}

/// Per-pipeline slice of a [`RunSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub name: String,
    /// Output document count.
    pub documents: usize,
    /// True when a process-once pipeline's recorded output was replayed
    /// instead of re-running its modules.
    pub replayed: bool,
}

/// Pipeline registry and executor.
pub struct Engine {
    settings: Metadata,
    config: EngineConfig,
    pipelines: Vec<Pipeline>,
    cache: Arc<ExecutionCache>,
    factory: Arc<dyn DocumentFactory>,
    outputs: DocumentCollection,
    passes: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let settings = Metadata::from_entries(config.initial_metadata.clone());
        Self {
            factory: Arc::new(DefaultFactory::new(settings.clone())),
            cache: Arc::new(ExecutionCache::new(!config.no_cache)),
            settings,
            config,
            pipelines: Vec::new(),
            outputs: DocumentCollection::default(),
            passes: 0,
        }
    }

    /// Substitute the document factory. Must be called before the first pass
    /// to be meaningful for every document.
    pub fn with_factory(mut self, factory: Arc<dyn DocumentFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Register a pipeline. Names are unique; execution order is
    /// registration order.
    pub fn add_pipeline(&mut self, pipeline: Pipeline) -> Result<()> {
        if self.pipelines.iter().any(|p| p.name() == pipeline.name()) {
            return Err(EngineError::DuplicatePipeline(pipeline.name().to_string()));
        }
        self.pipelines.push(pipeline);
        Ok(())
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name() == name)
    }

    /// Strict lookup: `UnknownPipeline` when no pipeline has this name.
    pub fn require_pipeline(&self, name: &str) -> Result<&Pipeline> {
        self.pipeline(name)
            .ok_or_else(|| EngineError::UnknownPipeline(name.to_string()))
    }

    /// Engine-wide initial metadata.
    pub fn settings(&self) -> &Metadata {
        &self.settings
    }

    /// Outputs of the last fully successful pass.
    pub fn documents(&self) -> &DocumentCollection {
        &self.outputs
    }

    /// Completed pass count.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run every registered pipeline once, in registration order.
    ///
    /// On repeat passes the cache is discarded first (unless configured to be
    /// retained) and process-once pipelines replay their recorded output. On
    /// any failure the previous pass's outputs remain visible unchanged.
    pub async fn execute(&mut self) -> Result<RunSummary> {
        let start = Instant::now();
        self.passes += 1;
        if self.passes > 1 && !self.config.retain_cache_across_passes {
            self.cache.reset();
        }

        let mut completed = DocumentCollection::default();
        let mut summaries = Vec::new();

        for pipeline in &self.pipelines {
            if pipeline.is_process_once()
                && self.passes > 1
                && let Some(recorded) = self.outputs.get(pipeline.name())
            {
                debug!(
                    pipeline = %pipeline.name(),
                    documents = recorded.len(),
                    "replaying process-once pipeline"
                );
                summaries.push(PipelineSummary {
                    name: pipeline.name().to_string(),
                    documents: recorded.len(),
                    replayed: true,
                });
                completed.insert(pipeline.name(), recorded.to_vec());
                continue;
            }

            info!(pipeline = %pipeline.name(), modules = pipeline.len(), "pipeline started");
            let ctx = ExecutionContext::root(
                self.settings.clone(),
                self.factory.clone(),
                self.cache.clone(),
                completed.clone(),
                self.config.max_nesting,
                pipeline.name(),
            );
            let documents = ctx
                .execute_nested(pipeline.modules(), None, Vec::new())
                .await?;
            check_duplicate_sources(pipeline.name(), &documents)?;
            info!(
                pipeline = %pipeline.name(),
                documents = documents.len(),
                "pipeline finished"
            );

            summaries.push(PipelineSummary {
                name: pipeline.name().to_string(),
                documents: documents.len(),
                replayed: false,
            });
            completed.insert(pipeline.name(), documents);
        }

        self.outputs = completed;
        Ok(RunSummary {
            pass: self.passes,
            elapsed_ms: start.elapsed().as_millis() as u64,
            pipelines: summaries,
        })
    }
}

/// A pipeline's output set may not contain two documents with the same
/// non-empty source path; sourceless documents are exempt.
fn check_duplicate_sources(pipeline: &str, documents: &[Document]) -> Result<()> {
    let mut seen = HashSet::new();
    for doc in documents {
        if let Some(path) = doc.source() {
            let display = path.display().to_string();
            if !seen.insert(display.clone()) {
                return Err(EngineError::DuplicateSource {
                    pipeline: pipeline.to_string(),
                    path: display,
                });
            }
        }
    }
    Ok(())
}
