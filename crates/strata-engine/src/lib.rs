//! Pipeline execution engine.
//!
//! Orchestrates named pipelines of [`Module`]s over [`strata_doc::Document`]s:
//! each pass runs every registered pipeline in order, with cross-pipeline
//! document lookup, per-module memoization through the [`ExecutionCache`],
//! recursive nested execution, and process-once replay for pipelines whose
//! output is stable across passes.

mod cache;
mod collection;
mod config;
mod context;
mod engine;
mod error;
mod fingerprint;
mod module;
mod pipeline;

pub use cache::ExecutionCache;
pub use collection::DocumentCollection;
pub use config::EngineConfig;
pub use context::ExecutionContext;
pub use engine::{Engine, PipelineSummary, RunSummary};
pub use error::{EngineError, Result};
pub use fingerprint::{Fingerprint, FingerprintBuilder};
pub use module::{FnModule, Module, ModuleFn};
pub use pipeline::Pipeline;
