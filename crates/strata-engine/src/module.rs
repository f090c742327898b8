//! The module contract — a single transformation stage.
//!
//! A module is polymorphic over exactly one capability: turn a list of input
//! documents into a list of output documents, given an execution context. No
//! other lifecycle hooks exist. Modules are free to process their inputs in
//! parallel (metadata is immutable and stream access is serialized per
//! document), but output order across a parallel map is theirs to define —
//! modules that need determinism sort before returning.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use strata_doc::Document;

use crate::context::ExecutionContext;
use crate::error::Result;

/// A single transformation stage.
#[async_trait]
pub trait Module: Send + Sync {
    /// Transform the input documents into output documents. The output may
    /// be empty, or larger than the input (fan-out).
    async fn execute(
        &self,
        inputs: Vec<Document>,
        ctx: &ExecutionContext,
    ) -> Result<Vec<Document>>;

    /// Name used in diagnostics and failure wrapping; defaults to the
    /// implementing type's name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Type alias for the async function backing a runtime-constructed module.
///
/// Takes the input documents and an owned context, returns the outputs.
pub type ModuleFn = Arc<
    dyn Fn(
            Vec<Document>,
            ExecutionContext,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Document>>> + Send>>
        + Send
        + Sync,
>;

/// A module built at runtime from a closure, without a trait impl.
///
/// This is the bridge between host configuration (which assembles module
/// graphs dynamically) and the engine's execution contract.
pub struct FnModule {
    name: String,
    execute_fn: ModuleFn,
}

impl FnModule {
    pub fn new(name: impl Into<String>, execute_fn: ModuleFn) -> Self {
        Self {
            name: name.into(),
            execute_fn,
        }
    }
}

impl std::fmt::Debug for FnModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModule").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Module for FnModule {
    async fn execute(
        &self,
        inputs: Vec<Document>,
        ctx: &ExecutionContext,
    ) -> Result<Vec<Document>> {
        (self.execute_fn)(inputs, ctx.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
