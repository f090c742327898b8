//! A named, ordered sequence of modules.

use std::sync::Arc;

use crate::module::Module;

/// An ordered module chain, executed first-to-last with each module's output
/// feeding the next module's input.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    modules: Vec<Arc<dyn Module>>,
    process_once: bool,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
            process_once: false,
        }
    }

    /// Append a module (builder form).
    pub fn with_module(mut self, module: Arc<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Mark this pipeline to execute only on the first pass; later passes
    /// replay its recorded output instead of re-running the modules.
    pub fn with_process_once(mut self, process_once: bool) -> Self {
        self.process_once = process_once;
        self
    }

    /// Append a module.
    pub fn add_module(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    pub fn is_process_once(&self) -> bool {
        self.process_once
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("modules", &self.modules.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("process_once", &self.process_once)
            .finish()
    }
}
