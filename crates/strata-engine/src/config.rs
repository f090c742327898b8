//! Engine configuration.
//!
//! All engine-wide state is carried explicitly in [`EngineConfig`] and passed
//! into `Engine::new`; there is no ambient/static configuration.

use strata_meta::MetadataValue;

/// Configuration for the engine.
pub struct EngineConfig {
    /// Entries seeding the base metadata layer of every synthetic document.
    pub initial_metadata: Vec<(String, MetadataValue)>,

    /// Disable result storage in the execution cache. Single-invocation
    /// semantics per call are preserved.
    pub no_cache: bool,

    /// Keep cache entries across passes (watch-mode incremental rebuilds).
    /// When false, the cache is discarded at the start of each pass.
    pub retain_cache_across_passes: bool,

    /// Maximum nested module execution depth.
    pub max_nesting: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_metadata: Vec::new(),
            no_cache: false,
            retain_cache_across_passes: false,
            max_nesting: 64,
        }
    }
}

impl EngineConfig {
    /// Add one initial metadata entry.
    pub fn with_initial(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.initial_metadata.push((key.into(), value.into()));
        self
    }
}
