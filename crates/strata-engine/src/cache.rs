//! Per-module memoization of computed document sets.
//!
//! The execution cache is the only engine-owned mutable structure touched by
//! concurrent module executions. All mutation goes through
//! [`ExecutionCache::get_or_compute`], which serializes concurrent callers
//! per fingerprint: the underlying computation runs at most once per
//! fingerprint per engine run.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use strata_doc::Document;
use tracing::debug;

use crate::error::Result;
use crate::fingerprint::Fingerprint;

type Slot = Arc<tokio::sync::Mutex<Option<Vec<Document>>>>;

/// Fingerprint → document-set memoization table.
pub struct ExecutionCache {
    /// When false (no-cache mode), results are not stored but each call still
    /// gets single-invocation semantics.
    store_results: bool,
    slots: Mutex<HashMap<Fingerprint, Slot>>,
}

impl ExecutionCache {
    pub fn new(store_results: bool) -> Self {
        Self {
            store_results,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Whether computed results are retained.
    pub fn stores_results(&self) -> bool {
        self.store_results
    }

    /// Discard every entry. Called at the start of a fresh run unless the
    /// engine is configured to retain the cache across passes.
    pub fn reset(&self) {
        self.slots.lock().clear();
    }

    /// Number of fingerprints seen this run (including in-flight
    /// computations).
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached result for `fingerprint`, or run `compute` and store
    /// it. Concurrent callers with the same fingerprint serialize on a
    /// per-fingerprint slot, so `compute` runs at most once per fingerprint;
    /// callers with different fingerprints do not contend. A failed
    /// computation is not stored and a later caller retries.
    pub async fn get_or_compute<F, Fut>(&self, fingerprint: Fingerprint, compute: F) -> Result<Vec<Document>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Document>>>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(fingerprint.clone()).or_default().clone()
        };

        let mut guard = slot.lock().await;
        if let Some(documents) = guard.as_ref() {
            debug!(fingerprint = %fingerprint, documents = documents.len(), "cache hit");
            return Ok(documents.clone());
        }

        debug!(fingerprint = %fingerprint, "cache miss");
        let documents = compute().await?;
        if self.store_results {
            *guard = Some(documents.clone());
        }
        Ok(documents)
    }
}
