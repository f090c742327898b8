//! Cross-pipeline document lookup.
//!
//! After each pipeline completes, its output documents are recorded here.
//! Modules see a snapshot covering only the pipelines that finished earlier
//! in the current pass. Every query returns a distinct document set,
//! deduplicated by document identity (not source path).

use std::collections::HashSet;

use strata_doc::{Document, DocumentId};

/// Read-only view over the documents produced by completed pipelines.
#[derive(Clone, Debug, Default)]
pub struct DocumentCollection {
    // Completion order is preserved so queries are deterministic.
    outputs: Vec<(String, Vec<Document>)>,
}

impl DocumentCollection {
    /// Record (or replace) a pipeline's output set.
    pub(crate) fn insert(&mut self, pipeline: impl Into<String>, documents: Vec<Document>) {
        let pipeline = pipeline.into();
        if let Some(slot) = self.outputs.iter_mut().find(|(name, _)| *name == pipeline) {
            slot.1 = documents;
        } else {
            self.outputs.push((pipeline, documents));
        }
    }

    /// Raw output set of one pipeline, if it has completed.
    pub fn get(&self, pipeline: &str) -> Option<&[Document]> {
        self.outputs
            .iter()
            .find(|(name, _)| name == pipeline)
            .map(|(_, docs)| docs.as_slice())
    }

    /// Documents from one completed pipeline, deduplicated by identity.
    pub fn from_pipeline(&self, pipeline: &str) -> Vec<Document> {
        dedup(self.get(pipeline).unwrap_or_default().iter())
    }

    /// Documents from every completed pipeline except the named one.
    pub fn except_pipeline(&self, pipeline: &str) -> Vec<Document> {
        dedup(
            self.outputs
                .iter()
                .filter(|(name, _)| name != pipeline)
                .flat_map(|(_, docs)| docs.iter()),
        )
    }

    /// Documents from every completed pipeline.
    pub fn all(&self) -> Vec<Document> {
        dedup(self.outputs.iter().flat_map(|(_, docs)| docs.iter()))
    }

    /// Names of the pipelines recorded so far, in completion order.
    pub fn pipelines(&self) -> Vec<&str> {
        self.outputs.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Whether a pipeline's output has been recorded.
    pub fn contains_pipeline(&self, pipeline: &str) -> bool {
        self.outputs.iter().any(|(name, _)| name == pipeline)
    }
}

fn dedup<'a>(documents: impl Iterator<Item = &'a Document>) -> Vec<Document> {
    let mut seen: HashSet<DocumentId> = HashSet::new();
    documents
        .filter(|doc| seen.insert(doc.id()))
        .cloned()
        .collect()
}
