//! Document construction boundary.
//!
//! The engine never constructs documents directly; it goes through a
//! [`DocumentFactory`] so a host program can substitute its own document
//! shape uniformly. [`DefaultFactory`] is the stock implementation, seeded
//! with the engine's initial metadata.

use strata_meta::{Metadata, MetadataValue};

use crate::document::Document;
use crate::error::Result;
use crate::payload::Content;

/// Constructs documents for the engine.
pub trait DocumentFactory: Send + Sync {
    /// A fresh synthetic document whose base metadata layer is the engine's
    /// initial metadata, extended with `extra_metadata`.
    fn new_document(&self, extra_metadata: Vec<(String, MetadataValue)>) -> Document;

    /// Derive a document: from `source` when given (cloning with the new
    /// content and metadata), otherwise from scratch over the initial
    /// metadata.
    fn derive(
        &self,
        source: Option<&Document>,
        content: Option<Content>,
        extra_metadata: Vec<(String, MetadataValue)>,
    ) -> Result<Document>;
}

/// Stock factory over the engine's initial metadata.
pub struct DefaultFactory {
    initial: Metadata,
}

impl DefaultFactory {
    pub fn new(initial: Metadata) -> Self {
        Self { initial }
    }
}

impl DocumentFactory for DefaultFactory {
    fn new_document(&self, extra_metadata: Vec<(String, MetadataValue)>) -> Document {
        let metadata = if extra_metadata.is_empty() {
            self.initial.clone()
        } else {
            self.initial.derive(extra_metadata)
        };
        Document::new(metadata)
    }

    fn derive(
        &self,
        source: Option<&Document>,
        content: Option<Content>,
        extra_metadata: Vec<(String, MetadataValue)>,
    ) -> Result<Document> {
        let base;
        let doc = match source {
            Some(doc) => doc,
            None => {
                base = self.new_document(Vec::new());
                &base
            }
        };

        Ok(match content {
            Some(Content::Text(text)) => doc.clone_with_content(None, text, extra_metadata),
            Some(Content::Stream {
                stream,
                take_ownership,
            }) => doc.clone_with_stream(None, stream, extra_metadata, take_ownership),
            None => doc.clone_with_metadata(extra_metadata),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(key: &str, value: impl Into<MetadataValue>) -> (String, MetadataValue) {
        (key.to_string(), value.into())
    }

    fn factory() -> DefaultFactory {
        DefaultFactory::new(Metadata::from_entries([entry("site", "example")]))
    }

    #[tokio::test]
    async fn test_new_document_carries_initial_metadata() {
        let doc = factory().new_document(vec![entry("page", 1i64)]);
        assert_eq!(doc.metadata().get("site").unwrap(), Some(json!("example")));
        assert_eq!(doc.metadata().get("page").unwrap(), Some(json!(1)));
        assert!(doc.source().is_none());
    }

    #[tokio::test]
    async fn test_derive_from_scratch() {
        let doc = factory()
            .derive(None, Some("fresh".into()), vec![entry("n", 2i64)])
            .unwrap();
        assert_eq!(doc.content().await.unwrap(), "fresh");
        assert_eq!(doc.metadata().get("site").unwrap(), Some(json!("example")));
        assert_eq!(doc.metadata().get_as("n", 0i64).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_derive_from_existing() {
        let f = factory();
        let parent = f.new_document(vec![entry("kind", "post")]);
        let child = f
            .derive(Some(&parent), Some("body".into()), vec![entry("n", 3i64)])
            .unwrap();

        assert_eq!(child.id(), parent.id());
        assert_eq!(child.content().await.unwrap(), "body");
        assert_eq!(child.metadata().get("kind").unwrap(), Some(json!("post")));
        assert_eq!(child.metadata().get_as("n", 0i64).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_derive_metadata_only_shares_payload() {
        let f = factory();
        let parent = f
            .derive(None, Some("shared".into()), vec![])
            .unwrap();
        let child = f
            .derive(Some(&parent), None, vec![entry("extra", true)])
            .unwrap();
        assert_eq!(child.content().await.unwrap(), "shared");
    }
}
