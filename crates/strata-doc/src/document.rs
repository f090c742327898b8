//! The document — an immutable unit of metadata plus payload.
//!
//! Documents are cheap to clone: metadata is a persistent layered store and
//! the payload is `Arc`-shared. Every "mutation" is a clone operation that
//! returns a new document; the original is never touched. The document id is
//! the identity of the *logical* document and survives cloning; the source
//! path, once set to a non-empty value, is never overwritten by a clone.

use std::fmt;
use std::path::{Path, PathBuf};

use strata_meta::{Metadata, MetadataValue};
use uuid::Uuid;

use crate::error::Result;
use crate::payload::{ByteSource, PayloadState, SharedPayload, StreamCheckout};

/// Opaque identity of a logical document, stable across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An immutable unit of metadata and payload flowing through pipelines.
#[derive(Clone)]
pub struct Document {
    id: DocumentId,
    source: Option<PathBuf>,
    metadata: Metadata,
    payload: SharedPayload,
}

impl Document {
    /// A fresh synthetic document (no source, empty payload) over the given
    /// metadata.
    pub fn new(metadata: Metadata) -> Self {
        Self {
            id: DocumentId::new(),
            source: None,
            metadata,
            payload: PayloadState::empty(),
        }
    }

    /// Identity of the logical document.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Origin path, if this document came from somewhere. `None` means
    /// synthetic.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Read-only metadata view. Never requires the payload lock.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Realized text content, materialized from the stream under the payload
    /// lock if needed. Does not consume or advance the stream.
    pub async fn content(&self) -> Result<String> {
        let mut state = self.payload.lock().await;
        Ok(state.ensure_text()?.to_string())
    }

    /// Exclusive checkout of the byte stream. A second caller waits until the
    /// returned guard is dropped; the stream starts rewound. Materializes a
    /// stream from text on first use.
    pub async fn checkout_stream(&self) -> Result<StreamCheckout> {
        let guard = self.payload.clone().lock_owned().await;
        StreamCheckout::new(guard)
    }

    /// Release an owned stream. Any later payload access on any clone sharing
    /// this payload fails with `UseAfterDispose`; metadata stays readable.
    pub async fn dispose(&self) {
        self.payload.lock().await.dispose();
    }

    /// Whether the payload has been disposed.
    pub async fn is_disposed(&self) -> bool {
        self.payload.lock().await.is_disposed()
    }

    /// Clone with replaced text content and optional extra metadata. A
    /// non-empty existing source wins over `new_source`.
    pub fn clone_with_content<I>(
        &self,
        new_source: Option<PathBuf>,
        content: impl Into<String>,
        extra_metadata: I,
    ) -> Document
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        Document {
            id: self.id,
            source: self.keep_or(new_source),
            metadata: self.metadata.derive(extra_metadata),
            payload: PayloadState::from_text(content.into()),
        }
    }

    /// Clone with a stream-backed payload. `take_ownership` decides whether
    /// the clone's dispose may drop the stream eagerly. A non-empty existing
    /// source wins over `new_source`.
    pub fn clone_with_stream<I>(
        &self,
        new_source: Option<PathBuf>,
        stream: ByteSource,
        extra_metadata: I,
        take_ownership: bool,
    ) -> Document
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        Document {
            id: self.id,
            source: self.keep_or(new_source),
            metadata: self.metadata.derive(extra_metadata),
            payload: PayloadState::from_stream(stream, take_ownership),
        }
    }

    /// Clone with extra metadata only. The payload is shared with the parent,
    /// including its dispose state, so stream ownership can never be
    /// duplicated: the first dispose wins for every document sharing it.
    pub fn clone_with_metadata<I>(&self, extra_metadata: I) -> Document
    where
        I: IntoIterator<Item = (String, MetadataValue)>,
    {
        Document {
            id: self.id,
            source: self.source.clone(),
            metadata: self.metadata.derive(extra_metadata),
            payload: self.payload.clone(),
        }
    }

    /// Normalize and apply the source-stability rule: an existing non-empty
    /// source is kept; otherwise a non-empty `new_source` is adopted.
    fn keep_or(&self, new_source: Option<PathBuf>) -> Option<PathBuf> {
        match &self.source {
            Some(existing) if !existing.as_os_str().is_empty() => Some(existing.clone()),
            _ => new_source.filter(|p| !p.as_os_str().is_empty()),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("metadata_keys", &self.metadata.keys())
            .finish()
    }
}
