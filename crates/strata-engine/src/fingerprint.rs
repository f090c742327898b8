//! Opaque cache fingerprints.
//!
//! A [`Fingerprint`] identifies "this module, given this input state" for the
//! execution cache. The cache only requires the key to be opaque and stable;
//! [`FingerprintBuilder`] is the stock way to produce one, hashing module
//! identity plus whatever input state the module considers relevant with
//! SHA-256.

use sha2::{Digest, Sha256};
use strata_doc::Document;

use crate::error::Result;

/// An opaque key identifying a module invocation's relevant input state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an externally computed key as-is.
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Start a SHA-256 builder seeded with the module's identity.
    pub fn builder(module: &str) -> FingerprintBuilder {
        let mut hasher = Sha256::new();
        hasher.update(module.as_bytes());
        FingerprintBuilder { hasher }
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys can be long hex digests; eight characters is enough for logs.
        // Truncation counts characters, not bytes: external keys are
        // arbitrary strings and need not have a char boundary at byte 8.
        for c in self.0.chars().take(8) {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Incrementally hashes input state into a [`Fingerprint`].
pub struct FingerprintBuilder {
    hasher: Sha256,
}

impl FingerprintBuilder {
    /// Fold arbitrary bytes into the fingerprint.
    pub fn update(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.hasher.update(bytes.as_ref());
        self
    }

    /// Fold a document's identity, source, and content into the fingerprint.
    pub async fn update_document(mut self, document: &Document) -> Result<Self> {
        self.hasher.update(document.id().to_string().as_bytes());
        if let Some(source) = document.source() {
            self.hasher.update(source.display().to_string().as_bytes());
        }
        self.hasher.update(document.content().await?.as_bytes());
        Ok(self)
    }

    /// Finish hashing and produce the fingerprint.
    pub fn finish(self) -> Fingerprint {
        Fingerprint(hex::encode(self.hasher.finalize()))
    }
}
