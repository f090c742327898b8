//! Layered, immutable metadata for pipeline documents.
//!
//! This crate provides [`Metadata`] — a persistent, structurally shared
//! key/value store. Deriving pushes a new layer in O(1) and leaves the parent
//! store untouched, which is what makes document cloning cheap everywhere
//! else in the engine. Values are literal JSON data or lazy computations
//! ([`MetadataValue`]), and typed access goes through an explicit conversion
//! trait ([`FromMetadata`]) rather than any reflection-style fallback.

pub mod convert;
pub mod error;
pub mod store;
pub mod value;

pub use convert::{FromMetadata, convert, kind};
pub use error::{MetadataError, Result};
pub use store::Metadata;
pub use value::{CachePolicy, LazyValue, MetadataValue};
