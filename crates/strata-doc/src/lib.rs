//! Immutable pipeline documents with text/stream payload duality.
//!
//! A [`Document`] pairs a persistent metadata snapshot with a payload that is
//! either realized text or a seekable byte stream; whichever form is absent
//! is lazily materialized from the other. Stream access is exclusive — one
//! [`StreamCheckout`] at a time per payload, released by dropping the guard —
//! while metadata reads never touch the payload lock. Cloning a document is
//! cheap and never mutates the original.

pub mod document;
pub mod error;
pub mod factory;
pub mod payload;

pub use document::{Document, DocumentId};
pub use error::{DocumentError, Result};
pub use factory::{DefaultFactory, DocumentFactory};
pub use payload::{ByteSource, Content, ReadSeek, StreamCheckout, buffer_reader};
