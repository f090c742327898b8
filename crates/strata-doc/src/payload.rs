//! Document payloads — text/stream duality behind an exclusive checkout lock.
//!
//! A payload holds realized text, a seekable byte stream, or (transiently)
//! both, where one is a cached materialization of the other. All access goes
//! through a per-payload async mutex: `content()` materializes text under the
//! lock, and [`StreamCheckout`] holds the lock for the whole time a caller
//! owns the stream, so release is the guard's drop — on every exit path.

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{DocumentError, Result};

/// A readable, seekable byte source. Blanket-implemented for anything that
/// is `Read + Seek + Send`.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Boxed byte source stored inside a payload.
pub type ByteSource = Box<dyn ReadSeek>;

/// Content supplied when creating or deriving a document.
pub enum Content {
    /// Realized text.
    Text(String),
    /// A seekable byte stream; `take_ownership` decides whether dispose may
    /// drop it eagerly.
    Stream {
        stream: ByteSource,
        take_ownership: bool,
    },
}

impl Content {
    /// Stream content with ownership transferred to the document.
    pub fn stream(stream: ByteSource) -> Self {
        Content::Stream {
            stream,
            take_ownership: true,
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

/// Wrap a possibly non-seekable reader by materializing it into an in-memory
/// cursor. A reader that fails here is an invalid payload.
pub fn buffer_reader(mut reader: impl Read) -> Result<ByteSource> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| DocumentError::InvalidPayload(format!("unreadable stream: {e}")))?;
    Ok(Box::new(Cursor::new(bytes)))
}

/// Payload state guarded by the per-document mutex.
pub(crate) struct PayloadState {
    text: Option<String>,
    stream: Option<ByteSource>,
    /// Whether this payload owns disposal of `stream`.
    owned: bool,
    disposed: bool,
}

pub(crate) type SharedPayload = Arc<Mutex<PayloadState>>;

impl PayloadState {
    pub(crate) fn empty() -> SharedPayload {
        Self::share(Self {
            text: None,
            stream: None,
            owned: false,
            disposed: false,
        })
    }

    pub(crate) fn from_text(text: String) -> SharedPayload {
        Self::share(Self {
            text: Some(text),
            stream: None,
            owned: false,
            disposed: false,
        })
    }

    pub(crate) fn from_stream(stream: ByteSource, owned: bool) -> SharedPayload {
        Self::share(Self {
            text: None,
            stream: Some(stream),
            owned,
            disposed: false,
        })
    }

    fn share(state: Self) -> SharedPayload {
        Arc::new(Mutex::new(state))
    }

    /// Realize text, caching it. The stream position is restored afterwards
    /// so reading content never consumes the stream.
    pub(crate) fn ensure_text(&mut self) -> Result<&str> {
        if self.disposed {
            return Err(DocumentError::UseAfterDispose);
        }
        if self.text.is_none() {
            if let Some(stream) = self.stream.as_mut() {
                let pos = stream.stream_position()?;
                stream.seek(SeekFrom::Start(0))?;
                let mut bytes = Vec::new();
                stream.read_to_end(&mut bytes)?;
                stream.seek(SeekFrom::Start(pos))?;
                let text = String::from_utf8(bytes).map_err(|e| {
                    DocumentError::InvalidPayload(format!("payload is not valid UTF-8: {e}"))
                })?;
                self.text = Some(text);
            } else {
                self.text = Some(String::new());
            }
        }
        Ok(self.text.as_deref().unwrap_or_default())
    }

    /// Materialize a stream from text on first use. The caller holds the
    /// payload lock, so exclusivity is already guaranteed.
    pub(crate) fn ensure_stream(&mut self) -> Result<&mut ByteSource> {
        if self.disposed {
            return Err(DocumentError::UseAfterDispose);
        }
        if self.stream.is_none() {
            let bytes = self.text.clone().unwrap_or_default().into_bytes();
            self.stream = Some(Box::new(Cursor::new(bytes)));
            self.owned = true;
        }
        match self.stream.as_mut() {
            Some(s) => Ok(s),
            None => Err(DocumentError::UseAfterDispose),
        }
    }

    /// Release the stream. Only an owned stream is dropped eagerly; either
    /// way the payload is unusable afterwards.
    pub(crate) fn dispose(&mut self) {
        if self.owned {
            self.stream = None;
        }
        self.disposed = true;
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Exclusive handle to a document's byte stream.
///
/// Holding this guard blocks every other checkout and `content()` call on
/// documents sharing the payload until it is dropped; dropping it is the
/// release. The stream is rewound to the start on checkout.
pub struct StreamCheckout {
    guard: OwnedMutexGuard<PayloadState>,
}

impl StreamCheckout {
    pub(crate) fn new(mut guard: OwnedMutexGuard<PayloadState>) -> Result<Self> {
        let stream = guard.ensure_stream()?;
        stream.seek(SeekFrom::Start(0))?;
        Ok(Self { guard })
    }
}

impl Read for StreamCheckout {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.guard.stream.as_mut() {
            Some(s) => s.read(buf),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "stream disposed")),
        }
    }
}

impl Seek for StreamCheckout {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self.guard.stream.as_mut() {
            Some(s) => s.seek(pos),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "stream disposed")),
        }
    }
}
