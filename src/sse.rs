//! Server-Sent Events framing for decoded chunks.

use crate::error::{Error, Result};
use crate::events::ParsedChunk;
use std::io::Write;

/// Encodes one chunk as an SSE `data:` frame terminated by a blank line.
///
/// # Errors
///
/// Returns an error if the chunk cannot be serialised.
pub fn encode_event(chunk: &ParsedChunk) -> Result<String> {
    let json = serde_json::to_string(chunk).map_err(|e| Error::json("encoding SSE event", e))?;
    Ok(format!("data: {json}\n\n"))
}

/// Writes chunks as SSE frames to any byte sink.
pub struct SseWriter<W: Write> {
    inner: W,
}

impl<W: Write> SseWriter<W> {
    /// Wraps a writer.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes one frame and flushes so the client sees it immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or the underlying write fails.
    pub fn send(&mut self, chunk: &ParsedChunk) -> Result<()> {
        let frame = encode_event(chunk)?;
        self.inner
            .write_all(frame.as_bytes())
            .map_err(|e| Error::io("writing SSE frame", e))?;
        self.flush()
    }

    /// Flushes the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| Error::io("flushing SSE stream", e))
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
