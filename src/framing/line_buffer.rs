//! Line framer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for the carry buffer. Each push appends the new
//! bytes and emits decoded text chunks that end at a newline whenever
//! possible:
//! - buffer holds a newline: everything up to and including the **last**
//!   newline is decoded, the rest is carried
//! - no newline, buffer below the limit: nothing is emitted yet
//! - no newline, buffer at the limit: the whole buffer is flushed anyway
//!
//! The buffer never holds more than the limit. A push larger than the free
//! space is taken in pieces, exactly as if it had arrived in reads of
//! [`read_capacity`](LineFramer::read_capacity) bytes.
//!
//! # Example
//!
//! ```
//! use ntsh::framing::LineFramer;
//!
//! let mut framer = LineFramer::new();
//!
//! assert!(framer.push(b"?watchdog").is_empty());
//! assert_eq!(framer.push(b"\n!watch"), vec!["?watchdog\n".to_string()]);
//! assert_eq!(framer.finish(), Some("!watch".to_string()));
//! ```

use bytes::BytesMut;

use super::decoder::Utf8Decoder;

/// Default maximum number of bytes buffered without a newline (1 MiB).
pub const DEFAULT_READ_LIMIT: usize = 1024 * 1024;

/// Buffer turning a byte stream into newline-aligned text chunks.
///
/// The framer is owned by the reader task for the lifetime of one
/// connection. Concatenating every emitted chunk (plus the result of
/// [`finish`](Self::finish)) gives the lossy UTF-8 decoding of the whole
/// stream, however the bytes were split across pushes.
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes received but not yet emitted.
    buffer: BytesMut,
    /// Incremental decoder carry.
    decoder: Utf8Decoder,
    /// Flush threshold for lines without a newline.
    limit: usize,
}

impl LineFramer {
    /// Create a framer with the default 1 MiB limit.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_READ_LIMIT)
    }

    /// Create a framer that flushes after `limit` bytes without a newline.
    ///
    /// A limit of zero is treated as one.
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            buffer: BytesMut::with_capacity(limit.min(64 * 1024)),
            decoder: Utf8Decoder::new(),
            limit,
        }
    }

    /// Push data into the buffer and extract every chunk that is ready.
    ///
    /// Returns an empty vector while waiting for more bytes.
    pub fn push(&mut self, mut data: &[u8]) -> Vec<String> {
        let mut chunks = Vec::new();
        loop {
            let take = self.limit.saturating_sub(self.buffer.len()).min(data.len());
            let (head, rest) = data.split_at(take);
            self.buffer.extend_from_slice(head);
            data = rest;

            while let Some(chunk) = self.try_extract_one() {
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
            }
            // Extraction always leaves the buffer below the limit, so the
            // next piece is never empty.
            if data.is_empty() {
                return chunks;
            }
        }
    }

    /// Try to extract a single chunk from the buffer.
    fn try_extract_one(&mut self) -> Option<String> {
        let cut = match self.buffer.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None if self.buffer.len() >= self.limit => {
                tracing::debug!(limit = self.limit, "no newline within limit, flushing");
                self.limit
            }
            None => return None,
        };

        let bytes = self.buffer.split_to(cut);
        Some(self.decoder.decode(&bytes, false))
    }

    /// Signal end of stream and decode whatever is still carried.
    ///
    /// Returns `None` when nothing was left over.
    pub fn finish(&mut self) -> Option<String> {
        let bytes = self.buffer.split();
        let text = self.decoder.decode(&bytes, true);
        (!text.is_empty()).then_some(text)
    }

    /// How many bytes the next read may add without exceeding the limit.
    ///
    /// Never returns zero, so a read always makes progress.
    pub fn read_capacity(&self, max: usize) -> usize {
        self.limit.saturating_sub(self.buffer.len()).clamp(1, max.max(1))
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
