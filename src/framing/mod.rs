//! Framing module - byte stream to newline-aligned text.
//!
//! This module turns raw socket reads into decoded text:
//! - Incremental UTF-8 decoding that survives characters split across reads
//! - Line framer that emits chunks ending at a newline, with a size limit
//!   for peers that never send one

mod decoder;
mod line_buffer;

pub use decoder::Utf8Decoder;
pub use line_buffer::{LineFramer, DEFAULT_READ_LIMIT};
