//! Incremental UTF-8 decoder.
//!
//! Bytes may arrive split at any point, including in the middle of a
//! multi-byte character. The decoder keeps an incomplete trailing sequence
//! (at most 3 bytes) and prepends it to the next input. Invalid sequences
//! are replaced with U+FFFD, one replacement per maximal invalid subpart,
//! which matches `String::from_utf8_lossy` on the whole stream.

use std::char::REPLACEMENT_CHARACTER;

/// Carry state for decoding a byte stream in pieces.
#[derive(Debug, Default, Clone)]
pub struct Utf8Decoder {
    /// Incomplete multi-byte sequence left over from the previous call.
    carry: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with empty carry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `input`, continuing any sequence left over from the last call.
    ///
    /// With `last` set, an incomplete trailing sequence is replaced instead
    /// of being carried.
    pub fn decode(&mut self, input: &[u8], last: bool) -> String {
        let joined;
        let mut rest: &[u8] = if self.carry.is_empty() {
            input
        } else {
            let mut carry = std::mem::take(&mut self.carry);
            carry.extend_from_slice(input);
            joined = carry;
            &joined
        };

        let mut out = String::with_capacity(rest.len());
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            tracing::trace!("replacing {} invalid byte(s)", len);
                            out.push(REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None if last => {
                            out.push(REPLACEMENT_CHARACTER);
                            break;
                        }
                        None => {
                            self.carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}
