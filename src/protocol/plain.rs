//! Plain text protocol: no highlighting.

use super::{ProtocolOptions, Tokenizer};
use crate::protocol::{TokenKind, TokenizedLine};

/// Tokenizer that returns the whole line as one Text token.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTokenizer;

impl PlainTokenizer {
    /// Factory used by the registry; `plain` takes no options.
    pub fn from_options(_options: &ProtocolOptions) -> Self {
        Self
    }
}

impl Tokenizer for PlainTokenizer {
    fn tokenize(&self, line: &str) -> TokenizedLine {
        if line.is_empty() {
            return TokenizedLine::new();
        }
        TokenizedLine::single(TokenKind::Text, line)
    }
}
