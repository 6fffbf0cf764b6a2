//! Protocol module - line tokenizers and their registry.
//!
//! Provides:
//! - [`Tokenizer`] - turns one line of text into highlighted tokens
//! - [`PlainTokenizer`] and [`KatcpTokenizer`] - the built-in protocols
//! - [`ProtocolRegistry`] - resolves `name:key=value` specifiers
//!
//! # Example
//!
//! ```
//! use ntsh::protocol::{ProtocolRegistry, TokenKind};
//!
//! let config = ProtocolRegistry::builtin().resolve("katcp").unwrap();
//! let line = config.tokenize("?help\n");
//!
//! assert_eq!(line.tokens()[0].kind, TokenKind::Request);
//! ```

pub mod katcp;
mod plain;
mod registry;
mod token;

pub use katcp::KatcpTokenizer;
pub use plain::PlainTokenizer;
pub use registry::{
    ArgKind, ArgValue, ArgumentSpec, ProtocolConfig, ProtocolConfigError, ProtocolOptions,
    ProtocolRegistry,
};
pub use token::{NumberKind, Token, TokenKind, TokenizedLine};

/// Splits a line of text into categorized tokens.
///
/// Implementations must accept every input: text the grammar does not
/// cover is returned as [`TokenKind::Text`] or [`TokenKind::Error`].
pub trait Tokenizer: Send + Sync {
    /// Tokenize one line, including its trailing newline if present.
    fn tokenize(&self, line: &str) -> TokenizedLine;
}
