//! Token types produced by tokenizers.

/// Highlighting category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Request name, including its sigil (`?name`).
    Request,
    /// Reply name, including its sigil (`!name`).
    Reply,
    /// Inform name, including its sigil (`#name`).
    Inform,
    /// Whitespace, line endings and anything outside a message.
    Text,
    /// Numeric argument.
    Number(NumberKind),
    /// Plain string argument.
    String,
    /// Escape sequence in its raw two-character form.
    StringEscape,
    /// Brackets around a message id.
    Punctuation,
    /// Characters that do not fit the grammar.
    Error,
}

/// Kind of numeric token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// Decimal integer, also used for message ids.
    Integer,
    /// Floating point literal.
    Float,
}

/// A categorized slice of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Highlighting category.
    pub kind: TokenKind,
    /// Text covered by the token.
    pub text: String,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Ordered tokens for one line of text.
///
/// Without unescaping, the token texts concatenate back to the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedLine {
    tokens: Vec<Token>,
}

impl TokenizedLine {
    /// Create an empty line.
    pub fn new() -> Self {
        Self::default()
    }

    /// A line holding a single token.
    pub fn single(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            tokens: vec![Token::new(kind, text)],
        }
    }

    /// Append a token, skipping empty raw slices.
    pub(crate) fn push(&mut self, kind: TokenKind, text: &str) {
        if !text.is_empty() {
            self.tokens.push(Token::new(kind, text));
        }
    }

    /// Append a token even if its text is empty.
    pub(crate) fn push_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Tokens in order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Iterate over the tokens.
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Concatenation of every token's text.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

impl IntoIterator for TokenizedLine {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

impl<'a> IntoIterator for &'a TokenizedLine {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

impl FromIterator<Token> for TokenizedLine {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}
