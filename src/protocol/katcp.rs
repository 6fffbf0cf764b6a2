//! KATCP line tokenizer.
//!
//! KATCP messages look like `?name[id] arg arg ...`, where the sigil is `?`
//! for a request, `!` for a reply and `#` for an inform. The tokenizer is a
//! four-state machine:
//!
//! ```text
//! root ──sigil+name──► msgid ──[id] or nothing──► body ◄──────┐
//!  ▲                                               │  │       │
//!  └──────────────── [ \t]*\n ─────────────────────┘  [ \t]+  │
//!                                                     ▼       │
//!                                                  argument ──┘ (anything else)
//! ```
//!
//! Every input is accepted: text outside a message is Text, and characters
//! the body cannot place become Error tokens. The grammar never backtracks
//! across tokens.

use super::{ArgKind, ArgumentSpec, ProtocolOptions, Tokenizer};
use crate::protocol::{NumberKind, Token, TokenKind, TokenizedLine};

/// Options accepted by the `katcp` protocol.
pub const ARGUMENTS: &[ArgumentSpec] = &[ArgumentSpec {
    name: "unescape",
    kind: ArgKind::Bool,
    help: "Show escape sequences as the characters they encode",
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Root,
    MessageId,
    Body,
    Argument,
}

/// Tokenizer for the KATCP request/reply/inform grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct KatcpTokenizer {
    unescape: bool,
}

impl KatcpTokenizer {
    /// Create a tokenizer; with `unescape`, escapes become their characters.
    pub fn new(unescape: bool) -> Self {
        Self { unescape }
    }

    /// Factory used by the registry.
    pub fn from_options(options: &ProtocolOptions) -> Self {
        Self::new(options.flag("unescape"))
    }
}

impl Tokenizer for KatcpTokenizer {
    fn tokenize(&self, line: &str) -> TokenizedLine {
        let bytes = line.as_bytes();
        let mut out = TokenizedLine::new();
        let mut state = State::Root;
        let mut pos = 0;

        while pos < bytes.len() {
            let rest = &line[pos..];
            match state {
                State::Root => {
                    if let Some((kind, len)) = message_name(rest) {
                        out.push(kind, &rest[..len]);
                        pos += len;
                        state = State::MessageId;
                    } else if rest.starts_with('\n') {
                        out.push(TokenKind::Text, "\n");
                        pos += 1;
                    } else {
                        let len = rest.find('\n').unwrap_or(rest.len());
                        out.push(TokenKind::Text, &rest[..len]);
                        pos += len;
                    }
                }
                State::MessageId => {
                    if let Some(digits) = message_id(rest) {
                        out.push(TokenKind::Punctuation, "[");
                        out.push(TokenKind::Number(NumberKind::Integer), &rest[1..=digits]);
                        out.push(TokenKind::Punctuation, "]");
                        pos += digits + 2;
                    }
                    state = State::Body;
                }
                State::Body => {
                    let blanks = blank_run(rest);
                    if rest[blanks..].starts_with('\n') {
                        out.push(TokenKind::Text, &rest[..=blanks]);
                        pos += blanks + 1;
                        state = State::Root;
                    } else if blanks > 0 {
                        out.push(TokenKind::Text, &rest[..blanks]);
                        pos += blanks;
                        state = State::Argument;
                    } else {
                        let len = rest
                            .find([' ', '\t', '\n'])
                            .unwrap_or(rest.len());
                        out.push(TokenKind::Error, &rest[..len]);
                        pos += len;
                    }
                }
                State::Argument => {
                    let after_blank = matches!(bytes[pos - 1], b' ' | b'\t');
                    let word_len = rest.find([' ', '\t', '\n']).unwrap_or(rest.len());
                    let word = &rest[..word_len];

                    if after_blank && is_integer(word) {
                        out.push(TokenKind::Number(NumberKind::Integer), word);
                        pos += word_len;
                    } else if after_blank && is_float(word) {
                        out.push(TokenKind::Number(NumberKind::Float), word);
                        pos += word_len;
                    } else if let Some(decoded) = escape(rest) {
                        if self.unescape {
                            out.push_token(Token::new(TokenKind::String, decoded));
                        } else {
                            out.push(TokenKind::StringEscape, &rest[..2]);
                        }
                        pos += 2;
                    } else {
                        let len = string_run(rest);
                        if len == 0 {
                            state = State::Body;
                        } else {
                            out.push(TokenKind::String, &rest[..len]);
                            pos += len;
                        }
                    }
                }
            }
        }
        out
    }
}

/// Match `[?!#][A-Za-z][A-Za-z0-9-]*` and return its kind and length.
fn message_name(text: &str) -> Option<(TokenKind, usize)> {
    let bytes = text.as_bytes();
    let kind = match bytes.first()? {
        b'?' => TokenKind::Request,
        b'!' => TokenKind::Reply,
        b'#' => TokenKind::Inform,
        _ => return None,
    };
    if !bytes.get(1)?.is_ascii_alphabetic() {
        return None;
    }
    let tail = bytes[2..]
        .iter()
        .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'-')
        .count();
    Some((kind, 2 + tail))
}

/// Match `[<id>]` with a positive id without leading zeros; returns the digit count.
fn message_id(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'[') || !matches!(bytes.get(1), Some(b'1'..=b'9')) {
        return None;
    }
    let digits = digit_run(&bytes[1..]);
    (bytes.get(1 + digits) == Some(&b']')).then_some(digits)
}

fn blank_run(text: &str) -> usize {
    text.bytes().take_while(|&b| b == b' ' || b == b'\t').count()
}

fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Longest run without backslash, space, NUL, newline, CR, ESC or tab.
fn string_run(text: &str) -> usize {
    text.find(['\\', ' ', '\0', '\n', '\r', '\x1b', '\t'])
        .unwrap_or(text.len())
}

/// `0` or `-?[1-9][0-9]*`.
fn is_integer(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word).as_bytes();
    if word == "0" {
        return true;
    }
    matches!(digits.first(), Some(b'1'..=b'9')) && digit_run(digits) == digits.len()
}

/// `[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?`.
fn is_float(word: &str) -> bool {
    let bytes = word.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let whole = digit_run(&bytes[i..]);
    i += whole;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let fraction = digit_run(&bytes[i..]);
        i += fraction;
        if whole == 0 && fraction == 0 {
            return false;
        }
    } else if whole == 0 {
        return false;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exponent = digit_run(&bytes[i..]);
        if exponent == 0 {
            return false;
        }
        i += exponent;
    }
    i == bytes.len()
}

/// Decode a two-character escape at the start of `text`.
fn escape(text: &str) -> Option<&'static str> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'\\') {
        return None;
    }
    Some(match bytes.get(1)? {
        b'\\' => "\\",
        b'_' => " ",
        b'0' => "\0",
        b'n' => "\n",
        b'r' => "\r",
        b'e' => "\x1b",
        b't' => "\t",
        b'@' => "",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    use TokenKind::{Error, Inform, Number, Punctuation, Reply, Request, StringEscape, Text};

    const STR: TokenKind = TokenKind::String;
    const INT: TokenKind = Number(NumberKind::Integer);
    const FLOAT: TokenKind = Number(NumberKind::Float);

    fn lex(line: &str) -> Vec<(TokenKind, String)> {
        KatcpTokenizer::new(false)
            .tokenize(line)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn kinds(line: &str) -> Vec<TokenKind> {
        lex(line).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn test_request_with_id_and_arguments() {
        let expected = vec![
            (Request, "?foo"),
            (Punctuation, "["),
            (INT, "3"),
            (Punctuation, "]"),
            (Text, " "),
            (STR, "bar"),
            (Text, " "),
            (INT, "42"),
            (Text, " "),
            (FLOAT, "-1.5e2"),
            (Text, "\n"),
        ];
        let got = lex("?foo[3] bar 42 -1.5e2\n");
        let got: Vec<(TokenKind, &str)> = got.iter().map(|(k, t)| (*k, t.as_str())).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_unescape_rewrites_escape() {
        let line = KatcpTokenizer::new(true).tokenize("!ok \\n\n");
        let tokens = line.tokens();

        assert_eq!(tokens[0], Token::new(Reply, "!ok"));
        assert_eq!(tokens[1], Token::new(Text, " "));
        assert_eq!(tokens[2], Token::new(STR, "\n"));
        assert_eq!(tokens[3], Token::new(Text, "\n"));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_escape_kept_raw_by_default() {
        assert_eq!(
            lex("#log a\\_b\n"),
            vec![
                (Inform, "#log".to_string()),
                (Text, " ".to_string()),
                (STR, "a".to_string()),
                (StringEscape, "\\_".to_string()),
                (STR, "b".to_string()),
                (Text, "\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_unescape_at_sign_is_empty_string() {
        let line = KatcpTokenizer::new(true).tokenize("?set x \\@\n");
        assert!(line.iter().any(|t| t.kind == STR && t.text.is_empty()));
        assert_eq!(line.text(), "?set x \n");
    }

    #[rstest]
    #[case("?a 0\n", INT)]
    #[case("?a -17\n", INT)]
    #[case("?a 007\n", FLOAT)]
    #[case("?a -0\n", FLOAT)]
    #[case("?a +5\n", FLOAT)]
    #[case("?a 1.\n", FLOAT)]
    #[case("?a .25\n", FLOAT)]
    #[case("?a 6.02E+23\n", FLOAT)]
    #[case("?a 1e\n", STR)]
    #[case("?a 12ab\n", STR)]
    #[case("?a 42\r\n", STR)]
    #[case("?a 42", INT)]
    fn test_argument_classification(#[case] line: &str, #[case] kind: TokenKind) {
        assert_eq!(kinds(line)[2], kind);
    }

    #[test]
    fn test_number_must_follow_whitespace() {
        // After an escape the digits are no longer at the start of the argument.
        assert_eq!(
            kinds("?a \\t42\n"),
            vec![Request, Text, StringEscape, STR, Text]
        );
    }

    #[rstest]
    #[case("?foo[0] x\n")]
    #[case("?foo[01] x\n")]
    #[case("?foo[] x\n")]
    #[case("?foo[12 x\n")]
    fn test_bad_message_id_is_error(#[case] line: &str) {
        let tokens = lex(line);
        assert_eq!(tokens[0].0, Request);
        assert_eq!(tokens[1].0, Error);
        assert!(tokens[1].1.starts_with('['));
    }

    #[rstest]
    #[case("hello world\n")]
    #[case("? not a request\n")]
    #[case("#\n")]
    #[case("  ?indented\n")]
    fn test_non_message_line_is_text(#[case] line: &str) {
        assert!(kinds(line).iter().all(|kind| *kind == Text));
    }

    #[test]
    fn test_bare_newline() {
        assert_eq!(lex("\n"), vec![(Text, "\n".to_string())]);
    }

    #[test]
    fn test_trailing_whitespace_joins_line_end() {
        assert_eq!(
            lex("!ok  \t\n"),
            vec![(Reply, "!ok".to_string()), (Text, "  \t\n".to_string())]
        );
    }

    #[test]
    fn test_crlf_leaves_error_for_cr() {
        assert_eq!(kinds("!ok\r\n"), vec![Reply, Error, Text]);
    }

    #[test]
    fn test_unknown_escape_is_error() {
        assert_eq!(
            lex("?a \\x y\n"),
            vec![
                (Request, "?a".to_string()),
                (Text, " ".to_string()),
                (Error, "\\x".to_string()),
                (Text, " ".to_string()),
                (STR, "y".to_string()),
                (Text, "\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_several_lines_in_one_call() {
        assert_eq!(
            kinds("?a 1\nplain\n#b\n"),
            vec![Request, Text, INT, Text, Text, Text, Inform, Text]
        );
    }

    #[test]
    fn test_unterminated_line() {
        assert_eq!(kinds("?sensor-list[2"), vec![Request, Error]);
        assert_eq!(kinds("?sensor-list [2"), vec![Request, Text, STR]);
    }

    #[test]
    fn test_name_allows_digits_and_dashes() {
        assert_eq!(lex("#sensor-status2\n")[0].1, "#sensor-status2");
    }

    proptest! {
        #[test]
        fn prop_tokens_reconstruct_line(line in "[?!#a-z0-9\\[\\]\\\\ \\t\\r\\n._@+-]{0,40}") {
            let tokens = KatcpTokenizer::new(false).tokenize(&line);
            prop_assert_eq!(tokens.text(), line);
        }

        #[test]
        fn prop_never_panics_on_arbitrary_text(line in any::<String>()) {
            let tokens = KatcpTokenizer::new(true).tokenize(&line);
            prop_assert!(tokens.iter().all(|t| !t.text.is_empty() || t.kind == STR));
        }
    }
}
