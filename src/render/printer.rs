//! Printer: tokenized lines to styled, direction-marked spans.
//!
//! Each physical line on screen starts with a marker:
//!
//! ```text
//! > ?sensor-value cpu.temp          outbound, first line
//! < !sensor-value ok 1 cpu.temp     inbound, first line
//! + nominal 41.5                    continuation
//! ```
//!
//! The printer remembers, per direction, whether the last rendered text
//! ended mid-line. A chunk that continues an open line gets no marker. If
//! the other direction renders while a line is open, the open line is
//! terminated first and picks up a `+ ` marker when it resumes. The same
//! happens after [`Printer::break_open_line`], for surfaces that end every
//! print on a fresh row.

use crossterm::style::ContentStyle;

use super::Theme;
use crate::protocol::{TokenKind, TokenizedLine};

/// Marker for continuation lines of either direction.
pub const CONTINUATION_MARKER: &str = "+ ";

/// Which way a line travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Received from the peer.
    Inbound,
    /// Typed by the user and sent to the peer.
    Outbound,
}

impl Direction {
    /// Marker for the first line of a message in this direction.
    pub fn marker(self) -> &'static str {
        match self {
            Direction::Inbound => "< ",
            Direction::Outbound => "> ",
        }
    }
}

/// What a styled span represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// `< ` or `> `.
    Marker(Direction),
    /// `+ `.
    Continuation,
    /// Line content.
    Token(TokenKind),
}

/// A piece of output text with its style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    /// What the text is, for styling and tests.
    pub kind: SpanKind,
    /// Style taken from the printer's theme.
    pub style: ContentStyle,
    /// Text, possibly ending in a newline.
    pub text: String,
}

/// Concatenate the text of a span list, without styling.
pub fn spans_text(spans: &[StyledSpan]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct StreamState {
    /// Last rendered text did not end with a newline.
    mid_line: bool,
    /// An open line was cut short by the other direction.
    interrupted: bool,
}

/// Stateful renderer shared by both directions of a session.
#[derive(Debug)]
pub struct Printer {
    theme: Theme,
    inbound: StreamState,
    outbound: StreamState,
    /// Direction whose line is currently open on screen.
    open: Option<Direction>,
}

impl Printer {
    /// Create a printer with the given theme.
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            inbound: StreamState::default(),
            outbound: StreamState::default(),
            open: None,
        }
    }

    fn stream_mut(&mut self, direction: Direction) -> &mut StreamState {
        match direction {
            Direction::Inbound => &mut self.inbound,
            Direction::Outbound => &mut self.outbound,
        }
    }

    /// True if the given direction is at the start of a physical line.
    pub fn at_line_start(&self, direction: Direction) -> bool {
        match direction {
            Direction::Inbound => !self.inbound.mid_line,
            Direction::Outbound => !self.outbound.mid_line,
        }
    }

    /// Record that the surface moved past the open line, if any.
    ///
    /// The stream that owned it resumes with a continuation marker.
    pub fn break_open_line(&mut self) {
        if let Some(open) = self.open.take() {
            let state = self.stream_mut(open);
            state.mid_line = false;
            state.interrupted = true;
        }
    }

    /// Render one tokenized line.
    pub fn render(&mut self, line: &TokenizedLine, direction: Direction) -> Vec<StyledSpan> {
        let mut spans = Vec::with_capacity(line.len() + 2);

        if let Some(open) = self.open.filter(|&open| open != direction) {
            spans.push(self.span(SpanKind::Token(TokenKind::Text), "\n".to_string()));
            let other = self.stream_mut(open);
            other.mid_line = false;
            other.interrupted = true;
        }

        let mut state = *self.stream_mut(direction);
        let mut first_line = true;

        for token in line {
            let text = token.text.replace('\r', "");
            for part in text.split_inclusive('\n') {
                if !state.mid_line {
                    let marker = if first_line && !state.interrupted {
                        SpanKind::Marker(direction)
                    } else {
                        SpanKind::Continuation
                    };
                    let marker_text = match marker {
                        SpanKind::Marker(d) => d.marker(),
                        _ => CONTINUATION_MARKER,
                    };
                    spans.push(self.span(marker, marker_text.to_string()));
                    state.interrupted = false;
                }
                first_line = false;
                state.mid_line = !part.ends_with('\n');
                spans.push(self.span(SpanKind::Token(token.kind), part.to_string()));
            }
        }

        *self.stream_mut(direction) = state;
        self.open = state.mid_line.then_some(direction);
        spans
    }

    fn span(&self, kind: SpanKind, text: String) -> StyledSpan {
        StyledSpan {
            kind,
            style: self.theme.style(kind),
            text,
        }
    }
}
