//! Colour theme for spans.

use std::collections::HashMap;

use crossterm::style::{Attribute, Attributes, Color, ContentStyle};

use super::{Direction, SpanKind};
use crate::protocol::{NumberKind, TokenKind};

/// Mapping from span kind to terminal style.
///
/// Kinds without an entry render unstyled.
#[derive(Debug, Clone)]
pub struct Theme {
    styles: HashMap<SpanKind, ContentStyle>,
}

fn fg(color: Color) -> ContentStyle {
    ContentStyle {
        foreground_color: Some(color),
        ..ContentStyle::default()
    }
}

impl Theme {
    /// Theme with no styling at all.
    pub fn monochrome() -> Self {
        Self {
            styles: HashMap::new(),
        }
    }

    /// The standard palette.
    pub fn classic() -> Self {
        Self::monochrome()
            .with_style(SpanKind::Marker(Direction::Outbound), fg(Color::Magenta))
            .with_style(SpanKind::Marker(Direction::Inbound), fg(Color::Cyan))
            .with_style(SpanKind::Token(TokenKind::Request), fg(Color::Magenta))
            .with_style(SpanKind::Token(TokenKind::Reply), fg(Color::Cyan))
            .with_style(SpanKind::Token(TokenKind::Inform), fg(Color::DarkGrey))
            .with_style(SpanKind::Token(TokenKind::String), fg(Color::Grey))
            .with_style(SpanKind::Token(TokenKind::StringEscape), fg(Color::White))
            .with_style(
                SpanKind::Token(TokenKind::Number(NumberKind::Integer)),
                fg(Color::Green),
            )
            .with_style(
                SpanKind::Token(TokenKind::Number(NumberKind::Float)),
                fg(Color::Green),
            )
            .with_style(
                SpanKind::Token(TokenKind::Error),
                ContentStyle {
                    attributes: Attributes::from(Attribute::Underlined),
                    ..ContentStyle::default()
                },
            )
    }

    /// Override the style of one span kind.
    pub fn with_style(mut self, kind: SpanKind, style: ContentStyle) -> Self {
        self.styles.insert(kind, style);
        self
    }

    /// Style for a span kind.
    pub fn style(&self, kind: SpanKind) -> ContentStyle {
        self.styles.get(&kind).copied().unwrap_or_default()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
