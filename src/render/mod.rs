//! Render module - styled output for both directions of a session.
//!
//! Provides:
//! - [`Printer`] - adds direction markers and styles to tokenized lines
//! - [`Theme`] - span kind to terminal style
//! - [`spawn_render_task`] - serializes all rendering through one task

mod printer;
mod task;
mod theme;

pub use printer::{spans_text, Direction, Printer, SpanKind, StyledSpan, CONTINUATION_MARKER};
pub use task::{
    spawn_render_task, RenderConfig, RenderHandle, RenderRequest, RenderSurface,
    DEFAULT_RENDER_CAPACITY,
};
pub use theme::Theme;
