//! Console module - where typed lines come from.
//!
//! Provides:
//! - [`InputSource`] - what the session reads typed lines from
//! - [`LineEditor`] and [`History`] - editing state, independent of any terminal
//! - [`TerminalConsole`] - raw-mode crossterm implementation of input and output

mod editor;
mod history;
mod terminal;

use async_trait::async_trait;

pub use editor::{EditAction, LineEditor};
pub use history::{History, DEFAULT_HISTORY_CAPACITY};
pub use terminal::{ConsoleOptions, TerminalConsole, TerminalInput, TerminalSurface, DEFAULT_PROMPT};

/// Result of waiting for one typed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its newline.
    Line(String),
    /// The user ended input.
    Eof,
    /// The user pressed the interrupt key.
    Interrupted,
}

/// Source of typed lines.
///
/// `read_line` must be cancel-safe: dropping the future before it completes
/// must not lose a line.
#[async_trait]
pub trait InputSource: Send {
    /// Wait for the next line or for input to end.
    async fn read_line(&mut self) -> ReadOutcome;

    /// Stop reading and wait until the input surface has cleaned up.
    ///
    /// Calling this more than once is harmless.
    async fn cancel(&mut self) {}
}
