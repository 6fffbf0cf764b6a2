//! Raw-mode terminal console built on crossterm.
//!
//! Key events are read on a dedicated thread that owns the [`LineEditor`]
//! and the [`History`]. Accepted lines travel to the session over a
//! channel. Output from the render task and redraws from the editor thread
//! share one [`Screen`] behind a mutex:
//!
//! ```text
//! keyboard ─► editor thread ─► mpsc ─► TerminalInput::read_line
//!                  │
//!                  └──────► Screen ◄── TerminalSurface::print_spans
//! ```
//!
//! Printing clears the edit line, writes the spans, and redraws the prompt
//! with the line being edited, so inbound data never garbles typing.

use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::style::{Print, PrintStyledContent};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use unicode_width::UnicodeWidthStr;

use super::{EditAction, History, InputSource, LineEditor, ReadOutcome};
use crate::protocol::Tokenizer;
use crate::render::{Direction, RenderSurface, SpanKind, StyledSpan, Theme};

/// Default prompt string.
pub const DEFAULT_PROMPT: &str = "> ";

/// How often the editor thread checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Settings for [`TerminalConsole::start`].
pub struct ConsoleOptions {
    /// Prompt shown before the edit line.
    pub prompt: String,
    /// Styles for the prompt and the highlighted edit line.
    pub theme: Theme,
    /// Tokenizer used to highlight the edit line.
    pub tokenizer: Arc<dyn Tokenizer>,
    /// Line history; accepted lines are appended to it.
    pub history: History,
}

/// Restores cooked mode when dropped, including on panic.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Terminal state shared by the editor thread and the render surface.
struct Screen {
    out: Stdout,
    prompt: String,
    theme: Theme,
    tokenizer: Arc<dyn Tokenizer>,
    /// Text being edited.
    line: String,
    /// Display column of the cursor within `line`.
    cursor_column: usize,
    /// False once input has ended; output no longer redraws the prompt.
    prompt_visible: bool,
}

impl Screen {
    fn clear_line(&mut self) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))
    }

    fn draw_prompt(&mut self) -> io::Result<()> {
        self.clear_line()?;
        if self.prompt_visible {
            let style = self.theme.style(SpanKind::Marker(Direction::Outbound));
            queue!(self.out, PrintStyledContent(style.apply(self.prompt.as_str())))?;
            for token in &self.tokenizer.tokenize(&self.line) {
                let style = self.theme.style(SpanKind::Token(token.kind));
                queue!(self.out, PrintStyledContent(style.apply(sanitize(&token.text))))?;
            }
            let column = self.prompt.width() + self.cursor_column;
            queue!(self.out, MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX)))?;
        }
        self.out.flush()
    }

    fn set_line(&mut self, editor: &LineEditor) {
        self.line = editor.text();
        self.cursor_column = editor.cursor_column();
    }

    fn print_above(&mut self, spans: &[StyledSpan]) -> io::Result<()> {
        self.clear_line()?;
        let mut at_line_start = true;
        for span in spans {
            let mut parts = span.text.split('\n').peekable();
            while let Some(part) = parts.next() {
                if !part.is_empty() {
                    queue!(self.out, PrintStyledContent(span.style.apply(sanitize(part))))?;
                    at_line_start = false;
                }
                if parts.peek().is_some() {
                    queue!(self.out, Print("\r\n"))?;
                    at_line_start = true;
                }
            }
        }
        if !at_line_start {
            // The peer's line is still open; keep it off the prompt row.
            queue!(self.out, Print("\r\n"))?;
        }
        self.draw_prompt()
    }
}

/// Replace control characters other than tab with caret notation.
fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push(c),
            '\u{7f}' => out.push_str("^?"),
            c if (c as u32) < 0x20 => {
                out.push('^');
                out.push(char::from(b'@' + c as u8));
            }
            c => out.push(c),
        }
    }
    out
}

fn lock(screen: &Mutex<Screen>) -> MutexGuard<'_, Screen> {
    screen.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Entry point for the interactive terminal.
pub struct TerminalConsole;

impl TerminalConsole {
    /// Switch the terminal to raw mode and start the editor thread.
    ///
    /// Returns the input half for the session and the surface for the
    /// render task. The terminal is restored when the editor thread ends.
    pub fn start(options: ConsoleOptions) -> io::Result<(TerminalInput, TerminalSurface)> {
        let guard = RawModeGuard::enable()?;

        let screen = Arc::new(Mutex::new(Screen {
            out: io::stdout(),
            prompt: options.prompt,
            theme: options.theme,
            tokenizer: options.tokenizer,
            line: String::new(),
            cursor_column: 0,
            prompt_visible: true,
        }));
        lock(&screen).draw_prompt()?;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let thread_screen = Arc::clone(&screen);
        let thread_cancel = cancel.clone();
        let history = options.history;
        thread::Builder::new()
            .name("ntsh-editor".to_string())
            .spawn(move || {
                let outcome = editor_loop(&thread_screen, history, &line_tx, &thread_cancel);
                if let Err(e) = outcome {
                    tracing::error!("terminal input failed: {}", e);
                    let _ = line_tx.send(ReadOutcome::Eof);
                }
                {
                    let mut screen = lock(&thread_screen);
                    screen.prompt_visible = false;
                    let _ = screen.draw_prompt();
                }
                drop(guard);
                tracing::debug!("terminal restored");
                let _ = ack_tx.send(());
            })?;

        let input = TerminalInput {
            lines: line_rx,
            cancel,
            ack: Some(ack_rx),
        };
        Ok((input, TerminalSurface { screen }))
    }
}

fn editor_loop(
    screen: &Mutex<Screen>,
    mut history: History,
    lines: &mpsc::UnboundedSender<ReadOutcome>,
    cancel: &CancellationToken,
) -> io::Result<()> {
    let mut editor = LineEditor::new();

    while !cancel.is_cancelled() {
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            Event::Resize(..) => {
                lock(screen).draw_prompt()?;
                continue;
            }
            _ => continue,
        };

        match editor.handle_key(key, history.entries()) {
            EditAction::Continue => {
                let mut screen = lock(screen);
                screen.set_line(&editor);
                screen.draw_prompt()?;
            }
            EditAction::Submit(line) => {
                history.push(&line);
                {
                    let mut screen = lock(screen);
                    screen.set_line(&editor);
                    screen.draw_prompt()?;
                }
                if lines.send(ReadOutcome::Line(line)).is_err() {
                    return Ok(());
                }
            }
            EditAction::Eof => {
                let _ = lines.send(ReadOutcome::Eof);
                return Ok(());
            }
            EditAction::Interrupt => {
                let _ = lines.send(ReadOutcome::Interrupted);
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Input half of the terminal console.
pub struct TerminalInput {
    lines: mpsc::UnboundedReceiver<ReadOutcome>,
    cancel: CancellationToken,
    ack: Option<oneshot::Receiver<()>>,
}

#[async_trait]
impl InputSource for TerminalInput {
    async fn read_line(&mut self) -> ReadOutcome {
        self.lines.recv().await.unwrap_or(ReadOutcome::Eof)
    }

    async fn cancel(&mut self) {
        self.cancel.cancel();
        if let Some(ack) = self.ack.take() {
            let _ = ack.await;
        }
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Render surface that prints above the edit line.
#[derive(Clone)]
pub struct TerminalSurface {
    screen: Arc<Mutex<Screen>>,
}

impl RenderSurface for TerminalSurface {
    fn print_spans(&mut self, spans: &[StyledSpan]) -> io::Result<()> {
        lock(&self.screen).print_above(spans)
    }

    fn breaks_open_lines(&self) -> bool {
        true
    }
}
