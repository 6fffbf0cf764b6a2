//! Dedicated render task.
//!
//! The printer and the output surface are owned by one task that receives
//! lines over an mpsc channel. Both the reader and the input side of a
//! session submit to it, so render calls never overlap and the printer needs
//! no lock.
//!
//! # Architecture
//!
//! ```text
//! Reader ─┐
//!         ├─► mpsc::Sender<RenderRequest> ─► Render Task ─► Printer ─► Surface
//! Input  ─┘
//! ```
//!
//! Requests already queued when the task wakes are rendered together and
//! handed to the surface in a single call.

use std::io;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Direction, Printer, StyledSpan};
use crate::error::{NtshError, Result};
use crate::protocol::TokenizedLine;

/// Default channel capacity.
pub const DEFAULT_RENDER_CAPACITY: usize = 1024;

/// Maximum requests rendered per surface call.
const MAX_BATCH_SIZE: usize = 64;

/// Where styled spans end up.
///
/// Implementations must not corrupt an interactive edit line that may be
/// on screen when `print_spans` is called.
pub trait RenderSurface: Send + 'static {
    /// Print spans in order.
    fn print_spans(&mut self, spans: &[StyledSpan]) -> io::Result<()>;

    /// True if every `print_spans` call leaves the cursor on a fresh row,
    /// even when the spans end mid-line.
    fn breaks_open_lines(&self) -> bool {
        false
    }
}

/// A line waiting to be rendered.
#[derive(Debug)]
pub struct RenderRequest {
    /// Tokens to print.
    pub line: TokenizedLine,
    /// Whether the line was received or typed.
    pub direction: Direction,
}

/// Configuration for the render task.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Channel capacity for queued lines.
    pub channel_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_RENDER_CAPACITY,
        }
    }
}

/// Handle for submitting lines to the render task.
///
/// This is cheaply cloneable. The task exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct RenderHandle {
    tx: mpsc::Sender<RenderRequest>,
}

impl RenderHandle {
    /// Queue a line for rendering.
    ///
    /// Waits only if the channel is full.
    pub async fn submit(&self, line: TokenizedLine, direction: Direction) -> Result<()> {
        self.tx
            .send(RenderRequest { line, direction })
            .await
            .map_err(|_| NtshError::RenderClosed)
    }
}

/// Spawn the render task and return a handle for submitting lines.
///
/// # Arguments
///
/// * `printer` - Printer holding per-direction line state
/// * `surface` - Output surface
/// * `config` - Render configuration
///
/// # Returns
///
/// A tuple of `(RenderHandle, JoinHandle)`; the JoinHandle resolves once
/// every handle has been dropped and the queue is drained.
pub fn spawn_render_task<S>(
    printer: Printer,
    surface: S,
    config: RenderConfig,
) -> (RenderHandle, JoinHandle<Result<()>>)
where
    S: RenderSurface,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let task = tokio::spawn(render_loop(rx, printer, surface));
    (RenderHandle { tx }, task)
}

/// Main render loop - receives lines and prints them.
async fn render_loop<S>(
    mut rx: mpsc::Receiver<RenderRequest>,
    mut printer: Printer,
    mut surface: S,
) -> Result<()>
where
    S: RenderSurface,
{
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
    loop {
        let first = match rx.recv().await {
            Some(request) => request,
            None => {
                tracing::debug!("render channel closed");
                return Ok(());
            }
        };

        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(request) => batch.push(request),
                Err(_) => break,
            }
        }

        let spans: Vec<StyledSpan> = batch
            .drain(..)
            .flat_map(|request| printer.render(&request.line, request.direction))
            .collect();

        if let Err(e) = surface.print_spans(&spans) {
            tracing::error!("render surface failed: {}", e);
            return Err(e.into());
        }
        if surface.breaks_open_lines() {
            printer.break_open_line();
        }
    }
}
