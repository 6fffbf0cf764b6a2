//! Session builder and runtime loop.
//!
//! The [`SessionBuilder`] configures framing limits and the protocol, then
//! connects (or attaches to existing streams). [`Session::run`] drives the
//! connection:
//! 1. Reader: socket bytes → [`LineFramer`] → tokenizer → render task
//! 2. Prompt: typed line → tokenizer → render task (echo) → socket
//! 3. Whichever finishes first wins; the other is cancelled
//! 4. The input source is cancelled and its cleanup awaited
//! 5. The write side is shut down exactly once
//!
//! # States
//!
//! ```text
//! Connecting ──► Active ──► Draining ──► Closed
//!     │
//!     └──► Failed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ntsh::{Session, render::{spawn_render_task, Printer, Theme}};
//!
//! let mut session = Session::builder()
//!     .protocol(registry.resolve("katcp")?)
//!     .connect(&"localhost:7147".parse()?)
//!     .await?;
//!
//! let (render, render_task) =
//!     spawn_render_task(Printer::new(Theme::default()), surface, session.config().render_config());
//! let trigger = session.run(&mut input, render).await?;
//! render_task.await??;
//! ```

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::console::{InputSource, ReadOutcome};
use crate::endpoint::Endpoint;
use crate::error::{NtshError, Result};
use crate::framing::LineFramer;
use crate::protocol::{ProtocolConfig, Tokenizer};
use crate::render::{Direction, RenderConfig, RenderHandle, DEFAULT_RENDER_CAPACITY};
use crate::transport::{self, LineSink};

pub use crate::framing::DEFAULT_READ_LIMIT;

/// Default size of a single socket read (64 KiB).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Default time the prompt keeps running after the peer closes.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection is being established.
    Connecting,
    /// Reader and prompt are running.
    Active,
    /// One side finished; the other is being torn down.
    Draining,
    /// Connection closed. Terminal.
    Closed,
    /// Connection could not be established. Terminal.
    Failed,
}

/// What ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// The peer closed its side of the connection.
    PeerClosed,
    /// The input source reported end of input.
    InputEnded,
    /// The user interrupted input.
    Interrupted,
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bytes buffered without a newline before a forced flush.
    pub read_limit: usize,
    /// Maximum bytes per socket read.
    pub read_chunk_size: usize,
    /// Render channel capacity.
    pub render_capacity: usize,
    /// How long the prompt keeps running after the peer closes.
    pub drain_grace: Duration,
}

impl SessionConfig {
    /// Configuration for the render task that serves this session.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            channel_capacity: self.render_capacity,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_limit: DEFAULT_READ_LIMIT,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            render_capacity: DEFAULT_RENDER_CAPACITY,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

/// Builder for configuring and creating a session.
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    protocol: ProtocolConfig,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a builder with the plain protocol and default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the protocol used to tokenize both directions.
    pub fn protocol(mut self, protocol: ProtocolConfig) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the framer limit.
    ///
    /// Default: 1 MiB
    pub fn read_limit(mut self, limit: usize) -> Self {
        self.config.read_limit = limit;
        self
    }

    /// Set the maximum size of one socket read.
    ///
    /// Default: 64 KiB
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the render channel capacity.
    ///
    /// Default: 1024
    pub fn render_capacity(mut self, capacity: usize) -> Self {
        self.config.render_capacity = capacity;
        self
    }

    /// Set how long the prompt may keep running after the peer closes.
    ///
    /// Default: 100 ms
    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.config.drain_grace = grace;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connect to `endpoint` over TCP.
    pub async fn connect(
        self,
        endpoint: &Endpoint,
    ) -> Result<Session<OwnedReadHalf, OwnedWriteHalf>> {
        tracing::debug!(%endpoint, state = ?SessionState::Connecting, "connecting");
        match transport::connect(endpoint).await {
            Ok((reader, writer)) => Ok(self.attach(reader, writer)),
            Err(e) => {
                tracing::error!(%endpoint, state = ?SessionState::Failed, "connection failed: {}", e);
                Err(e)
            }
        }
    }

    /// Build a session over already connected streams.
    pub fn attach<R, W>(self, reader: R, writer: W) -> Session<R, W>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::debug!(protocol = self.protocol.name(), state = ?SessionState::Active, "session started");
        Session {
            protocol: self.protocol,
            config: self.config,
            reader: Some(reader),
            sink: LineSink::new(writer),
            state: SessionState::Active,
        }
    }
}

/// One interactive connection.
pub struct Session<R, W> {
    protocol: ProtocolConfig,
    config: SessionConfig,
    /// Taken by `run`; `None` once the reader has been consumed.
    reader: Option<R>,
    sink: LineSink<W>,
    state: SessionState,
}

/// How the concurrent phase ended.
enum Finish {
    Reader(Result<()>, Option<Result<ShutdownTrigger>>),
    Prompt(Result<ShutdownTrigger>),
}

impl Session<OwnedReadHalf, OwnedWriteHalf> {
    /// Create a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Protocol in use.
    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    /// Run the reader and the prompt until one of them finishes.
    ///
    /// Every line is submitted to `render`. On return the input source has
    /// been cancelled and the connection is closed. Read and write failures
    /// are returned after that teardown.
    pub async fn run<I>(&mut self, input: &mut I, render: RenderHandle) -> Result<ShutdownTrigger>
    where
        I: InputSource + ?Sized,
    {
        let mut reader = match (self.state, self.reader.take()) {
            (SessionState::Active, Some(reader)) => reader,
            _ => return Err(NtshError::ConnectionClosed),
        };
        let tokenizer = self.protocol.tokenizer();
        let config = self.config.clone();

        let finish = {
            let read = read_loop(&mut reader, tokenizer.as_ref(), &render, &config);
            let prompt = prompt_loop(&mut *input, &mut self.sink, tokenizer.as_ref(), &render);
            tokio::pin!(read);
            tokio::pin!(prompt);

            tokio::select! {
                result = &mut read => {
                    // Let the prompt settle before it is torn down.
                    let late = tokio::time::timeout(config.drain_grace, &mut prompt).await.ok();
                    Finish::Reader(result, late)
                }
                result = &mut prompt => Finish::Prompt(result),
            }
        };

        self.transition(SessionState::Draining);
        input.cancel().await;
        drop(reader);
        self.close().await;

        match finish {
            Finish::Reader(Err(e), _) | Finish::Reader(Ok(()), Some(Err(e))) => {
                tracing::error!("session ended with error: {}", e);
                Err(e)
            }
            Finish::Reader(Ok(()), _) => {
                tracing::info!("connection closed by peer");
                Ok(ShutdownTrigger::PeerClosed)
            }
            Finish::Prompt(Ok(trigger)) => {
                tracing::info!(?trigger, "input ended");
                Ok(trigger)
            }
            Finish::Prompt(Err(e)) => {
                tracing::error!("session ended with error: {}", e);
                Err(e)
            }
        }
    }

    /// Close the connection.
    ///
    /// Safe to call more than once; the write side is shut down only the
    /// first time.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.reader = None;
        match self.sink.close().await {
            Ok(true) => tracing::debug!("write side shut down"),
            Ok(false) => {}
            Err(e) => tracing::debug!("error shutting down write side: {}", e),
        }
        self.transition(SessionState::Closed);
    }
}

/// Read from the peer until end of stream.
async fn read_loop<R>(
    reader: &mut R,
    tokenizer: &dyn Tokenizer,
    render: &RenderHandle,
    config: &SessionConfig,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut framer = LineFramer::with_limit(config.read_limit);
    let mut buf = vec![0u8; config.read_chunk_size.max(1)];

    loop {
        let want = framer.read_capacity(buf.len());
        let n = reader.read(&mut buf[..want]).await?;
        if n == 0 {
            if let Some(tail) = framer.finish() {
                submit_lines(&tail, tokenizer, render).await?;
            }
            return Ok(());
        }

        for chunk in framer.push(&buf[..n]) {
            submit_lines(&chunk, tokenizer, render).await?;
        }
    }
}

/// Render a decoded chunk one physical line at a time.
async fn submit_lines(text: &str, tokenizer: &dyn Tokenizer, render: &RenderHandle) -> Result<()> {
    for line in text.split_inclusive('\n') {
        render
            .submit(tokenizer.tokenize(line), Direction::Inbound)
            .await?;
    }
    Ok(())
}

/// Echo and send typed lines until input ends.
async fn prompt_loop<I, W>(
    input: &mut I,
    sink: &mut LineSink<W>,
    tokenizer: &dyn Tokenizer,
    render: &RenderHandle,
) -> Result<ShutdownTrigger>
where
    I: InputSource + ?Sized,
    W: AsyncWrite + Unpin,
{
    loop {
        let text = match input.read_line().await {
            ReadOutcome::Line(text) => text,
            ReadOutcome::Eof => return Ok(ShutdownTrigger::InputEnded),
            ReadOutcome::Interrupted => return Ok(ShutdownTrigger::Interrupted),
        };

        let echo = format!("{}\n", text);
        render
            .submit(tokenizer.tokenize(&echo), Direction::Outbound)
            .await?;
        sink.send_line(&text).await?;
    }
}
