//! # ntsh
//!
//! Interactive console for line-based TCP protocols.
//!
//! Lines typed at the prompt are sent to the peer, while everything the
//! peer sends is decoded, tokenized and printed with syntax highlighting
//! above the prompt, without disturbing what is being typed.
//!
//! ## Architecture
//!
//! ```text
//! socket ─► LineFramer ─► Tokenizer ─┐
//!                                    ├─► render task (Printer) ─► terminal
//! prompt ─► Tokenizer (echo) ────────┘
//!    └────► socket
//! ```
//!
//! - **Framing**: bytes to newline-aligned text, bounded memory
//! - **Protocol**: pluggable tokenizers (`plain`, `katcp`) and their options
//! - **Render**: direction markers, styles, and a single render task
//! - **Session**: reader and prompt run concurrently; first to finish wins
//!
//! ## Example
//!
//! ```ignore
//! use ntsh::protocol::ProtocolRegistry;
//! use ntsh::render::{spawn_render_task, Printer, Theme};
//! use ntsh::Session;
//!
//! #[tokio::main]
//! async fn main() -> ntsh::Result<()> {
//!     let protocol = ProtocolRegistry::builtin().resolve("katcp:unescape")?;
//!     let mut session = Session::builder()
//!         .protocol(protocol)
//!         .connect(&"localhost:7147".parse()?)
//!         .await?;
//!
//!     let (render, task) = spawn_render_task(
//!         Printer::new(Theme::default()),
//!         surface,
//!         session.config().render_config(),
//!     );
//!     session.run(&mut input, render).await?;
//!     task.await.ok();
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod console;
pub mod endpoint;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod render;
pub mod telemetry;
pub mod transport;

mod session;

pub use endpoint::Endpoint;
pub use error::{NtshError, Result};
pub use session::{
    Session, SessionBuilder, SessionConfig, SessionState, ShutdownTrigger, DEFAULT_DRAIN_GRACE,
    DEFAULT_READ_CHUNK_SIZE,
};
