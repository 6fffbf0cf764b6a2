//! TCP transport and the outbound line sink.
//!
//! # Example
//!
//! ```ignore
//! use ntsh::transport::{connect, LineSink};
//!
//! let (reader, writer) = connect(&"localhost:7147".parse()?).await?;
//! let mut sink = LineSink::new(writer);
//! sink.send_line("?help").await?;
//! sink.close().await?;
//! ```

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::endpoint::Endpoint;
use crate::error::{NtshError, Result};

/// Connect to an endpoint and split the stream into read and write halves.
pub async fn connect(endpoint: &Endpoint) -> Result<(OwnedReadHalf, OwnedWriteHalf)> {
    let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|source| NtshError::Connect {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })?;

    // Typed lines are small and interactive.
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("could not disable Nagle's algorithm: {}", e);
    }
    if let Ok(peer) = stream.peer_addr() {
        tracing::info!(%peer, "connected");
    }

    Ok(stream.into_split())
}

/// Write side of a connection, closed at most once.
#[derive(Debug)]
pub struct LineSink<W> {
    writer: Option<W>,
    buf: BytesMut,
}

impl<W> LineSink<W>
where
    W: AsyncWrite + Unpin,
{
    /// Wrap an open writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Send `text` followed by a newline and wait for it to be flushed.
    ///
    /// Fails with `ConnectionClosed` after [`close`](Self::close).
    pub async fn send_line(&mut self, text: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(NtshError::ConnectionClosed)?;

        self.buf.clear();
        self.buf.reserve(text.len() + 1);
        self.buf.put_slice(text.as_bytes());
        self.buf.put_u8(b'\n');

        writer.write_all(&self.buf).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Shut down the write side.
    ///
    /// Returns `Ok(false)` if the sink was already closed.
    pub async fn close(&mut self) -> Result<bool> {
        match self.writer.take() {
            Some(mut writer) => {
                writer.shutdown().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Check whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}
