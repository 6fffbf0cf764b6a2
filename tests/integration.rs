//! Integration tests for ntsh.
//!
//! These run whole sessions against an in-memory or loopback peer, with
//! scripted input and a surface that records what would be printed.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{duplex, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ntsh::console::{InputSource, ReadOutcome};
use ntsh::protocol::{ProtocolRegistry, TokenKind};
use ntsh::render::{
    spans_text, spawn_render_task, Direction, Printer, RenderConfig, RenderSurface, SpanKind,
    StyledSpan, Theme,
};
use ntsh::{Endpoint, NtshError, Session, SessionBuilder, SessionState, ShutdownTrigger};

/// Surface that keeps every span it is given.
#[derive(Clone, Default)]
struct Recording {
    spans: Arc<Mutex<Vec<StyledSpan>>>,
}

impl Recording {
    fn text(&self) -> String {
        spans_text(&self.spans.lock().unwrap())
    }

    fn kinds(&self) -> Vec<SpanKind> {
        self.spans.lock().unwrap().iter().map(|s| s.kind).collect()
    }
}

impl RenderSurface for Recording {
    fn print_spans(&mut self, spans: &[StyledSpan]) -> io::Result<()> {
        self.spans.lock().unwrap().extend_from_slice(spans);
        Ok(())
    }
}

/// Input fed from a channel; stays pending once the sender is gone.
struct ChannelInput {
    rx: mpsc::UnboundedReceiver<ReadOutcome>,
    cancels: Arc<AtomicUsize>,
}

fn channel_input() -> (mpsc::UnboundedSender<ReadOutcome>, ChannelInput, Arc<AtomicUsize>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancels = Arc::new(AtomicUsize::new(0));
    let input = ChannelInput {
        rx,
        cancels: cancels.clone(),
    };
    (tx, input, cancels)
}

#[async_trait]
impl InputSource for ChannelInput {
    async fn read_line(&mut self) -> ReadOutcome {
        match self.rx.recv().await {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }

    async fn cancel(&mut self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Writer that counts shutdown calls.
struct CountingWriter {
    inner: WriteHalf<DuplexStream>,
    shutdowns: Arc<AtomicUsize>,
}

impl AsyncWrite for CountingWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let result = Pin::new(&mut self.inner).poll_shutdown(cx);
        if result.is_ready() {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

type TestSession = Session<ReadHalf<DuplexStream>, CountingWriter>;

fn attach(builder: SessionBuilder) -> (TestSession, DuplexStream, Arc<AtomicUsize>) {
    let (local, peer) = duplex(64 * 1024);
    let (reader, writer) = tokio::io::split(local);
    let shutdowns = Arc::new(AtomicUsize::new(0));
    let writer = CountingWriter {
        inner: writer,
        shutdowns: shutdowns.clone(),
    };
    let builder = builder.drain_grace(Duration::from_millis(10));
    (builder.attach(reader, writer), peer, shutdowns)
}

/// Run a session to completion and return the trigger and everything printed.
async fn run_session(
    session: &mut TestSession,
    input: &mut ChannelInput,
) -> (ntsh::Result<ShutdownTrigger>, Recording) {
    let recording = Recording::default();
    let (render, task) = spawn_render_task(
        Printer::new(Theme::monochrome()),
        recording.clone(),
        RenderConfig::default(),
    );
    let result = session.run(input, render).await;
    task.await.unwrap().unwrap();
    (result, recording)
}

/// Test a KATCP exchange: echo, request on the wire, then replies.
#[tokio::test]
async fn test_katcp_exchange_renders_both_directions() {
    let protocol = ProtocolRegistry::builtin().resolve("katcp").unwrap();
    let (mut session, mut peer, _) = attach(SessionBuilder::new().protocol(protocol));
    let (tx, mut input, _) = channel_input();

    let peer_task = tokio::spawn(async move {
        let mut buf = [0u8; 6];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"?help\n");
        peer.write_all(b"#help watchdog\n!help ok 1\n").await.unwrap();
    });

    tx.send(ReadOutcome::Line("?help".into())).unwrap();
    let (result, recording) = run_session(&mut session, &mut input).await;
    peer_task.await.unwrap();

    assert_eq!(result.unwrap(), ShutdownTrigger::PeerClosed);
    assert_eq!(
        recording.text(),
        "> ?help\n< #help watchdog\n< !help ok 1\n"
    );

    let kinds = recording.kinds();
    assert_eq!(kinds[0], SpanKind::Marker(Direction::Outbound));
    assert_eq!(kinds[1], SpanKind::Token(TokenKind::Request));
    assert!(kinds.contains(&SpanKind::Token(TokenKind::Inform)));
    assert!(kinds.contains(&SpanKind::Token(TokenKind::Reply)));
}

/// Test peer close as the trigger: one shutdown, input cancelled.
#[tokio::test]
async fn test_reader_eof_closes_exactly_once() {
    let (mut session, peer, shutdowns) = attach(SessionBuilder::new());
    let (_tx, mut input, cancels) = channel_input();
    drop(peer);

    let (result, _) = run_session(&mut session, &mut input).await;

    assert_eq!(result.unwrap(), ShutdownTrigger::PeerClosed);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);

    session.close().await;
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

/// Test end of input as the trigger: one shutdown, peer sees EOF.
#[tokio::test]
async fn test_input_eof_closes_exactly_once() {
    let (mut session, mut peer, shutdowns) = attach(SessionBuilder::new());
    let (tx, mut input, cancels) = channel_input();

    tx.send(ReadOutcome::Line("QUIT".into())).unwrap();
    tx.send(ReadOutcome::Eof).unwrap();
    let (result, recording) = run_session(&mut session, &mut input).await;

    assert_eq!(result.unwrap(), ShutdownTrigger::InputEnded);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(recording.text(), "> QUIT\n");

    let mut received = Vec::new();
    peer.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"QUIT\n");

    session.close().await;
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

/// Test that a session cannot be run twice.
#[tokio::test]
async fn test_run_after_shutdown_fails() {
    let (mut session, _peer, shutdowns) = attach(SessionBuilder::new());
    let (tx, mut input, _) = channel_input();
    tx.send(ReadOutcome::Interrupted).unwrap();

    let (result, _) = run_session(&mut session, &mut input).await;
    assert_eq!(result.unwrap(), ShutdownTrigger::Interrupted);

    let (again, _) = run_session(&mut session, &mut input).await;
    assert!(matches!(again, Err(NtshError::ConnectionClosed)));
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
}

/// Test an unterminated final line is still shown.
#[tokio::test]
async fn test_unterminated_tail_rendered_at_eof() {
    let (mut session, mut peer, _) = attach(SessionBuilder::new());
    let (_tx, mut input, _) = channel_input();

    peer.write_all(b"220 ready\r\n250 partial").await.unwrap();
    drop(peer);

    let (result, recording) = run_session(&mut session, &mut input).await;
    assert_eq!(result.unwrap(), ShutdownTrigger::PeerClosed);
    assert_eq!(recording.text(), "< 220 ready\n< 250 partial");
}

/// Test the framer limit flushes a line that never ends.
#[tokio::test]
async fn test_read_limit_forces_flush() {
    let (mut session, mut peer, _) = attach(SessionBuilder::new().read_limit(8).read_chunk_size(3));
    let (_tx, mut input, _) = channel_input();

    peer.write_all(b"abcdefghij\n").await.unwrap();
    drop(peer);

    let (_, recording) = run_session(&mut session, &mut input).await;
    assert_eq!(recording.text(), "< abcdefghij\n");

    let spans = recording.spans.lock().unwrap();
    let content: Vec<&str> = spans
        .iter()
        .filter(|s| matches!(s.kind, SpanKind::Token(_)))
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(content, vec!["abcdefgh", "ij\n"]);
}

/// Test a multi-byte character split across writes.
#[tokio::test]
async fn test_split_utf8_across_reads() {
    let (mut session, mut peer, _) = attach(SessionBuilder::new().read_chunk_size(1));
    let (_tx, mut input, _) = channel_input();

    let bytes = "!ok température\n".as_bytes();
    for b in bytes {
        peer.write_all(&[*b]).await.unwrap();
    }
    peer.write_all(b"\xff\n").await.unwrap();
    drop(peer);

    let (_, recording) = run_session(&mut session, &mut input).await;
    assert_eq!(recording.text(), "< !ok température\n< \u{fffd}\n");
}

/// Test unescaping through the registry and the whole pipeline.
#[tokio::test]
async fn test_unescape_option_applies_to_inbound() {
    let protocol = ProtocolRegistry::builtin()
        .resolve("katcp:unescape")
        .unwrap();
    let (mut session, mut peer, _) = attach(SessionBuilder::new().protocol(protocol));
    let (_tx, mut input, _) = channel_input();

    peer.write_all(b"#log hello\\_world\n").await.unwrap();
    drop(peer);

    let (_, recording) = run_session(&mut session, &mut input).await;
    assert_eq!(recording.text(), "< #log hello world\n");
    assert!(!recording
        .kinds()
        .contains(&SpanKind::Token(TokenKind::StringEscape)));
}

/// Test a real TCP connection through the builder.
#[tokio::test]
async fn test_tcp_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::new("127.0.0.1", listener.local_addr().unwrap().port());

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"HELLO\n").await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    });

    let mut session = Session::builder().connect(&endpoint).await.unwrap();
    let (tx, mut input, _) = channel_input();

    let recording = Recording::default();
    let (render, task) = spawn_render_task(
        Printer::new(Theme::monochrome()),
        recording.clone(),
        RenderConfig::default(),
    );

    // Answer once the greeting has been printed.
    let feeder = {
        let recording = recording.clone();
        tokio::spawn(async move {
            while !recording.text().contains("HELLO") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tx.send(ReadOutcome::Line("BYE".into())).unwrap();
            tx.send(ReadOutcome::Eof).unwrap();
        })
    };

    let trigger = session.run(&mut input, render).await.unwrap();
    task.await.unwrap().unwrap();
    feeder.await.unwrap();

    assert_eq!(trigger, ShutdownTrigger::InputEnded);
    assert_eq!(server.await.unwrap(), b"BYE\n");
    assert_eq!(recording.text(), "< HELLO\n> BYE\n");
}

/// Test connection failure is reported with the endpoint.
#[tokio::test]
async fn test_connect_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = Session::builder()
        .connect(&Endpoint::new("127.0.0.1", port))
        .await;

    match result {
        Err(NtshError::Connect { host, port: p, .. }) => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(p, port);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("connected to a closed port"),
    }
}
