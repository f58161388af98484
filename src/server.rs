//! TCP front end. Each accepted connection is one observer speaking
//! newline-delimited JSON: requests in, events out.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::app::{App, Event, handle_action, trigger_action};
use crate::emitter::{Emitter, ObserverId};

/// Longest request line accepted from an observer, excluding the newline.
const MAX_REQUEST_LINE: usize = 64 * 1024;

pub const REQUEST_TOO_LONG: &str = "Request too long";

const ACCEPT_INITIAL_DELAY: Duration = Duration::from_millis(10);
const ACCEPT_MAX_DELAY: Duration = Duration::from_secs(1);

/// Delay between retries after `accept` fails: doubles per failure up to a
/// cap, and starts over once a connection is accepted.
#[derive(Debug)]
struct AcceptBackoff {
    delay: Duration,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            delay: ACCEPT_INITIAL_DELAY,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (delay * 2).min(ACCEPT_MAX_DELAY);
        delay
    }

    fn reset(&mut self) {
        self.delay = ACCEPT_INITIAL_DELAY;
    }
}

/// Accept observers until `shutdown` resolves.
///
/// Accept failures (descriptor exhaustion, aborted handshakes) are logged and
/// retried; they never stop the server.
pub async fn serve<S>(app: Arc<App>, listener: TcpListener, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut backoff = AcceptBackoff::new();
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    backoff.reset();
                    let app = Arc::clone(&app);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(app, stream).await {
                            tracing::debug!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    let local_addr = listener.local_addr().ok();
                    tracing::warn!(error = %e, ?local_addr, ?delay, "accept failed");
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }
    Ok(())
}

async fn handle_connection(app: Arc<App>, stream: TcpStream) -> Result<()> {
    let peer = stream.peer_addr().ok();
    let (reader, writer) = stream.into_split();
    let (observer, outbound) = app.observers.register();
    tracing::info!(
        %observer,
        ?peer,
        observers = app.observers.len(),
        run_active = app.is_running(),
        "observer connected"
    );

    let writer_task = tokio::spawn(write_events(observer, writer, outbound));
    let result = read_requests(&app, observer, reader).await;

    app.observers.remove(&observer);
    writer_task.await.ok();
    tracing::info!(%observer, "observer disconnected");
    result
}

async fn read_requests(
    app: &App,
    observer: ObserverId,
    reader: tokio::net::tcp::OwnedReadHalf,
) -> Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        let request = next_request(&mut reader, &mut buf)
            .await
            .context("failed to read request")?;
        let line = match request {
            Request::Closed => break,
            Request::TooLong => {
                tracing::warn!(%observer, limit = MAX_REQUEST_LINE, "request line too long");
                Emitter::new(app.observers.clone(), observer).emit(Event::status(REQUEST_TOO_LONG));
                continue;
            }
            Request::Line(line) => line,
        };
        match trigger_action(&line) {
            None => {}
            Some(Ok(action)) => {
                tracing::debug!(%observer, ?action, "request");
                handle_action(app, observer, action).await;
            }
            Some(Err(msg)) => {
                Emitter::new(app.observers.clone(), observer).emit(Event::status(msg));
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Request {
    Line(String),
    /// The line exceeded [`MAX_REQUEST_LINE`] and was discarded.
    TooLong,
    Closed,
}

/// Read one request line, buffering at most `MAX_REQUEST_LINE + 1` bytes of it.
async fn next_request<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Request>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_REQUEST_LINE as u64 + 1;
    buf.clear();
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(Request::Closed);
    }
    if buf.ends_with(b"\n") || buf.len() <= MAX_REQUEST_LINE {
        let line = String::from_utf8_lossy(buf);
        return Ok(Request::Line(
            line.trim_end_matches(['\n', '\r']).to_string(),
        ));
    }

    // Skip the rest of the oversized line.
    loop {
        buf.clear();
        let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
        if read == 0 || buf.ends_with(b"\n") {
            return Ok(Request::TooLong);
        }
    }
}

async fn write_events(
    observer: ObserverId,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Event>,
) {
    while let Some(event) = outbound.recv().await {
        let line = match event.to_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(%observer, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::debug!(%observer, error = %e, "observer write failed");
            break;
        }
    }
    let _ = writer.shutdown().await;
}
