//! Stdio transport: JSON-RPC in on stdin, out on stdout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::protocol::codec;
use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcResponse, McpError, McpResult};

use super::framing::{FrameReader, FrameWriter};

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// How long queued responses may take to reach the output after shutdown.
pub const OUTPUT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Encoded response lines on their way to the writer task.
type Outbox = mpsc::UnboundedSender<String>;

/// Stdio transport for desktop MCP clients.
///
/// Messages are read strictly in order. Tool calls run on their own tasks so
/// a slow backend does not block reading. All output goes through a single
/// writer task, so responses never interleave and a stalled reader on the
/// other end never blocks the read loop or shutdown.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
    shutdown_grace: Duration,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// How long in-flight tool calls may run after input ends.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Serve stdin/stdout until EOF or Ctrl-C.
    pub async fn run(&self) -> McpResult<()> {
        tracing::info!("Stdio transport started");
        self.serve(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            ctrl_c(),
        )
        .await
    }

    /// Serve one connection until EOF, a transport error, or `shutdown`.
    pub async fn serve<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let mut frames = FrameReader::new(reader);
        let (outbox, queue) = mpsc::unbounded_channel();
        let mut output = tokio::spawn(write_frames(FrameWriter::new(writer), queue));
        let mut output_done = false;
        let mut in_flight: JoinSet<McpResult<()>> = JoinSet::new();
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                frame = frames.read_frame() => match frame {
                    Ok(Some(line)) => {
                        if let Err(e) = self.accept(&line, &outbox, &mut in_flight).await {
                            tracing::error!("Failed to queue response: {e}");
                            if e.is_fatal() {
                                break Err(e);
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::info!("EOF on stdin, shutting down");
                        break Ok(());
                    }
                    Err(e) => {
                        tracing::error!("Transport error: {e}");
                        break Err(e);
                    }
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = reap(joined) {
                        tracing::error!("Failed to queue response: {e}");
                        if e.is_fatal() {
                            break Err(e);
                        }
                    }
                }
                written = &mut output, if !output_done => {
                    // The writer only stops early when the output fails.
                    output_done = true;
                    let e = output_failure(written);
                    tracing::error!("Output closed: {e}");
                    break Err(e);
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break Ok(());
                }
            }
        };

        self.handler.close().await;
        self.drain(in_flight).await;
        drop(outbox);
        if !output_done {
            flush(output).await;
        }
        outcome
    }

    /// Decode one line and either answer it inline or hand it to a task.
    async fn accept(
        &self,
        line: &str,
        outbox: &Outbox,
        in_flight: &mut JoinSet<McpResult<()>>,
    ) -> McpResult<()> {
        let msg = match codec::decode(line) {
            Ok(msg) => msg,
            Err(failure) => {
                tracing::warn!("Rejected message: {failure}");
                if let Some(response) = failure.into_response() {
                    queue_response(outbox, &response)?;
                }
                return Ok(());
            }
        };

        if self.handler.is_deferred(&msg) {
            let admitted = self.handler.state().await;
            let handler = Arc::clone(&self.handler);
            let outbox = outbox.clone();
            in_flight.spawn(async move {
                match handler.handle_message_in(msg, admitted).await {
                    Some(response) => queue_response(&outbox, &response),
                    None => Ok(()),
                }
            });
            return Ok(());
        }

        if let Some(response) = self.handler.handle_message(msg).await {
            queue_response(outbox, &response)?;
        }
        Ok(())
    }

    /// Let in-flight calls finish within the grace period, then abandon the
    /// rest. Tasks only hand whole lines to the writer, so aborting one never
    /// leaves a partial response on the wire.
    async fn drain(&self, mut in_flight: JoinSet<McpResult<()>>) {
        if in_flight.is_empty() {
            return;
        }

        tracing::info!(
            "Waiting up to {:?} for {} in-flight request(s)",
            self.shutdown_grace,
            in_flight.len()
        );

        let finished = tokio::time::timeout(self.shutdown_grace, async {
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = reap(joined) {
                    tracing::error!("Failed to queue response: {e}");
                }
            }
        })
        .await;

        if finished.is_err() {
            tracing::warn!("Abandoning {} in-flight request(s)", in_flight.len());
            in_flight.shutdown().await;
        }
    }
}

/// Writer task: one framed write per queued line, until every sender is gone.
async fn write_frames<W>(
    mut writer: FrameWriter<W>,
    mut queue: mpsc::UnboundedReceiver<String>,
) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = queue.recv().await {
        writer.write_frame(&frame).await?;
    }
    Ok(())
}

/// Wait for queued output to be written, up to [`OUTPUT_FLUSH_TIMEOUT`].
async fn flush(mut output: JoinHandle<McpResult<()>>) {
    match tokio::time::timeout(OUTPUT_FLUSH_TIMEOUT, &mut output).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!("Failed to write response: {e}"),
        Ok(Err(e)) => tracing::error!("Output task failed: {e}"),
        Err(_) => {
            tracing::warn!(
                "Output not drained after {OUTPUT_FLUSH_TIMEOUT:?}; abandoning unwritten responses"
            );
            output.abort();
        }
    }
}

fn queue_response(outbox: &Outbox, response: &JsonRpcResponse) -> McpResult<()> {
    let payload = codec::encode(response)?;
    outbox
        .send(payload)
        .map_err(|_| McpError::Transport("Output closed".to_string()))
}

fn output_failure(written: Result<McpResult<()>, JoinError>) -> McpError {
    match written {
        Ok(Err(e)) => e,
        Ok(Ok(())) => McpError::Transport("Output closed".to_string()),
        Err(e) => McpError::Transport(format!("Output task failed: {e}")),
    }
}

fn reap(joined: Result<McpResult<()>, JoinError>) -> McpResult<()> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            tracing::error!("Request task panicked: {e}");
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
