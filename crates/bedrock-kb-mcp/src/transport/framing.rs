//! Message framing for newline-delimited JSON.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::types::{McpError, McpResult};

/// Splits an input stream into one message per line.
pub struct FrameReader<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Read the next non-blank line, trimmed. `Ok(None)` on a clean EOF.
    ///
    /// Cancel safe: a partially read line stays buffered for the next call.
    pub async fn read_frame(&mut self) -> McpResult<Option<String>> {
        loop {
            let n = self.reader.read_until(b'\n', &mut self.buf).await?;

            if n == 0 {
                if self.buf.iter().all(u8::is_ascii_whitespace) {
                    self.buf.clear();
                    return Ok(None);
                }
                let pending = self.buf.len();
                self.buf.clear();
                return Err(McpError::IncompleteStream(pending));
            }

            if self.buf.last() != Some(&b'\n') {
                // EOF mid-line; the next read returns 0.
                continue;
            }

            let raw = std::mem::take(&mut self.buf);
            let line = String::from_utf8(raw)
                .map_err(|e| McpError::Transport(format!("Invalid UTF-8 in message: {e}")))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }
}

/// Writes whole messages, each followed by a newline and a flush.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// `payload` must be a single line of JSON.
    pub async fn write_frame(&mut self, payload: &str) -> McpResult<()> {
        let framed = frame_message(payload)?;
        self.writer.write_all(framed.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Append the message boundary.
pub fn frame_message(payload: &str) -> McpResult<String> {
    if payload.contains('\n') {
        return Err(McpError::Transport(
            "Message payload contains a newline".to_string(),
        ));
    }
    let mut framed = String::with_capacity(payload.len() + 1);
    framed.push_str(payload);
    framed.push('\n');
    Ok(framed)
}
