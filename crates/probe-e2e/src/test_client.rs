//! Low-level client helpers for probing behavior reqwest hides

use std::time::Duration;

use anyhow::Result;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Everything the server sent before the connection ended
#[derive(Debug)]
pub struct RawResponse {
    pub bytes: Vec<u8>,
    /// The read ended with an error (e.g. no TLS close_notify) rather than EOF
    pub read_error: Option<std::io::ErrorKind>,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn has_status_line(&self) -> bool {
        self.bytes.starts_with(b"HTTP/")
    }
}

/// Write a raw request and read until the server closes the connection
pub async fn send_raw<S>(stream: &mut S, request: &str, timeout: Duration) -> Result<RawResponse>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request.as_bytes()).await?;
    stream.flush().await?;

    let mut bytes = Vec::new();
    let read = tokio::time::timeout(timeout, stream.read_to_end(&mut bytes))
        .await
        .map_err(|_| anyhow::anyhow!("server kept the connection open"))?;

    Ok(RawResponse {
        bytes,
        read_error: read.err().map(|e| e.kind()),
    })
}

/// Reads `<data>\n\n` events out of a streaming response
pub struct SseReader {
    response: reqwest::Response,
    buffer: BytesMut,
}

impl SseReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: BytesMut::new(),
        }
    }

    /// Next event payload without the trailing blank line, or `None` when
    /// the stream ends
    pub async fn next_event(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
                let event = self.buffer.split_to(end + 2);
                let text = String::from_utf8_lossy(&event[..end]).into_owned();
                return Ok(Some(text));
            }

            match self.response.chunk().await? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => return Ok(None),
            }
        }
    }
}

/// Read one SSE event, failing if none arrives within `timeout`
pub async fn read_sse_event(reader: &mut SseReader, timeout: Duration) -> Result<String> {
    tokio::time::timeout(timeout, reader.next_event())
        .await
        .map_err(|_| anyhow::anyhow!("no SSE event within {:?}", timeout))??
        .ok_or_else(|| anyhow::anyhow!("SSE stream ended"))
}
