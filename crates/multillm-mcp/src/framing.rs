//! Content-Length message framing
//!
//! Each message is `Content-Length: <N>\r\n\r\n` followed by exactly `N`
//! bytes of JSON. Other header lines are tolerated and ignored.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::McpError;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "content-length:";

/// Upper bound on a header block; anything longer is not a valid frame
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Reads framed messages from a byte stream
pub struct FrameReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Read one complete message body
    ///
    /// Returns [`McpError::ConnectionClosed`] if the stream ends before the
    /// header terminator or before the full body.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, McpError> {
        let header = self.read_header().await?;
        let length = content_length(&header)?;

        let mut body = vec![0; length];
        self.inner.read_exact(&mut body).await.map_err(closed_on_eof)?;
        Ok(body)
    }

    async fn read_header(&mut self) -> Result<Vec<u8>, McpError> {
        let mut header = Vec::with_capacity(64);

        while !header.ends_with(HEADER_TERMINATOR) {
            if header.len() >= MAX_HEADER_BYTES {
                return Err(McpError::Framing(format!(
                    "header exceeds {MAX_HEADER_BYTES} bytes"
                )));
            }
            header.push(self.inner.read_u8().await.map_err(closed_on_eof)?);
        }

        header.truncate(header.len() - HEADER_TERMINATOR.len());
        Ok(header)
    }
}

/// Writes framed messages to a byte stream
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write header and body, then flush
    pub async fn write_frame(&mut self, body: &[u8]) -> Result<(), McpError> {
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.inner.write_all(header.as_bytes()).await?;
        self.inner.write_all(body).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Serialize `message` as compact JSON and write it as one frame
    pub async fn write_json<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<(), McpError> {
        let body = serde_json::to_vec(message)?;
        self.write_frame(&body).await
    }
}

fn content_length(header: &[u8]) -> Result<usize, McpError> {
    let header = std::str::from_utf8(header)
        .map_err(|_| McpError::Framing("header is not valid ASCII".to_owned()))?;

    for line in header.split("\r\n") {
        let Some(prefix) = line.get(..CONTENT_LENGTH.len()) else {
            continue;
        };
        if prefix.eq_ignore_ascii_case(CONTENT_LENGTH) {
            let value = line[CONTENT_LENGTH.len()..].trim();
            return value
                .parse::<usize>()
                .map_err(|_| McpError::Framing(format!("invalid Content-Length value: {value:?}")));
        }
    }

    Err(McpError::Framing("missing Content-Length header".to_owned()))
}

fn closed_on_eof(error: io::Error) -> McpError {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        McpError::ConnectionClosed
    } else {
        McpError::Io(error)
    }
}
