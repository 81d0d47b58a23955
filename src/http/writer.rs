use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpResult;
use crate::http::mime::ContentType;
use crate::http::response::{ResponseHead, StatusCode};

/// Streams one response onto a connection.
///
/// Remembers whether the status line has gone out, so the connection can
/// tell a clean failure (error response still possible) from a partial one.
pub struct ResponseWriter<W> {
    inner: W,
    chunk_size: usize,
    header_sent: bool,
    bytes_written: u64,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            header_sent: false,
            bytes_written: 0,
        }
    }

    pub fn header_sent(&self) -> bool {
        self.header_sent
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Interim reply to `Expect: 100-continue`. Does not count as the response header.
    pub async fn send_continue(&mut self) -> HttpResult<()> {
        self.write_raw(b"HTTP/1.1 100 Continue\r\n\r\n").await
    }

    pub async fn send_head(&mut self, head: &ResponseHead) -> HttpResult<()> {
        let bytes = head.serialize();
        self.header_sent = true;
        self.write_raw(&bytes).await
    }

    pub async fn send_header(&mut self, status: StatusCode, content_type: ContentType) -> HttpResult<()> {
        let head = ResponseHead::new(status).header("Content-Type", content_type.as_str());
        self.send_head(&head).await
    }

    /// 302 with an empty body.
    pub async fn send_redirect(&mut self, location: &str) -> HttpResult<()> {
        let head = ResponseHead::new(StatusCode::Found)
            .header("Location", location)
            .header("Content-Type", ContentType::Html.as_str());
        self.send_head(&head).await
    }

    /// Full error response: header plus `{"status":"error","message":...}`.
    pub async fn send_error(&mut self, status: StatusCode, message: &str) -> HttpResult<()> {
        self.send_header(status, ContentType::Json).await?;
        self.send_status(false, message).await
    }

    /// JSON status object body: `{"status":"success"|"error","message":...}`.
    pub async fn send_status(&mut self, success: bool, message: &str) -> HttpResult<()> {
        let body = serde_json::json!({
            "status": if success { "success" } else { "error" },
            "message": message,
        });
        self.send_json(&body).await
    }

    pub async fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> HttpResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.send_chunked(&bytes).await
    }

    /// Writes `data` in slices of at most `chunk_size` bytes, flushing each.
    pub async fn send_chunked(&mut self, data: &[u8]) -> HttpResult<()> {
        for slice in data.chunks(self.chunk_size) {
            self.write_raw(slice).await?;
        }
        Ok(())
    }

    pub async fn write_raw(&mut self, data: &[u8]) -> HttpResult<()> {
        self.inner.write_all(data).await?;
        self.inner.flush().await?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> HttpResult<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
