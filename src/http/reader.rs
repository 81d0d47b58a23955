//! Bounded CRLF line reader.

use crate::http::error::{HttpError, HttpResult};
use bytes::BytesMut;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Reads one line (terminated by `\n`, optional preceding `\r`) from `reader`.
///
/// Returns `Ok(None)` when the stream ends before any byte of the line was
/// read. A line ending at EOF without terminator is returned as-is. Never
/// buffers more than `max_len` bytes; longer lines fail with
/// [`HttpError::Protocol`], as do lines that are not valid UTF-8.
pub async fn read_line<R>(reader: &mut R, max_len: usize) -> HttpResult<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = BytesMut::new();
    let mut terminated = false;

    while !terminated {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }

        let (take, found) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        if line.len() + take > max_len + 2 {
            return Err(HttpError::Protocol("line too long"));
        }

        line.extend_from_slice(&available[..take]);
        reader.consume(take);
        terminated = found;
    }

    if line.is_empty() {
        return Ok(None);
    }

    if line.ends_with(b"\n") {
        line.truncate(line.len() - 1);
        if line.ends_with(b"\r") {
            line.truncate(line.len() - 1);
        }
    }
    if line.len() > max_len {
        return Err(HttpError::Protocol("line too long"));
    }

    let text = std::str::from_utf8(&line).map_err(|_| HttpError::Protocol("invalid UTF-8"))?;
    Ok(Some(text.to_string()))
}
