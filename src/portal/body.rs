//! Request body ingestion strategies.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::http::error::{HttpError, HttpResult, transfer_buffer};
use crate::http::request::RequestDescriptor;

pub const UPLOAD_PATH: &str = "/api/upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStrategy {
    /// GET, or POST without content.
    None,
    /// Upload chunk: the handler reads the stream itself.
    Upload,
    /// Spool to a scratch file, then parse as JSON.
    SpooledJson,
}

impl BodyStrategy {
    pub fn select(req: &RequestDescriptor) -> Self {
        if !req.has_body() {
            BodyStrategy::None
        } else if req.path == UPLOAD_PATH {
            BodyStrategy::Upload
        } else {
            BodyStrategy::SpooledJson
        }
    }
}

/// Scratch file for one connection; never shared between connections.
pub fn spool_path(spool_dir: &Path, conn_id: u64) -> PathBuf {
    spool_dir.join(format!("spool-{}.json", conn_id))
}

/// Copy `content_length` bytes of `body` to the spool file, then parse it.
///
/// Copy failures are [`HttpError::SpoolWrite`]; parse failures are
/// [`HttpError::JsonDecode`]. The spool file is removed either way.
pub async fn ingest_json<R>(
    body: &mut R,
    content_length: u64,
    spool: &Path,
    chunk_size: usize,
) -> HttpResult<Value>
where
    R: AsyncRead + Unpin,
{
    let result = spool_and_parse(body, content_length, spool, chunk_size).await;
    if let Err(e) = fs::remove_file(spool).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(spool = %spool.display(), error = %e, "Failed to remove spool file");
        }
    }
    result
}

async fn spool_and_parse<R>(
    body: &mut R,
    content_length: u64,
    spool: &Path,
    chunk_size: usize,
) -> HttpResult<Value>
where
    R: AsyncRead + Unpin,
{
    let mut buf = transfer_buffer(chunk_size)?;
    let written = copy_to_spool(body, content_length, spool, &mut buf)
        .await
        .map_err(HttpError::SpoolWrite)?;
    drop(buf);
    debug!(spool = %spool.display(), written, "Body spooled");

    let bytes = fs::read(spool).await.map_err(HttpError::SpoolWrite)?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn copy_to_spool<R>(body: &mut R, content_length: u64, spool: &Path, buf: &mut [u8]) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = File::create(spool).await?;
    let mut remaining = content_length;

    while remaining > 0 {
        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = body.read(&mut buf[..want]).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }

    file.flush().await?;
    Ok(content_length - remaining)
}
