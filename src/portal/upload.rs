//! Multi-request image upload.
//!
//! Each `POST /api/upload` appends its body to the session file named by
//! `X-Filename`, kept in a session directory apart from the served pages.
//! The request carrying `X-Final: true` then moves the session file onto the
//! canonical target. Chunks are trusted to arrive in order.

use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::http::error::{HttpResult, transfer_buffer};
use crate::http::request::RequestDescriptor;

/// One request's worth of an upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadChunk {
    pub filename: String,
    pub is_final: bool,
    pub content_length: u64,
}

impl UploadChunk {
    pub fn from_request(req: &RequestDescriptor, default_name: &str) -> Self {
        Self {
            filename: req
                .x_filename
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| default_name.to_string()),
            is_final: req.is_final_chunk(),
            content_length: req.content_length,
        }
    }
}

/// Result reported to the client as `{"status":..., "message":...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    ChunkReceived,
    Complete,
    WriteError(String),
    RenameError(String),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::ChunkReceived | UploadOutcome::Complete)
    }

    pub fn message(&self) -> String {
        match self {
            UploadOutcome::ChunkReceived => "Chunk received".to_string(),
            UploadOutcome::Complete => "Upload complete".to_string(),
            UploadOutcome::WriteError(e) => format!("Write Error: {}", e),
            UploadOutcome::RenameError(e) => format!("Failure Rename: {}", e),
        }
    }
}

/// Session file names are bare file names; separators and `..` are refused.
pub fn session_path(dir: &Path, filename: &str) -> Option<PathBuf> {
    let valid = !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.is_empty();
    valid.then(|| dir.join(filename))
}

/// Append the chunk body to its session file in `session_dir` and, on the
/// final chunk, replace `target` with it.
///
/// Reads at most `content_length` bytes from `body` in `chunk_size` slices;
/// an early end of stream just ends the chunk.
pub async fn receive_chunk<R>(
    body: &mut R,
    chunk: &UploadChunk,
    session_dir: &Path,
    target: &Path,
    chunk_size: usize,
) -> HttpResult<UploadOutcome>
where
    R: AsyncRead + Unpin,
{
    let Some(session) = session_path(session_dir, &chunk.filename) else {
        warn!(filename = %chunk.filename, "Rejected upload file name");
        return Ok(UploadOutcome::WriteError(format!("invalid file name {:?}", chunk.filename)));
    };

    let mut buf = transfer_buffer(chunk_size)?;
    match append_body(body, &session, chunk.content_length, &mut buf).await {
        Ok(written) => {
            debug!(filename = %chunk.filename, written, is_final = chunk.is_final, "Upload chunk stored");
        }
        Err(e) => {
            warn!(filename = %chunk.filename, error = %e, "Upload write error");
            return Ok(UploadOutcome::WriteError(e.to_string()));
        }
    }
    drop(buf);

    if !chunk.is_final {
        return Ok(UploadOutcome::ChunkReceived);
    }

    if let Err(e) = replace_target(&session, target).await {
        warn!(filename = %chunk.filename, error = %e, "Upload rename error");
        return Ok(UploadOutcome::RenameError(e.to_string()));
    }

    info!(target = %target.display(), "Upload complete");
    Ok(UploadOutcome::Complete)
}

async fn append_body<R>(body: &mut R, path: &Path, content_length: u64, buf: &mut [u8]) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
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

/// Remove-then-rename. Not atomic: a crash between the two steps leaves
/// no target, only the session file.
async fn replace_target(session: &Path, target: &Path) -> std::io::Result<()> {
    if session == target {
        return Ok(());
    }
    match fs::remove_file(target).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::rename(session, target).await
}
