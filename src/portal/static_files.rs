//! Sandboxed file serving.

use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite};
use tracing::debug;

use crate::http::error::{HttpError, HttpResult, transfer_buffer};
use crate::http::mime;
use crate::http::response::StatusCode;
use crate::http::writer::ResponseWriter;

pub const ADMIN_PREFIX: &str = "/admin";

/// Map a request path onto a file under `root`.
///
/// Any `..` segment, or anything that would not stay under `root`, is
/// rejected with [`HttpError::Forbidden`].
pub fn resolve(root: &Path, request_path: &str) -> HttpResult<PathBuf> {
    if request_path.contains("..") {
        return Err(HttpError::Forbidden(request_path.to_string()));
    }

    let relative = Path::new(request_path.trim_start_matches('/'));
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(HttpError::Forbidden(request_path.to_string()));
    }

    let resolved = root.join(relative);
    if !resolved.starts_with(root) {
        return Err(HttpError::Forbidden(request_path.to_string()));
    }
    Ok(resolved)
}

/// `/admin/user` → `/user.html`.
pub fn admin_asset_path(path: &str) -> String {
    format!("{}.html", path.replacen(ADMIN_PREFIX, "", 1))
}

/// Serve `request_path` from the sandbox with a status line and content type.
///
/// The file is opened before anything is written, so a missing file still
/// gets a clean 404.
pub async fn serve<W>(writer: &mut ResponseWriter<W>, root: &Path, request_path: &str) -> HttpResult<()>
where
    W: AsyncWrite + Unpin,
{
    let path = resolve(root, request_path)?;
    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HttpError::NotFound(request_path.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if file.metadata().await?.is_dir() {
        return Err(HttpError::NotFound(request_path.to_string()));
    }

    let content_type = mime::from_path(request_path);
    debug!(path = %path.display(), content_type = content_type.as_str(), "Serving static file");

    writer.send_header(StatusCode::Ok, content_type).await?;
    copy_to(writer, file).await
}

pub async fn serve_admin_asset<W>(writer: &mut ResponseWriter<W>, root: &Path, path: &str) -> HttpResult<()>
where
    W: AsyncWrite + Unpin,
{
    serve(writer, root, &admin_asset_path(path)).await
}

/// Body-only streaming for handlers whose header is already out.
pub async fn stream_file<W>(writer: &mut ResponseWriter<W>, path: &Path) -> HttpResult<()>
where
    W: AsyncWrite + Unpin,
{
    let file = File::open(path).await?;
    copy_to(writer, file).await
}

async fn copy_to<W>(writer: &mut ResponseWriter<W>, mut file: File) -> HttpResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = transfer_buffer(writer.chunk_size())?;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_raw(&buf[..n]).await?;
    }
}
