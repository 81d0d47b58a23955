use crate::http::response::StatusCode;
use thiserror::Error;

/// Every way a single request can fail.
///
/// Operations return these tags; the connection boundary is the only place
/// that turns them into a status line (see [`HttpError::status`]).
#[derive(Debug, Error)]
pub enum HttpError {
    /// Stream closed before a request line arrived.
    #[error("null request")]
    NullRequest,

    #[error("bad request line: {0:?}")]
    BadRequestLine(String),

    #[error("header parse error: {0}")]
    HeaderParse(String),

    /// Undecodable bytes or a line longer than the configured bound.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("spool write failed: {0}")]
    SpoolWrite(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("out of memory")]
    OutOfMemory(#[from] std::collections::TryReserveError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::NullRequest
            | HttpError::BadRequestLine(_)
            | HttpError::HeaderParse(_)
            | HttpError::Protocol(_)
            | HttpError::JsonDecode(_) => StatusCode::BadRequest,
            HttpError::Forbidden(_) => StatusCode::Forbidden,
            HttpError::NotFound(_) => StatusCode::NotFound,
            HttpError::SpoolWrite(_) | HttpError::Io(_) | HttpError::Other(_) => {
                StatusCode::InternalServerError
            }
            HttpError::OutOfMemory(_) => StatusCode::ServiceUnavailable,
        }
    }

    /// Message placed in the JSON error body.
    pub fn client_message(&self) -> &'static str {
        match self {
            HttpError::NullRequest => "Null Request",
            HttpError::BadRequestLine(_) => "Bad Request Line",
            HttpError::HeaderParse(_) | HttpError::Protocol(_) => "Bad Request",
            HttpError::JsonDecode(_) => "JSON Decode Error",
            HttpError::Forbidden(_) => "Access Denied",
            HttpError::NotFound(_) => "Not Found",
            HttpError::SpoolWrite(_) => "File Write Error",
            HttpError::Io(_) => "File I/O Error",
            HttpError::OutOfMemory(_) => "Memory Error",
            HttpError::Other(_) => "Server Error",
        }
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, HttpError::OutOfMemory(_))
    }
}

pub type HttpResult<T> = Result<T, HttpError>;

/// Allocate a zeroed transfer buffer without aborting on allocation failure.
pub fn transfer_buffer(size: usize) -> HttpResult<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)?;
    buf.resize(size, 0);
    Ok(buf)
}
