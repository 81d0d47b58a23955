use crate::http::error::{HttpError, HttpResult};
use crate::http::reader::read_line;
use crate::http::request::{Method, RequestDescriptor};
use tokio::io::AsyncBufRead;

/// Parser progress. `Done`/`Failed` are represented by the returned
/// `Result`, so only the reading states are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    RequestLine,
    Headers,
}

/// Reads the request line and the allow-listed headers.
///
/// Stops at the empty line that ends the head; no body byte is consumed.
/// Any failure rejects the whole request.
pub async fn parse_request<R>(reader: &mut R, max_line_len: usize) -> HttpResult<RequestDescriptor>
where
    R: AsyncBufRead + Unpin,
{
    let mut state = ParseState::RequestLine;
    let mut request: Option<RequestDescriptor> = None;

    loop {
        let line = match read_line(reader, max_line_len).await? {
            Some(line) => line,
            None => break,
        };

        match state {
            ParseState::RequestLine => {
                if line.is_empty() {
                    break;
                }
                request = Some(parse_request_line(&line)?);
                state = ParseState::Headers;
            }
            ParseState::Headers => {
                if line.is_empty() {
                    break;
                }
                if let Some(req) = request.as_mut() {
                    apply_header(req, &line)?;
                }
            }
        }
    }

    request.ok_or(HttpError::NullRequest)
}

/// Splits `METHOD PATH VERSION`; exactly three tokens are required.
pub fn parse_request_line(line: &str) -> HttpResult<RequestDescriptor> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(_version), None) => {
            Ok(RequestDescriptor::new(Method::from_token(method), path))
        }
        _ => Err(HttpError::BadRequestLine(line.to_string())),
    }
}

/// Applies one header line to the descriptor if its name is on the allow-list.
pub fn apply_header(req: &mut RequestDescriptor, line: &str) -> HttpResult<()> {
    let line = line.trim();
    let lower = line.to_ascii_lowercase();

    if lower.starts_with("expect: 100-continue") {
        req.expect_continue = true;
        return Ok(());
    }

    let Some((name, value)) = line.split_once(':') else {
        return Ok(());
    };
    let value = value.trim();

    match name.trim().to_ascii_lowercase().as_str() {
        "content-length" => {
            req.content_length = value
                .parse::<u64>()
                .map_err(|_| HttpError::HeaderParse(format!("invalid content-length {:?}", value)))?;
        }
        "host" => req.host = Some(value.to_string()),
        "x-filename" => req.x_filename = Some(value.to_string()),
        "x-final" => req.x_final = Some(value.to_string()),
        _ => {}
    }

    Ok(())
}
