//! Line-oriented record files served as JSON arrays.
//!
//! Records are `id,text,text-with-commas` lines; newlines inside the last
//! field are stored as a literal `<br>`.

use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWrite, BufReader};
use tracing::{debug, warn};

use crate::http::error::HttpResult;
use crate::http::mime::ContentType;
use crate::http::response::StatusCode;
use crate::http::writer::ResponseWriter;

pub const NEWLINE_TOKEN: &str = "<br>";

/// Fields ending with this suffix are numeric ids.
pub const ID_SUFFIX: &str = "_no";

pub const JOB_FIELDS: [&str; 3] = ["job_no", "job_name", "job_description"];
pub const PORTRAIT_FIELDS: [&str; 3] = ["portrait_no", "portrait_url", "portrait_summary"];

#[derive(Debug, thiserror::Error)]
#[error("field {field} is not an integer: {value:?}")]
pub struct RecordError {
    pub field: &'static str,
    pub value: String,
}

/// Parse one record line into an ordered JSON object.
///
/// The line is split into at most `fields.len()` parts so the last field
/// keeps any commas it contains. Missing trailing fields are omitted.
pub fn parse_record(line: &str, fields: &[&'static str]) -> Result<Map<String, Value>, RecordError> {
    let mut record = Map::with_capacity(fields.len());

    for (&field, raw) in fields.iter().zip(line.splitn(fields.len(), ',')) {
        let text = raw.replace(NEWLINE_TOKEN, "\n");
        let value = if field.ends_with(ID_SUFFIX) {
            let id = text.trim().parse::<i64>().map_err(|_| RecordError {
                field,
                value: text.clone(),
            })?;
            Value::from(id)
        } else {
            Value::String(text)
        };
        record.insert(field.to_string(), value);
    }

    Ok(record)
}

/// Inverse of [`parse_record`]: one CSV line, no terminator.
///
/// Commas are only representable in the last field; earlier ones have them
/// replaced by spaces.
pub fn encode_record(record: &Map<String, Value>, fields: &[&'static str]) -> String {
    let last = fields.len().saturating_sub(1);
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let text = match record.get(*field) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            let text = text.replace("\r\n", "\n").replace('\n', NEWLINE_TOKEN);
            if i < last { text.replace(',', " ") } else { text }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Stream `source` as a JSON array without loading the whole file.
///
/// A missing or unreadable source truncates the array; the response itself
/// still completes.
pub async fn stream_as_json<W>(
    writer: &mut ResponseWriter<W>,
    source: &Path,
    fields: &[&'static str],
) -> HttpResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.send_header(StatusCode::Ok, ContentType::Json).await?;
    writer.write_raw(b"[\r\n").await?;

    match File::open(source).await {
        Ok(file) => {
            let mut lines = BufReader::new(file).lines();
            let mut first = true;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(source = %source.display(), error = %e, "Record file read failed, truncating");
                        break;
                    }
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let record = match parse_record(line, fields) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(source = %source.display(), error = %e, "Skipping malformed record");
                        continue;
                    }
                };

                if !first {
                    writer.write_raw(b",").await?;
                }
                let mut bytes = serde_json::to_vec(&record)?;
                bytes.extend_from_slice(b"\r\n");
                writer.send_chunked(&bytes).await?;
                first = false;
            }
        }
        Err(e) => {
            debug!(source = %source.display(), error = %e, "Record file unavailable");
        }
    }

    writer.write_raw(b"]\r\n\r\n").await
}
