//! File-backed record storage.
//!
//! `user` and `simplehist` are JSON documents; `jobhist` and `portrait` are
//! record files in the line format read by [`csv_json`](super::csv_json).
//! All access goes through one lock, so there is a single writer at a time.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::http::error::{HttpError, HttpResult};
use crate::portal::csv_json::{self, JOB_FIELDS, PORTRAIT_FIELDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    User,
    SimpleHist,
    JobHist,
    Portrait,
}

impl Section {
    pub fn name(&self) -> &'static str {
        match self {
            Section::User => "user",
            Section::SimpleHist => "simplehist",
            Section::JobHist => "jobhist",
            Section::Portrait => "portrait",
        }
    }

    /// Field order for record-file sections.
    pub fn record_fields(&self) -> Option<&'static [&'static str]> {
        match self {
            Section::JobHist => Some(&JOB_FIELDS),
            Section::Portrait => Some(&PORTRAIT_FIELDS),
            Section::User | Section::SimpleHist => None,
        }
    }
}

#[derive(Debug)]
pub struct FileStorage {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file of a section (`data/jobhist.csv`, `data/user.json`, ...).
    pub fn path_for(&self, section: Section) -> PathBuf {
        let ext = if section.record_fields().is_some() { "csv" } else { "json" };
        self.data_dir.join(format!("{}.{}", section.name(), ext))
    }

    /// Current JSON document of a section; a section never written reads
    /// as `null`. Record sections are streamed by [`csv_json`] instead.
    pub async fn read(&self, section: Section) -> HttpResult<Value> {
        let _guard = self.lock.lock().await;
        let text = match fs::read_to_string(self.path_for(section)).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Value::Null),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Store `value` in `section`.
    ///
    /// JSON sections are replaced. Record sections take one object (appended
    /// as a new line) or an array of objects (replacing the file).
    pub async fn write(&self, section: Section, value: &Value) -> HttpResult<()> {
        let _guard = self.lock.lock().await;
        fs::create_dir_all(&self.data_dir).await?;
        let path = self.path_for(section);

        let Some(fields) = section.record_fields() else {
            let bytes = serde_json::to_vec(value)?;
            return replace_file(&path, &bytes).await;
        };

        match value {
            Value::Object(record) => {
                let mut line = csv_json::encode_record(record, fields);
                line.push('\n');
                let mut file = fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await?;
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
            }
            Value::Array(items) => {
                let mut text = String::new();
                for item in items {
                    let record = item.as_object().ok_or_else(|| {
                        HttpError::Other(anyhow::anyhow!("{} entries must be objects", section.name()))
                    })?;
                    text.push_str(&csv_json::encode_record(record, fields));
                    text.push('\n');
                }
                replace_file(&path, text.as_bytes()).await?;
            }
            _ => {
                return Err(HttpError::Other(anyhow::anyhow!(
                    "{} expects an object or an array",
                    section.name()
                )));
            }
        }

        debug!(section = section.name(), "Section written");
        Ok(())
    }

    /// `true` once a non-empty user profile has been stored.
    pub async fn has_user(&self) -> bool {
        match self.read(Section::User).await {
            Ok(Value::Null) => false,
            Ok(Value::Object(map)) => !map.is_empty(),
            Ok(_) => true,
            Err(_) => false,
        }
    }
}

async fn replace_file(path: &Path, bytes: &[u8]) -> HttpResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
