//! Captive-portal application layer
//!
//! Classification, routing and the handlers behind the route table. The
//! HTTP engine in [`crate::http`] drives these per connection.

pub mod body;
pub mod captive;
pub mod csv_json;
pub mod network;
pub mod router;
pub mod static_files;
pub mod storage;
pub mod upload;

use serde_json::Value;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::config::Config;
use crate::http::error::HttpResult;
use crate::http::request::{Method, RequestContext};
use crate::http::writer::ResponseWriter;
use network::NetworkInfo;
use router::Handler;
use storage::{FileStorage, Section};
use upload::UploadChunk;

const EMPTY_USER_MESSAGE: &[u8] = b"User data is empty. Please go to /admin/user";
const METHOD_NOT_ALLOWED: &str = "Method not allowed";

/// Process-wide, read-only application state shared by every connection.
#[derive(Debug)]
pub struct Portal {
    pub config: Config,
    pub storage: FileStorage,
    pub network: NetworkInfo,
}

impl Portal {
    pub fn new(config: Config) -> Self {
        let storage = FileStorage::new(config.storage.data_dir.clone());
        let network = NetworkInfo::from_config(&config);
        Self {
            config,
            storage,
            network,
        }
    }

    pub fn www_root(&self) -> &std::path::Path {
        &self.config.storage.www_root
    }

    fn page(&self, name: &str) -> PathBuf {
        self.www_root().join(name)
    }

    /// Run a table handler. The `200` header has already been sent.
    pub async fn handle<R, W>(
        &self,
        handler: Handler,
        ctx: &RequestContext,
        body: Option<Value>,
        reader: &mut R,
        writer: &mut ResponseWriter<W>,
    ) -> HttpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let method = &ctx.request.method;
        debug!(conn = ctx.conn_id, ?handler, method = method.as_str(), "Dispatching handler");

        match handler {
            Handler::Index => {
                if !self.storage.has_user().await {
                    return writer.send_chunked(EMPTY_USER_MESSAGE).await;
                }
                static_files::stream_file(writer, &self.page("index.html")).await
            }
            Handler::HotspotDetect => {
                static_files::stream_file(writer, &self.page("hotspot-detect.html")).await
            }
            // GET on an admin page is served as a templated asset before the table.
            Handler::AdminPage(section) => match method {
                Method::POST => self.store_section(section, body, writer).await,
                _ => Ok(()),
            },
            Handler::AdminLog => {
                if *method != Method::GET {
                    return writer.send_chunked(METHOD_NOT_ALLOWED.as_bytes()).await;
                }
                match static_files::stream_file(writer, &self.config.storage.log_file).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        debug!(conn = ctx.conn_id, error = %e, "Log file unavailable");
                        Ok(())
                    }
                }
            }
            Handler::ApiRead(section) => {
                if *method != Method::GET {
                    return writer.send_status(false, METHOD_NOT_ALLOWED).await;
                }
                let value = self.storage.read(section).await?;
                writer.send_json(&value).await
            }
            Handler::Upload => {
                if *method != Method::POST {
                    return writer.send_status(false, METHOD_NOT_ALLOWED).await;
                }
                let chunk = UploadChunk::from_request(&ctx.request, &self.config.storage.default_upload_name);
                let outcome = upload::receive_chunk(
                    reader,
                    &chunk,
                    &self.config.storage.upload_dir,
                    &self.page(&self.config.storage.upload_target),
                    writer.chunk_size(),
                )
                .await?;
                writer.send_status(outcome.is_success(), &outcome.message()).await
            }
            Handler::Network => {
                if *method != Method::GET {
                    return writer.send_chunked(METHOD_NOT_ALLOWED.as_bytes()).await;
                }
                writer.send_json(&self.network).await
            }
        }
    }

    async fn store_section<W>(
        &self,
        section: Section,
        body: Option<Value>,
        writer: &mut ResponseWriter<W>,
    ) -> HttpResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let Some(value) = body else {
            return writer.send_status(false, "Empty body").await;
        };

        match self.storage.write(section, &value).await {
            Ok(()) => writer.send_json(&serde_json::json!({ "status": "success" })).await,
            Err(e) => {
                warn!(section = section.name(), error = %e, "Storage write failed");
                writer.send_status(false, &e.to_string()).await
            }
        }
    }
}
