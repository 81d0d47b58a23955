use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, error, info, warn};

use crate::http::error::{HttpError, HttpResult};
use crate::http::parser::parse_request;
use crate::http::request::{RequestContext, RequestDescriptor};
use crate::http::response::StatusCode;
use crate::http::writer::ResponseWriter;
use crate::portal::Portal;
use crate::portal::body::{self, BodyStrategy};
use crate::portal::router::{self, Dispatch};
use crate::portal::{captive, csv_json, static_files};

/// One accepted connection: exactly one request, exactly one response.
pub struct Connection<R, W> {
    conn_id: u64,
    reader: R,
    writer: ResponseWriter<W>,
    portal: Arc<Portal>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(RequestDescriptor),
    Closed,
}

impl Connection<BufReader<OwnedReadHalf>, OwnedWriteHalf> {
    pub fn new(conn_id: u64, stream: TcpStream, portal: Arc<Portal>) -> Self {
        let buffer_size = portal.config.server.buffer_size;
        let (read_half, write_half) = stream.into_split();
        Self::from_parts(
            conn_id,
            BufReader::with_capacity(buffer_size, read_half),
            write_half,
            portal,
        )
    }
}

impl<R, W> Connection<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn from_parts(conn_id: u64, reader: R, writer: W, portal: Arc<Portal>) -> Self {
        let chunk_size = portal.config.server.buffer_size;
        Self {
            conn_id,
            reader,
            writer: ResponseWriter::new(writer, chunk_size),
            portal,
            state: ConnectionState::Reading,
        }
    }

    /// Serve the connection to completion. Never fails: every error is
    /// translated into a response (when still possible) and the connection
    /// is always shut down.
    pub async fn run(mut self) {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    let max_line_len = self.portal.config.server.max_line_len;
                    match parse_request(&mut self.reader, max_line_len).await {
                        Ok(req) => self.state = ConnectionState::Processing(req),
                        Err(e) => self.fail(e).await,
                    }
                }

                ConnectionState::Processing(req) => {
                    if let Err(e) = self.process(req).await {
                        self.fail(e).await;
                    }
                }

                ConnectionState::Closed => break,
            }
        }

        if let Err(e) = self.writer.shutdown().await {
            debug!(conn = self.conn_id, error = %e, "Shutdown failed");
        }
    }

    async fn process(&mut self, request: RequestDescriptor) -> HttpResult<()> {
        let portal = Arc::clone(&self.portal);
        let ctx = RequestContext {
            conn_id: self.conn_id,
            request,
        };
        let req = &ctx.request;

        info!(
            conn = self.conn_id,
            method = req.method.as_str(),
            path = %req.path,
            content_length = req.content_length,
            "Request"
        );

        if req.expect_continue {
            self.writer.send_continue().await?;
        }

        let decision = captive::classify(
            req.host_name(),
            &req.path,
            &portal.config.server.portal_address,
        );
        if decision.redirect {
            debug!(conn = self.conn_id, host = ?req.host_name(), location = %decision.location, "Captive redirect");
            return self.writer.send_redirect(&decision.location).await;
        }

        let body = match BodyStrategy::select(req) {
            BodyStrategy::SpooledJson => {
                let spool = body::spool_path(&portal.config.storage.spool_dir, self.conn_id);
                let value = body::ingest_json(
                    &mut self.reader,
                    req.content_length,
                    &spool,
                    self.writer.chunk_size(),
                )
                .await?;
                Some(value)
            }
            BodyStrategy::Upload | BodyStrategy::None => None,
        };

        match router::dispatch(&req.method, &req.path) {
            Dispatch::AdminAsset => {
                static_files::serve_admin_asset(&mut self.writer, portal.www_root(), &req.path).await
            }
            Dispatch::CsvJson(section) => {
                let fields = section.record_fields().ok_or_else(|| {
                    HttpError::Other(anyhow::anyhow!("{} has no record file", section.name()))
                })?;
                let source = portal.storage.path_for(section);
                csv_json::stream_as_json(&mut self.writer, &source, fields).await
            }
            Dispatch::Table(route) => {
                self.writer.send_header(StatusCode::Ok, route.content_type).await?;
                portal
                    .handle(route.handler, &ctx, body, &mut self.reader, &mut self.writer)
                    .await
            }
            Dispatch::StaticFile => {
                static_files::serve(&mut self.writer, portal.www_root(), &req.path).await
            }
        }
    }

    /// Single failure boundary: log, translate, respond if nothing was sent yet.
    async fn fail(&mut self, err: HttpError) {
        let status = err.status();

        if err.is_out_of_memory() {
            // Request-scoped buffers were dropped when the failing call unwound.
            error!(conn = self.conn_id, error = %err, "Memory error, request buffers released");
        } else if status == StatusCode::InternalServerError {
            error!(conn = self.conn_id, status = status.as_u16(), error = %err, "Request failed");
        } else {
            warn!(conn = self.conn_id, status = status.as_u16(), error = %err, "Request rejected");
        }

        if self.writer.header_sent() {
            warn!(
                conn = self.conn_id,
                bytes_written = self.writer.bytes_written(),
                "Failure after response started, closing"
            );
            return;
        }

        if let Err(e) = self.writer.send_error(status, err.client_message()).await {
            debug!(conn = self.conn_id, error = %e, "Failed to send error response");
        }
    }
}
