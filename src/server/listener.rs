use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::http::connection::Connection;
use crate::portal::Portal;

/// Pause after a failed accept (e.g. descriptor exhaustion) before retrying.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run(portal: Arc<Portal>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&portal.config.server.listen_addr).await?;
    info!("Listening on {}", portal.config.server.listen_addr);
    serve(listener, portal).await
}

/// Accept loop: one task per connection, ids assigned in accept order.
///
/// Accept errors are logged and retried; the loop only ends with the task.
pub async fn serve(listener: TcpListener, portal: Arc<Portal>) -> anyhow::Result<()> {
    let next_id = AtomicU64::new(1);
    let listener = &listener;

    loop {
        let (socket, peer) = accept_retrying(|| listener.accept()).await;
        let conn_id = next_id.fetch_add(1, Ordering::Relaxed);
        debug!(conn = conn_id, %peer, "Accepted connection");

        let portal = Arc::clone(&portal);
        tokio::spawn(async move {
            let limit = portal.config.server.read_timeout();
            let conn = Connection::new(conn_id, socket, portal);
            match limit {
                Some(limit) => {
                    if timeout(limit, conn.run()).await.is_err() {
                        warn!(conn = conn_id, %peer, "Connection timed out");
                    }
                }
                None => conn.run().await,
            }
        });
    }
}

/// Keep calling `accept` until it yields a connection, backing off after each error.
pub async fn accept_retrying<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(e) => {
                warn!(error = %e, "Accept failed, retrying");
                sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Accept and immediately drop every connection on `addr`.
///
/// A bind failure is logged and the decoy simply does not run.
pub async fn run_decoy(addr: &str) -> anyhow::Result<()> {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr, error = %e, "Failed to bind decoy listener");
            return Ok(());
        }
    };
    info!("Decoy listening on {}", addr);
    serve_decoy(listener).await
}

pub async fn serve_decoy(listener: TcpListener) -> anyhow::Result<()> {
    let listener = &listener;
    loop {
        let (socket, peer) = accept_retrying(|| listener.accept()).await;
        debug!(%peer, "Decoy connection refused");
        drop(socket);
    }
}
