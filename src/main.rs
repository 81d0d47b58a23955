use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use portico::config::Config;
use portico::portal::Portal;
use portico::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    init_logging(&cfg);

    let portal = Arc::new(Portal::new(cfg));
    let decoy_addr = portal.config.server.decoy_addr.clone();
    tokio::spawn(async move {
        if let Err(e) = server::listener::run_decoy(&decoy_addr).await {
            tracing::error!(error = %e, "Decoy listener stopped");
        }
    });

    tokio::select! {
        res = server::listener::run(portal) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// Log to the configured file (served at `/admin/log`), or stdout if it
/// cannot be opened.
fn init_logging(cfg: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true);

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.storage.log_file)
    {
        Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        Err(e) => {
            builder.init();
            tracing::warn!(error = %e, "Log file unavailable, logging to stdout");
        }
    }
}
