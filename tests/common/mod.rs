#![allow(dead_code)]

use portico::config::Config;
use portico::http::connection::Connection;
use portico::portal::Portal;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

pub const PORTAL_ADDRESS: &str = "192.168.4.1";

/// A portal rooted in a fresh temporary directory (`www/`, `data/`, `spool/`).
pub struct TestPortal {
    pub dir: TempDir,
    pub portal: Arc<Portal>,
}

impl TestPortal {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Like [`TestPortal::new`], with `tweak` applied to the config last.
    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["www", "data", "spool"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }

        let mut cfg = Config::default();
        cfg.server.portal_address = PORTAL_ADDRESS.to_string();
        cfg.server.buffer_size = 16;
        cfg.storage.www_root = dir.path().join("www");
        cfg.storage.data_dir = dir.path().join("data");
        cfg.storage.spool_dir = dir.path().join("spool");
        cfg.storage.log_file = dir.path().join("log.txt");
        cfg.storage.upload_dir = dir.path().join("uploads");
        tweak(&mut cfg);

        Self {
            portal: Arc::new(Portal::new(cfg)),
            dir,
        }
    }

    pub fn www(&self) -> std::path::PathBuf {
        self.dir.path().join("www")
    }

    pub fn data(&self) -> std::path::PathBuf {
        self.dir.path().join("data")
    }

    pub fn uploads(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn write_www(&self, name: &str, contents: &[u8]) {
        write_file(&self.www().join(name), contents);
    }

    pub fn write_data(&self, name: &str, contents: &[u8]) {
        write_file(&self.data().join(name), contents);
    }

    /// Run one connection over an in-memory pipe and return the raw response.
    pub async fn exchange(&self, request: &[u8]) -> Vec<u8> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let conn = Connection::from_parts(1, BufReader::new(server_read), server_write, Arc::clone(&self.portal));
        let task = tokio::spawn(conn.run());

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(request).await.unwrap();
        client_write.shutdown().await.unwrap();

        let mut out = Vec::new();
        client_read.read_to_end(&mut out).await.unwrap();
        task.await.unwrap();
        out
    }

    pub async fn get(&self, path: &str, host: Option<&str>) -> ParsedResponse {
        let mut req = format!("GET {} HTTP/1.1\r\n", path);
        if let Some(host) = host {
            req.push_str(&format!("Host: {}\r\n", host));
        }
        req.push_str("\r\n");
        ParsedResponse::parse(&self.exchange(req.as_bytes()).await)
    }

    pub async fn post(&self, path: &str, headers: &[(&str, &str)], body: &[u8]) -> ParsedResponse {
        let mut req = format!("POST {} HTTP/1.1\r\nHost: {}\r\n", path, PORTAL_ADDRESS);
        for (k, v) in headers {
            req.push_str(&format!("{}: {}\r\n", k, v));
        }
        req.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
        let mut bytes = req.into_bytes();
        bytes.extend_from_slice(body);
        ParsedResponse::parse(&self.exchange(&bytes).await)
    }
}

fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[derive(Debug)]
pub struct ParsedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub raw: Vec<u8>,
}

impl ParsedResponse {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = std::str::from_utf8(&raw[..split]).unwrap();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let status = status_line.split(' ').nth(1).unwrap().parse().unwrap();
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        Self {
            status,
            headers,
            body: raw[split + 4..].to_vec(),
            raw: raw.to_vec(),
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}
