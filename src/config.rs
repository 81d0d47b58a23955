//! Runtime configuration
//!
//! Loaded from a YAML document named by `PORTICO_CONFIG`; every field has a
//! default so the appliance boots with no file at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Static station interface description, if the device is joined to
    /// an upstream network.
    #[serde(default)]
    pub station: Option<StationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub decoy_addr: String,
    /// Address clients are redirected to (the access point address).
    pub portal_address: String,
    pub ap_netmask: String,
    /// Size of every transfer slice, in bytes.
    pub buffer_size: usize,
    pub max_line_len: usize,
    /// Per-connection limit. `None` lets a stalled peer hold its task forever.
    pub read_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub www_root: PathBuf,
    pub data_dir: PathBuf,
    pub spool_dir: PathBuf,
    pub log_file: PathBuf,
    /// Where upload session files accumulate before the final rename.
    pub upload_dir: PathBuf,
    pub upload_target: String,
    pub default_upload_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StationConfig {
    pub ip: String,
    pub netmask: String,
    pub gateway: String,
    pub dns: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:80".to_string(),
            decoy_addr: "0.0.0.0:443".to_string(),
            portal_address: "192.168.4.1".to_string(),
            ap_netmask: "255.255.255.0".to_string(),
            buffer_size: 1024,
            max_line_len: 1024,
            read_timeout_secs: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            www_root: PathBuf::from("www"),
            data_dir: PathBuf::from("data"),
            spool_dir: PathBuf::from("."),
            log_file: PathBuf::from("log.txt"),
            upload_dir: PathBuf::from("uploads"),
            upload_target: "image.jpg".to_string(),
            default_upload_name: "tmp.jpg".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load from `PORTICO_CONFIG` (if set) and apply the `LISTEN` override.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var("PORTICO_CONFIG") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("Invalid config file {}", path))?
            }
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        if cfg.server.buffer_size == 0 {
            anyhow::bail!("server.buffer_size must be greater than zero");
        }
        if cfg.server.max_line_len == 0 {
            anyhow::bail!("server.max_line_len must be greater than zero");
        }
        Ok(cfg)
    }
}
