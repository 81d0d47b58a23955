use serde::Serialize;

use crate::config::{Config, StationConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceInfo {
    pub ip: String,
    pub netmask: String,
}

/// Body of `GET /api/network`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    pub ap: InterfaceInfo,
    pub sta: Option<StationConfig>,
}

impl NetworkInfo {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            ap: InterfaceInfo {
                ip: cfg.server.portal_address.clone(),
                netmask: cfg.server.ap_netmask.clone(),
            },
            sta: cfg.station.clone(),
        }
    }
}
