//! Captive-portal classification.
//!
//! Operating systems probe well-known URLs after joining a network; any
//! request naming a domain (rather than an address) or hitting one of those
//! probe paths is bounced to the portal root.

use url::Url;

/// Connectivity-check paths used by Android, Windows and Apple clients.
pub const PROBE_PATHS: [&str; 4] = [
    "/generate_204",
    "/gen_204",
    "/ncsi.txt",
    "/hotspot-detect.html",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptivePortalDecision {
    pub redirect: bool,
    pub location: String,
}

/// `true` when every dot-separated segment is a non-empty run of digits.
pub fn is_address(host: &str) -> bool {
    host.split('.')
        .all(|seg| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit()))
}

/// Root URL of the portal, e.g. `http://192.168.4.1/`.
pub fn portal_root(portal_address: &str) -> String {
    match Url::parse(&format!("http://{}/", portal_address)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("http://{}/", portal_address),
    }
}

/// Decide whether a request should be redirected to the portal.
///
/// `host` is the Host header with any `:port` already removed.
pub fn classify(host: Option<&str>, path: &str, portal_address: &str) -> CaptivePortalDecision {
    let redirect = match host {
        Some(host) if !host.is_empty() && !is_address(host) => true,
        _ => PROBE_PATHS.contains(&path),
    };

    CaptivePortalDecision {
        redirect,
        location: portal_root(portal_address),
    }
}
