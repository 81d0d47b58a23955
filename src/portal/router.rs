//! Static path → handler table.

use crate::http::mime::ContentType;
use crate::http::request::Method;
use crate::portal::storage::Section;

/// What a table entry does once its header has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Index,
    HotspotDetect,
    /// GET serves the page, POST stores the JSON body in the section.
    AdminPage(Section),
    AdminLog,
    /// GET returns the stored section as JSON.
    ApiRead(Section),
    Upload,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub handler: Handler,
    pub content_type: ContentType,
}

pub const LOG_PATH: &str = "/admin/log";

const fn route(path: &'static str, handler: Handler, content_type: ContentType) -> Route {
    Route {
        path,
        handler,
        content_type,
    }
}

/// Content type follows the path category: `/api/*` is JSON, the log is
/// plain text, everything else HTML.
pub static ROUTES: [Route; 13] = [
    route("/", Handler::Index, ContentType::Html),
    route("/hotspot-detect.html", Handler::HotspotDetect, ContentType::Html),
    route("/admin/user", Handler::AdminPage(Section::User), ContentType::Html),
    route("/admin/simplehist", Handler::AdminPage(Section::SimpleHist), ContentType::Html),
    route("/admin/jobhist", Handler::AdminPage(Section::JobHist), ContentType::Html),
    route("/admin/portrait", Handler::AdminPage(Section::Portrait), ContentType::Html),
    route(LOG_PATH, Handler::AdminLog, ContentType::PlainText),
    route("/api/user", Handler::ApiRead(Section::User), ContentType::Json),
    route("/api/simplehist", Handler::ApiRead(Section::SimpleHist), ContentType::Json),
    route("/api/jobhist", Handler::ApiRead(Section::JobHist), ContentType::Json),
    route("/api/portrait", Handler::ApiRead(Section::Portrait), ContentType::Json),
    route("/api/upload", Handler::Upload, ContentType::Json),
    route("/api/network", Handler::Network, ContentType::Json),
];

/// Exact-match lookup.
pub fn lookup(path: &str) -> Option<&'static Route> {
    ROUTES.iter().find(|r| r.path == path)
}

/// Where a request goes after the captive-portal check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// GET on an admin page: templated HTML asset.
    AdminAsset,
    /// GET on a CSV-backed API endpoint.
    CsvJson(Section),
    Table(&'static Route),
    StaticFile,
}

pub fn dispatch(method: &Method, path: &str) -> Dispatch {
    let route = lookup(path);

    if *method == Method::GET {
        if route.is_some() && path.starts_with("/admin") && path != LOG_PATH {
            return Dispatch::AdminAsset;
        }
        match path {
            "/api/jobhist" => return Dispatch::CsvJson(Section::JobHist),
            "/api/portrait" => return Dispatch::CsvJson(Section::Portrait),
            _ => {}
        }
    }

    match route {
        Some(route) => Dispatch::Table(route),
        None => Dispatch::StaticFile,
    }
}
