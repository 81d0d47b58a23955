/// HTTP request methods.
///
/// Only GET and POST have handlers; anything else is carried through as
/// `Unrecognized` so handlers can answer it themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Submit data or an upload chunk
    POST,
    Unrecognized(String),
}

impl Method {
    /// Parses an HTTP method token (case-sensitive).
    ///
    /// ```
    /// # use portico::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Method::GET);
    /// assert_eq!(Method::from_token("get"), Method::Unrecognized("get".into()));
    /// ```
    pub fn from_token(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            other => Method::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::Unrecognized(token) => token,
        }
    }
}

/// The parsed head of one request.
///
/// Only the allow-listed headers are kept; everything else on the wire is
/// discarded while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub host: Option<String>,
    pub x_filename: Option<String>,
    pub x_final: Option<String>,
    pub content_length: u64,
    pub expect_continue: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            host: None,
            x_filename: None,
            x_final: None,
            content_length: 0,
            expect_continue: false,
        }
    }

    /// Host header without any trailing `:port`.
    pub fn host_name(&self) -> Option<&str> {
        self.host
            .as_deref()
            .map(|h| h.split(':').next().unwrap_or(h))
            .filter(|h| !h.is_empty())
    }

    /// `X-Final: true` (case-insensitive); absent means false.
    pub fn is_final_chunk(&self) -> bool {
        self.x_final
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn has_body(&self) -> bool {
        self.method == Method::POST && self.content_length > 0
    }
}

/// Per-connection state handed down the handler chain.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub conn_id: u64,
    pub request: RequestDescriptor,
}
