/// Content types used by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Css,
    JavaScript,
    Jpeg,
    Json,
    PlainText,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Css => "text/css",
            ContentType::JavaScript => "application/javascript",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Json => "application/json",
            ContentType::PlainText => "text/plain",
        }
    }
}

/// Fixed extension table; the final extension decides, case-insensitively.
/// Unknown or missing extensions are served as plain text.
pub fn from_path(path: &str) -> ContentType {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let ext = match file_name.rfind('.') {
        Some(pos) => file_name[pos + 1..].to_ascii_lowercase(),
        None => return ContentType::PlainText,
    };

    match ext.as_str() {
        "css" => ContentType::Css,
        "js" => ContentType::JavaScript,
        "jpg" | "jpeg" => ContentType::Jpeg,
        "html" => ContentType::Html,
        _ => ContentType::PlainText,
    }
}
