use crate::error::HttpError;
use serde::Serialize;
use serde_json::Value;

/// Canonical reason phrase for a status code.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        421 => "Misdirected Request",
        422 => "Unprocessable Entity",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

/// Outgoing response produced by the pipeline: status, headers, JSON body.
///
/// The host server owns serialization to the wire; this type only carries
/// the data.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl Response {
    #[must_use]
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with the default content type.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204, Vec::new(), Value::Null)
    }

    /// Render an error as a response.
    ///
    /// Production mode exposes only the catalog name; `debug` adds the
    /// description and structured data.
    #[must_use]
    pub fn from_error(err: &HttpError, debug: bool) -> Self {
        let mut body = serde_json::json!({
            "error": err.kind.name(),
            "status": err.status(),
        });
        if debug {
            if let Some(obj) = body.as_object_mut() {
                if let Some(desc) = &err.description {
                    obj.insert("description".to_string(), Value::String(desc.clone()));
                }
                if let Some(data) = &err.data {
                    obj.insert("data".to_string(), data.clone());
                }
            }
        }
        let mut resp = Self::json(err.status(), body);
        for (name, value) in &err.headers {
            resp.set_header(name, value.clone());
        }
        resp
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive on the name).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_ascii_lowercase(), value));
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        status_reason(self.status)
    }
}
