use crate::error::{HttpError, HttpErrorKind};
use crate::ids::RequestId;
use http::Method;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

/// Raw inbound request as supplied by a host server.
///
/// The path may still carry a query string; the body is unparsed bytes.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// JSON body convenience: sets the body bytes and the content type.
    #[must_use]
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string().into_bytes())
    }
}

/// Wrapped request used by the processing pipeline.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// Correlation id, taken from an inbound `x-request-id` or minted fresh
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed cookies from the Cookie header
    pub cookies: HashMap<String, String>,
    /// Decoded query string parameters
    pub query_params: HashMap<String, String>,
    /// Parsed body: JSON object/value, or a string-valued object for form data
    pub body: Option<serde_json::Value>,
}

impl ParsedRequest {
    /// Get a header by name (case-insensitive lookup against the lowercased map).
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}

/// Parse the Cookie header into name/value pairs.
#[must_use]
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Decode query string parameters from a path that may carry `?key=value`
/// pairs. Names and values are URL-decoded.
#[must_use]
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    } else {
        HashMap::new()
    }
}

fn parse_body(
    body: &[u8],
    content_type: &str,
) -> Option<serde_json::Value> {
    if body.is_empty() {
        return None;
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let map: serde_json::Map<String, serde_json::Value> =
            url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect();
        return Some(serde_json::Value::Object(map));
    }
    let text = std::str::from_utf8(body).ok()?;
    serde_json::from_str(text).ok()
}

/// Wrap a raw request into the framework's request representation.
///
/// An unrecognizable HTTP method fails with a bad-request error.
pub fn wrap_request(raw: &RawRequest) -> Result<ParsedRequest, HttpError> {
    let method = Method::from_str(&raw.method.to_ascii_uppercase()).map_err(|_| {
        HttpError::new(HttpErrorKind::BadRequest)
            .with_description(format!("unrecognized HTTP method '{}'", raw.method))
    })?;

    let path = raw
        .path
        .split('?')
        .next()
        .unwrap_or("/")
        .to_string();

    let headers: HashMap<String, String> = raw
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
        .collect();

    let request_id = RequestId::from_header_or_new(
        headers.get("x-request-id").map(String::as_str),
    );

    let cookies = parse_cookies(&headers);
    debug!(
        request_id = %request_id,
        header_count = headers.len(),
        cookie_count = cookies.len(),
        "Headers and cookies extracted"
    );

    let query_params = parse_query_params(&raw.path);
    debug!(
        request_id = %request_id,
        param_count = query_params.len(),
        "Query params parsed"
    );

    let content_type = headers
        .get("content-type")
        .map(String::as_str)
        .unwrap_or("");
    let body = parse_body(&raw.body, content_type);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        body_bytes = raw.body.len(),
        "Request wrapped"
    );

    Ok(ParsedRequest {
        request_id,
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
    })
}
