//! Error taxonomy: the fixed HTTP status catalog, request-time errors, and
//! registration-time definition errors.
//!
//! Raising an [`HttpError`] *is* the handling mechanism: the router and the
//! context raise catalog entries directly for routing and parameter failures,
//! and every entry converts to a response without further lookup.

use http::Method;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Fixed catalog of HTTP semantic errors, one kind per status code.
///
/// Replaces a class hierarchy with a tagged variant: kind relationships are
/// expressed through [`ErrorFamily`] status-code ranges rather than
/// inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    // 3xx
    MovedPermanently,
    Found,
    SeeOther,
    NotModified,
    TemporaryRedirect,
    PermanentRedirect,
    // 4xx
    BadRequest,
    Unauthorized,
    PaymentRequired,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    ProxyAuthRequired,
    RequestTimeout,
    Conflict,
    Gone,
    LengthRequired,
    PreconditionFailed,
    PayloadTooLarge,
    UriTooLong,
    UnsupportedMediaType,
    RangeNotSatisfiable,
    ExpectationFailed,
    MisdirectedRequest,
    UnprocessableEntity,
    UpgradeRequired,
    PreconditionRequired,
    TooManyRequests,
    // 5xx
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    HttpVersionNotSupported,
    // Framework-specific kinds (carry their own status)
    InvalidParameter,
    MissingParameter,
    EndpointNotFound,
    ContextProcessing,
    EndpointRuntime,
}

impl HttpErrorKind {
    /// HTTP status code bound to this kind.
    #[must_use]
    pub fn status(&self) -> u16 {
        use HttpErrorKind::*;
        match self {
            MovedPermanently => 301,
            Found => 302,
            SeeOther => 303,
            NotModified => 304,
            TemporaryRedirect => 307,
            PermanentRedirect => 308,
            BadRequest | InvalidParameter | MissingParameter => 400,
            Unauthorized => 401,
            PaymentRequired => 402,
            Forbidden => 403,
            NotFound | EndpointNotFound => 404,
            MethodNotAllowed => 405,
            NotAcceptable => 406,
            ProxyAuthRequired => 407,
            RequestTimeout => 408,
            Conflict => 409,
            Gone => 410,
            LengthRequired => 411,
            PreconditionFailed => 412,
            PayloadTooLarge => 413,
            UriTooLong => 414,
            UnsupportedMediaType => 415,
            RangeNotSatisfiable => 416,
            ExpectationFailed => 417,
            MisdirectedRequest => 421,
            UnprocessableEntity => 422,
            UpgradeRequired => 426,
            PreconditionRequired => 428,
            TooManyRequests => 429,
            InternalServerError | ContextProcessing | EndpointRuntime => 500,
            NotImplemented => 501,
            BadGateway => 502,
            ServiceUnavailable => 503,
            GatewayTimeout => 504,
            HttpVersionNotSupported => 505,
        }
    }

    /// Stable identifier of this kind, used in error response bodies and as
    /// the matcher tie-break key. Human reason phrases live with the
    /// response layer.
    #[must_use]
    pub fn name(&self) -> &'static str {
        use HttpErrorKind::*;
        match self {
            MovedPermanently => "MovedPermanently",
            Found => "Found",
            SeeOther => "SeeOther",
            NotModified => "NotModified",
            TemporaryRedirect => "TemporaryRedirect",
            PermanentRedirect => "PermanentRedirect",
            BadRequest => "BadRequest",
            Unauthorized => "Unauthorized",
            PaymentRequired => "PaymentRequired",
            Forbidden => "Forbidden",
            NotFound => "NotFound",
            MethodNotAllowed => "MethodNotAllowed",
            NotAcceptable => "NotAcceptable",
            ProxyAuthRequired => "ProxyAuthRequired",
            RequestTimeout => "RequestTimeout",
            Conflict => "Conflict",
            Gone => "Gone",
            LengthRequired => "LengthRequired",
            PreconditionFailed => "PreconditionFailed",
            PayloadTooLarge => "PayloadTooLarge",
            UriTooLong => "UriTooLong",
            UnsupportedMediaType => "UnsupportedMediaType",
            RangeNotSatisfiable => "RangeNotSatisfiable",
            ExpectationFailed => "ExpectationFailed",
            MisdirectedRequest => "MisdirectedRequest",
            UnprocessableEntity => "UnprocessableEntity",
            UpgradeRequired => "UpgradeRequired",
            PreconditionRequired => "PreconditionRequired",
            TooManyRequests => "TooManyRequests",
            InternalServerError => "InternalServerError",
            NotImplemented => "NotImplemented",
            BadGateway => "BadGateway",
            ServiceUnavailable => "ServiceUnavailable",
            GatewayTimeout => "GatewayTimeout",
            HttpVersionNotSupported => "HttpVersionNotSupported",
            InvalidParameter => "InvalidParameter",
            MissingParameter => "MissingParameter",
            EndpointNotFound => "EndpointNotFound",
            ContextProcessing => "ContextProcessing",
            EndpointRuntime => "EndpointRuntime",
        }
    }

    /// Status-range family this kind belongs to.
    #[must_use]
    pub fn family(&self) -> ErrorFamily {
        match self.status() {
            300..=399 => ErrorFamily::Redirection,
            400..=499 => ErrorFamily::Client,
            _ => ErrorFamily::Server,
        }
    }
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status(), self.name())
    }
}

/// Status-code range grouping for handler matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFamily {
    /// 3xx
    Redirection,
    /// 4xx
    Client,
    /// 5xx
    Server,
}

impl ErrorFamily {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ErrorFamily::Redirection => "Redirection",
            ErrorFamily::Client => "ClientError",
            ErrorFamily::Server => "ServerError",
        }
    }
}

/// What an exception handler is registered against.
///
/// Specificity ordering: an exact [`HttpErrorKind`] beats a family match,
/// which beats the catch-all. Ties between equally specific matchers are
/// broken by the lexicographic order of the matcher name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMatcher {
    /// Matches one catalog entry exactly.
    Kind(HttpErrorKind),
    /// Matches every kind in a status-code range.
    Family(ErrorFamily),
    /// Matches any HTTP error.
    Any,
}

impl ErrorMatcher {
    /// Whether this matcher applies to `kind`.
    #[must_use]
    pub fn matches(&self, kind: HttpErrorKind) -> bool {
        match self {
            ErrorMatcher::Kind(k) => *k == kind,
            ErrorMatcher::Family(f) => *f == kind.family(),
            ErrorMatcher::Any => true,
        }
    }

    /// Distance from the matched kind: 0 = exact, 1 = family, 2 = catch-all.
    /// Lower is more specific.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        match self {
            ErrorMatcher::Kind(_) => 0,
            ErrorMatcher::Family(_) => 1,
            ErrorMatcher::Any => 2,
        }
    }

    /// Declared name, used as the final tie-breaker in handler selection.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ErrorMatcher::Kind(k) => k.name(),
            ErrorMatcher::Family(f) => f.name(),
            ErrorMatcher::Any => "Any",
        }
    }
}

/// A request-time HTTP error: a catalog kind plus optional detail.
///
/// Directly convertible to a response; carries extra headers such as
/// `Location` for 3xx kinds or `Allow` for method-not-allowed.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub kind: HttpErrorKind,
    /// Human-readable description, exposed in debug mode only.
    pub description: Option<String>,
    /// Structured payload, exposed in debug mode only.
    pub data: Option<Value>,
    /// Extra response headers.
    pub headers: Vec<(String, String)>,
}

impl HttpError {
    #[must_use]
    pub fn new(kind: HttpErrorKind) -> Self {
        Self {
            kind,
            description: None,
            data: None,
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 3xx redirect carrying a `Location` header.
    #[must_use]
    pub fn redirect(kind: HttpErrorKind, location: impl Into<String>) -> Self {
        Self::new(kind).with_header("location", location)
    }

    /// No rule matched the request path.
    #[must_use]
    pub fn endpoint_not_found(path: &str) -> Self {
        Self::new(HttpErrorKind::EndpointNotFound)
            .with_description(format!("no endpoint matches path '{path}'"))
    }

    /// A rule matched the path but not the method. Carries the set of
    /// methods that did match, both as structured data and as an `Allow`
    /// header value.
    #[must_use]
    pub fn method_not_allowed(path: &str, allowed: &HashSet<Method>) -> Self {
        let mut names: Vec<&str> = allowed.iter().map(Method::as_str).collect();
        names.sort_unstable();
        let allow = names.join(", ");
        Self::new(HttpErrorKind::MethodNotAllowed)
            .with_description(format!("method not allowed for path '{path}'"))
            .with_data(serde_json::json!({ "allowed_methods": names }))
            .with_header("allow", allow)
    }

    /// A path segment or bound argument failed type coercion.
    #[must_use]
    pub fn invalid_parameter(name: &str, expected: &str, raw: &str) -> Self {
        Self::new(HttpErrorKind::InvalidParameter)
            .with_description(format!(
                "parameter '{name}' expects {expected}, got '{raw}'"
            ))
            .with_data(serde_json::json!({
                "parameter": name,
                "expected": expected,
                "value": raw,
            }))
    }

    /// A required argument was absent from the request.
    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(HttpErrorKind::MissingParameter)
            .with_description(format!("required parameter '{name}' is missing"))
            .with_data(serde_json::json!({ "parameter": name }))
    }

    /// An endpoint callable or hook failed without raising a catalog entry.
    #[must_use]
    pub fn endpoint_runtime(detail: impl Into<String>) -> Self {
        Self::new(HttpErrorKind::EndpointRuntime).with_description(detail)
    }

    /// The context pipeline itself misbehaved (out-of-order transition).
    #[must_use]
    pub fn context_processing(detail: impl Into<String>) -> Self {
        Self::new(HttpErrorKind::ContextProcessing).with_description(detail)
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(d) => write!(f, "{}: {}", self.kind, d),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for HttpError {}

/// Malformed region/route/endpoint declaration, detected at registration or
/// build time. Fatal at startup, never deferred to request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A URL rule could not be parsed (`{name:type}` grammar violation).
    MalformedRule { rule: String, detail: String },
    /// A parameter appears twice in one rule or schema.
    DuplicateParameter { rule: String, name: String },
    /// A parameter has no declared type where typing is required.
    UntypedParameter { rule: String, name: String },
    /// An RPC region was attached under a URL prefix, or an endpoint was
    /// registered against the wrong region kind.
    KindMismatch { region: String, detail: String },
    /// Two RPC endpoints registered under the same method name.
    DuplicateRpcName { name: String },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::MalformedRule { rule, detail } => {
                write!(f, "malformed URL rule '{rule}': {detail}")
            }
            DefinitionError::DuplicateParameter { rule, name } => {
                write!(f, "duplicate parameter '{name}' in rule '{rule}'")
            }
            DefinitionError::UntypedParameter { rule, name } => {
                write!(
                    f,
                    "parameter '{name}' in rule '{rule}' has no declared type"
                )
            }
            DefinitionError::KindMismatch { region, detail } => {
                write!(f, "region '{region}': {detail}")
            }
            DefinitionError::DuplicateRpcName { name } => {
                write!(f, "RPC endpoint '{name}' registered twice")
            }
        }
    }
}

impl std::error::Error for DefinitionError {}
