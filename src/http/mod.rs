//! # HTTP Module
//!
//! The narrow interface to the transport boundary.
//!
//! The framework core never parses HTTP off a socket. A host server hands in
//! a [`RawRequest`] (method, path, headers, body bytes); the context wraps
//! it into a [`ParsedRequest`] (lowercased headers, cookies, decoded query
//! parameters, JSON or form body) and produces a [`Response`] (status,
//! headers, JSON body) for the host to serialize however it likes.

mod request;
mod response;

pub use request::{parse_cookies, parse_query_params, wrap_request, ParsedRequest, RawRequest};
pub use response::{status_reason, Response};
