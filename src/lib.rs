//! # laconic
//!
//! A small server-agnostic web framework core: compose endpoints into
//! nested regions, seal the tree into a typed routing table, and drive each
//! request through an explicit processing pipeline.
//!
//! ## Modules
//!
//! - [`app`] - application builder and the sealed request handler
//! - [`config`] - flat app settings, loadable from the environment
//! - [`context`] - per-request pipeline state machine
//! - [`dispatch`] - typed parameter schemas and argument coercion
//! - [`error`] - the HTTP error catalog and definition-time errors
//! - [`http`] - raw/wrapped requests and the response type
//! - [`ids`] - ULID request correlation ids
//! - [`region`] - composable groups of endpoints, handlers and hooks
//! - [`router`] - sealed dispatch table and scope chains
//! - [`scope`] - parent-chained attribute lookup
//!
//! ## Example
//!
//! ```
//! use laconic::{Application, Args, RawRequest};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut app = Application::new("demo");
//! app.get(
//!     "/users/{id:int}",
//!     Arc::new(|args: &Args| Ok(json!({ "id": args.get_i64("id") }))),
//! )?;
//! let app = app.build()?;
//!
//! let response = app.handle(RawRequest::new("GET", "/users/7"));
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body["id"], json!(7));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod ids;
pub mod region;
pub mod router;
pub mod scope;

pub use app::{App, Application};
pub use config::AppConfig;
pub use context::{Context, State};
pub use dispatch::{Args, DispatchParam, Dispatchable, ParamType};
pub use error::{DefinitionError, ErrorFamily, ErrorMatcher, HttpError, HttpErrorKind};
pub use self::http::{RawRequest, Response};
pub use ids::RequestId;
pub use region::{EndpointOptions, Region, RegionKind};
pub use router::{RouteMatch, Router};
pub use scope::AttributeScope;
