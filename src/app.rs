//! Application composition root.
//!
//! [`Application`] is the mutable builder used during the single-threaded
//! composition phase: it owns the root region and the app config, and
//! delegates registration to the root region. [`Application::build`] seals
//! the region tree into a router and yields an immutable [`App`] that
//! handles requests from any host server.

use crate::config::AppConfig;
use crate::context::{render_error, Context};
use crate::dispatch::Args;
use crate::error::{DefinitionError, ErrorMatcher, HttpError};
use crate::http::{RawRequest, Response};
use crate::region::{
    AfterHook, BeforeHook, EndpointFn, EndpointOptions, ErrorHandlerFn, Region,
};
use crate::router::Router;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// Mutable application builder: a named root region plus app-level config.
pub struct Application {
    name: String,
    root: Region,
    config: AppConfig,
}

impl Application {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            root: Region::new(name.clone()),
            name,
            config: AppConfig::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overlay explicit settings onto the app config.
    pub fn configure(&mut self, map: HashMap<String, Value>) {
        self.config.merge(AppConfig::from_map(map));
    }

    /// Overlay `LACONIC_`-prefixed environment variables onto the app config.
    pub fn configure_from_env(&mut self) {
        self.config.merge(AppConfig::from_env());
    }

    pub fn set_config(&mut self, key: impl AsRef<str>, value: Value) {
        self.config.set(key, value);
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The root region, for registrations the delegates below don't cover.
    pub fn root_mut(&mut self) -> &mut Region {
        &mut self.root
    }

    // Registration delegates onto the root region.

    pub fn add_endpoint(
        &mut self,
        rule: &str,
        handler: EndpointFn,
        options: EndpointOptions,
    ) -> Result<(), DefinitionError> {
        self.root.add_endpoint(rule, handler, options)
    }

    pub fn get(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.root.get(rule, handler)
    }

    pub fn post(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.root.post(rule, handler)
    }

    pub fn put(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.root.put(rule, handler)
    }

    pub fn delete(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.root.delete(rule, handler)
    }

    pub fn add_region(
        &mut self,
        child: Region,
        url_prefix: Option<&str>,
    ) -> Result<(), DefinitionError> {
        self.root.add_region(child, url_prefix)
    }

    pub fn add_exception_handler(
        &mut self,
        matcher: ErrorMatcher,
        handler: ErrorHandlerFn,
        config: HashMap<String, Value>,
    ) {
        self.root.add_exception_handler(matcher, handler, config);
    }

    pub fn add_before_hook(&mut self, hook: BeforeHook) {
        self.root.add_before_hook(hook);
    }

    pub fn add_after_hook(&mut self, hook: AfterHook) {
        self.root.add_after_hook(hook);
    }

    /// Seal the region tree into an immutable, request-ready [`App`].
    ///
    /// App config becomes the outermost attribute scope, so every region and
    /// endpoint sees the settings unless it shadows them.
    pub fn build(self) -> Result<App, DefinitionError> {
        let router = Router::new(&self.root, self.config.values().clone())?;
        let debug = self.config.debug();
        info!(app = %self.name, debug_mode = self.config.debug(), "Application built");
        Ok(App {
            name: self.name,
            router,
            config: self.config,
            debug,
        })
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("root", &self.root)
            .finish()
    }
}

/// Sealed application: an immutable router plus the settings needed at
/// request time. Safe to share across threads.
pub struct App {
    name: String,
    router: Router,
    config: AppConfig,
    debug: bool,
}

impl App {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Drive one request through the full pipeline and return its response.
    ///
    /// Never fails: every error becomes an error response, cleanup always
    /// runs, and the correlation id is echoed on the `x-request-id` header.
    #[must_use]
    pub fn handle(&self, raw: RawRequest) -> Response {
        let mut ctx = Context::new(raw, self.debug);
        let outcome = self.drive(&mut ctx);
        if let Err(err) = outcome {
            ctx.fail(err, self.router.root_chain());
        }
        let request_id = ctx.request_id().copied();
        ctx.cleanup();

        let mut response = match ctx.into_response() {
            Ok(response) => response,
            Err(err) => Response::from_error(&err, self.debug),
        };
        if let Some(id) = request_id {
            response.set_header("x-request-id", id.to_string());
        }
        info!(app = %self.name, status = response.status, "Request handled");
        response
    }

    fn drive(&self, ctx: &mut Context) -> Result<(), HttpError> {
        ctx.initialize()?;
        ctx.process_request()?;

        if let Some(response) = self.automatic_options(ctx) {
            return ctx.respond(response);
        }

        ctx.determine_endpoint(&self.router)?;
        ctx.generate_response()
    }

    /// Answer `OPTIONS` for a known path without invoking any endpoint,
    /// when enabled in config.
    fn automatic_options(&self, ctx: &Context) -> Option<Response> {
        if !self.config.automatic_options_response() {
            return None;
        }
        let request = ctx.request()?;
        if request.method != Method::OPTIONS {
            return None;
        }
        let allowed = self.router.allowed_methods(&request.path);
        if allowed.is_empty() {
            return None;
        }
        let mut names: Vec<&str> = allowed.iter().map(Method::as_str).collect();
        names.sort_unstable();
        let allow = names.join(", ");

        let mut response = if self.config.options_response_body() {
            Response::ok(serde_json::json!({ "allowed_methods": names }))
        } else {
            Response::no_content()
        };
        response.set_header("allow", allow);
        Some(response)
    }

    /// Invoke an RPC endpoint by name with a JSON object of arguments.
    ///
    /// Arguments are bound against the endpoint's declared schema: payload
    /// fields are coerced, declared defaults fill gaps, and anything still
    /// unbound is a missing-parameter error.
    #[must_use]
    pub fn handle_rpc(&self, name: &str, payload: &Value) -> Response {
        let route = match self.router.resolve_rpc(name) {
            Ok(route) => route,
            Err(err) => return render_error(&err, self.router.root_chain(), self.debug),
        };

        let invoke = || -> Result<Value, HttpError> {
            let mut args = Args::new();
            for param in route.endpoint().dispatchable.params() {
                if let Some(value) = payload.get(&param.name) {
                    args.insert(param.name.clone(), param.ty.coerce_value(&param.name, value)?);
                } else if let Some(default) = &param.default {
                    args.insert(param.name.clone(), default.clone());
                } else {
                    return Err(HttpError::missing_parameter(&param.name));
                }
            }
            (route.endpoint().handler)(&args)
        };

        match invoke() {
            Ok(Value::Null) => Response::no_content(),
            Ok(body) => Response::ok(body),
            Err(err) => render_error(&err, route.chain(), self.debug),
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("router", &self.router)
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn hello() -> EndpointFn {
        Arc::new(|_: &Args| Ok(json!({"hello": "world"})))
    }

    #[test]
    fn test_build_and_handle() {
        let mut app = Application::new("demo");
        app.get("/hello", hello()).expect("add");
        let app = app.build().expect("build");

        let response = app.handle(RawRequest::new("GET", "/hello"));
        assert_eq!(response.status, 200);
        assert_eq!(response.body["hello"], json!("world"));
        assert!(response.get_header("x-request-id").is_some());
    }

    #[test]
    fn test_build_carries_debug_mode_into_error_detail() {
        let mut app = Application::new("demo");
        app.set_config("DEBUG", json!(true));
        app.get("/hello", hello()).expect("add");
        let app = app.build().expect("build");

        let response = app.handle(RawRequest::new("GET", "/nope"));
        assert_eq!(response.status, 404);
        assert!(response.body.get("description").is_some());
    }

    #[test]
    fn test_handle_never_panics_on_unknown_method() {
        let mut app = Application::new("demo");
        app.get("/hello", hello()).expect("add");
        let app = app.build().expect("build");

        let response = app.handle(RawRequest::new("NOT A METHOD", "/hello"));
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_automatic_options_lists_methods() {
        let mut app = Application::new("demo");
        app.set_config("HTTP_AUTOMATIC_OPTIONS_RESPONSE", json!(true));
        app.set_config("HTTP_OPTIONS_RESPONSE_BODY", json!(true));
        app.get("/hello", hello()).expect("add");
        app.post("/hello", hello()).expect("add");
        let app = app.build().expect("build");

        let response = app.handle(RawRequest::new("OPTIONS", "/hello"));
        assert_eq!(response.status, 200);
        assert_eq!(response.get_header("allow"), Some("GET, POST"));
        assert_eq!(response.body["allowed_methods"], json!(["GET", "POST"]));
    }

    #[test]
    fn test_options_disabled_falls_through_to_405() {
        let mut app = Application::new("demo");
        app.get("/hello", hello()).expect("add");
        let app = app.build().expect("build");

        let response = app.handle(RawRequest::new("OPTIONS", "/hello"));
        assert_eq!(response.status, 405);
    }

    #[test]
    fn test_rpc_round_trip() {
        let mut app = Application::new("demo");
        let mut calc = Region::new_rpc("calc");
        let schema = crate::dispatch::Dispatchable::from_params(vec![
            crate::dispatch::DispatchParam::new("a", crate::dispatch::ParamType::Int),
            crate::dispatch::DispatchParam::new("b", crate::dispatch::ParamType::Int)
                .with_default(json!(1)),
        ])
        .expect("schema");
        calc.add_rpc_endpoint(
            "add",
            Arc::new(|args: &Args| {
                let a = args.get_i64("a").unwrap_or(0);
                let b = args.get_i64("b").unwrap_or(0);
                Ok(json!(a + b))
            }),
            EndpointOptions::new().dispatchable(schema),
        )
        .expect("add");
        app.add_region(calc, None).expect("attach");
        let app = app.build().expect("build");

        let response = app.handle_rpc("add", &json!({"a": 2, "b": 3}));
        assert_eq!(response.body, json!(5));

        // Default fills the gap.
        let response = app.handle_rpc("add", &json!({"a": 2}));
        assert_eq!(response.body, json!(3));

        // Missing required argument.
        let response = app.handle_rpc("add", &json!({"b": 9}));
        assert_eq!(response.status, 400);

        let response = app.handle_rpc("unknown", &json!({}));
        assert_eq!(response.status, 404);
    }
}
