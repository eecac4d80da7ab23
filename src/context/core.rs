use crate::dispatch::Args;
use crate::error::HttpError;
use crate::http::{wrap_request, ParsedRequest, RawRequest, Response};
use crate::ids::RequestId;
use crate::router::{RouteMatch, Router, ScopeChain};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Pipeline stage marker. Transitions are strictly ordered; the error path
/// jumps ahead to `ResponseGenerated`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Initialized,
    RequestProcessed,
    EndpointDetermined,
    ResponseGenerated,
    Cleaned,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Created => "created",
            State::Initialized => "initialized",
            State::RequestProcessed => "request_processed",
            State::EndpointDetermined => "endpoint_determined",
            State::ResponseGenerated => "response_generated",
            State::Cleaned => "cleaned",
        };
        write!(f, "{s}")
    }
}

/// Per-request state carried through the pipeline: the raw and wrapped
/// request, the resolved route, named resources, and finally the response.
pub struct Context {
    state: State,
    raw: RawRequest,
    debug: bool,
    request: Option<ParsedRequest>,
    route: Option<RouteMatch>,
    response: Option<Response>,
    exception: Option<HttpError>,
    resources: HashMap<String, Value>,
    /// After hooks already attempted during response generation. The error
    /// path resumes after these so no hook fires twice.
    after_hooks_run: usize,
}

impl Context {
    #[must_use]
    pub fn new(raw: RawRequest, debug: bool) -> Self {
        Self {
            state: State::Created,
            raw,
            debug,
            request: None,
            route: None,
            response: None,
            exception: None,
            resources: HashMap::new(),
            after_hooks_run: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn request(&self) -> Option<&ParsedRequest> {
        self.request.as_ref()
    }

    #[must_use]
    pub fn route(&self) -> Option<&RouteMatch> {
        self.route.as_ref()
    }

    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    #[must_use]
    pub fn exception(&self) -> Option<&HttpError> {
        self.exception.as_ref()
    }

    /// Correlation id: the wrapped request's id once stage 2 has run.
    #[must_use]
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request.as_ref().map(|r| &r.request_id)
    }

    /// Bind a named resource for the lifetime of this request.
    pub fn set_resource(&mut self, name: impl Into<String>, value: Value) {
        self.resources.insert(name.into(), value);
    }

    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Value> {
        self.resources.get(name)
    }

    fn ensure(&self, expected: State, operation: &str) -> Result<(), HttpError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(HttpError::context_processing(format!(
                "{operation} requires state '{expected}', context is '{}'",
                self.state
            )))
        }
    }

    /// Stage 1: resource setup.
    pub fn initialize(&mut self) -> Result<(), HttpError> {
        self.ensure(State::Created, "initialize")?;
        debug!("Context initialized");
        self.state = State::Initialized;
        Ok(())
    }

    /// Stage 2: wrap the raw request.
    pub fn process_request(&mut self) -> Result<(), HttpError> {
        self.ensure(State::Initialized, "process_request")?;
        let request = wrap_request(&self.raw)?;
        self.request = Some(request);
        self.state = State::RequestProcessed;
        Ok(())
    }

    /// Stage 3: resolve the endpoint for the wrapped request.
    pub fn determine_endpoint(&mut self, router: &Router) -> Result<(), HttpError> {
        self.ensure(State::RequestProcessed, "determine_endpoint")?;
        let request = self
            .request
            .as_ref()
            .ok_or_else(|| HttpError::context_processing("no wrapped request on context"))?;
        let route = router.resolve(&request.method, &request.path)?;
        self.route = Some(route);
        self.state = State::EndpointDetermined;
        Ok(())
    }

    /// Stage 4: run before hooks, bind arguments, invoke the endpoint, run
    /// after hooks.
    pub fn generate_response(&mut self) -> Result<(), HttpError> {
        self.ensure(State::EndpointDetermined, "generate_response")?;
        let request = self
            .request
            .as_ref()
            .ok_or_else(|| HttpError::context_processing("no wrapped request on context"))?;
        let route = self
            .route
            .as_ref()
            .ok_or_else(|| HttpError::context_processing("no resolved route on context"))?;

        for hook in route.chain().before_hooks() {
            hook(request)?;
        }

        let args = bind_args(request, route)?;
        debug!(
            request_id = %request.request_id,
            endpoint = %route.endpoint().name,
            arg_count = args.len(),
            "Arguments bound"
        );
        let body = (route.endpoint().handler)(&args)?;
        let mut response = match body {
            Value::Null => Response::no_content(),
            body => Response::ok(body),
        };

        let mut attempted = 0;
        let mut hook_failure = None;
        for hook in route.chain().after_hooks() {
            attempted += 1;
            if let Err(err) = hook(request, &mut response) {
                hook_failure = Some(err);
                break;
            }
        }
        if hook_failure.is_none() {
            info!(
                request_id = %request.request_id,
                status = response.status,
                endpoint = %route.endpoint().name,
                "Response generated"
            );
        }
        self.after_hooks_run = attempted;
        if let Some(err) = hook_failure {
            return Err(err);
        }
        self.response = Some(response);
        self.state = State::ResponseGenerated;
        Ok(())
    }

    /// Short-circuit: deliver a prebuilt response without endpoint
    /// resolution. Used for automatic `OPTIONS` answers.
    pub fn respond(&mut self, response: Response) -> Result<(), HttpError> {
        self.ensure(State::RequestProcessed, "respond")?;
        self.response = Some(response);
        self.state = State::ResponseGenerated;
        Ok(())
    }

    /// Error path: record the exception and render it through the
    /// exception-handler chain of the resolved route, or the root chain when
    /// routing never succeeded.
    ///
    /// Valid from any pre-response state; leaves the context in
    /// `ResponseGenerated` so delivery and cleanup stay uniform.
    pub fn fail(&mut self, err: HttpError, root_chain: &Arc<ScopeChain>) {
        if matches!(self.state, State::ResponseGenerated | State::Cleaned) {
            warn!(error = err.kind.name(), "Error raised after response generation; keeping existing response");
            self.exception.get_or_insert(err);
            return;
        }
        let chain = Arc::clone(self.route.as_ref().map_or(root_chain, |r| r.chain()));
        let mut response = self.render_error(&err, &chain);

        // After hooks still run on error responses, resuming past any that
        // already fired during response generation; a failing hook here is
        // logged and skipped rather than recursing into error handling.
        if let Some(request) = self.request.as_ref() {
            for hook in chain.after_hooks().skip(self.after_hooks_run) {
                if let Err(hook_err) = hook(request, &mut response) {
                    warn!(
                        request_id = %request.request_id,
                        error = hook_err.kind.name(),
                        "After hook failed on error path"
                    );
                }
            }
        }

        warn!(
            error = err.kind.name(),
            status = err.status(),
            "Request failed"
        );
        self.exception = Some(err);
        self.response = Some(response);
        self.state = State::ResponseGenerated;
    }

    fn render_error(&self, err: &HttpError, chain: &Arc<ScopeChain>) -> Response {
        render_error(err, chain, self.debug)
    }

    /// Stage 5: release resources. Runs exactly once on every path.
    pub fn cleanup(&mut self) {
        if self.state == State::Cleaned {
            return;
        }
        let released = self.resources.len();
        self.resources.clear();
        debug!(resources_released = released, "Context cleaned");
        self.state = State::Cleaned;
    }

    /// Hand the response over, consuming the context. Must only be called
    /// after cleanup.
    pub fn into_response(mut self) -> Result<Response, HttpError> {
        self.response
            .take()
            .ok_or_else(|| HttpError::context_processing("no response on context"))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state)
            .field("path", &self.raw.path)
            .field("has_response", &self.response.is_some())
            .field("exception", &self.exception.as_ref().map(|e| e.kind))
            .finish()
    }
}

/// Render an error through an exception-handler chain.
///
/// A matching handler supplies the body; the status and headers stay those
/// of the error. A handler that itself fails is logged and replaced by the
/// generic runtime-error body. Without a handler the catalog body applies,
/// with detail gated by the debug flag.
pub fn render_error(err: &HttpError, chain: &ScopeChain, debug: bool) -> Response {
    match chain.resolve_handler(err.kind) {
        Some(handler) => match (handler.handler)(err) {
            Ok(body) => {
                let mut response = Response::json(err.status(), body);
                for (name, value) in &err.headers {
                    response.set_header(name, value.clone());
                }
                response
            }
            Err(handler_err) => {
                error!(
                    matcher = handler.matcher.name(),
                    error = handler_err.kind.name(),
                    "Exception handler itself failed"
                );
                Response::from_error(
                    &HttpError::endpoint_runtime("exception handler failed"),
                    debug,
                )
            }
        },
        None => Response::from_error(err, debug),
    }
}

/// Merge path, query and body values into the endpoint's declared parameter
/// schema.
///
/// Precedence per parameter: path binding, then query string, then body
/// field, then the declared default. A parameter left unbound is a
/// missing-parameter error.
fn bind_args(request: &ParsedRequest, route: &RouteMatch) -> Result<Args, HttpError> {
    let mut args = route.path_args.clone();
    for param in route.endpoint().dispatchable.params() {
        if args.get(&param.name).is_some() {
            continue;
        }
        if let Some(raw) = request.query_params.get(&param.name) {
            args.insert(param.name.clone(), param.ty.coerce(&param.name, raw)?);
            continue;
        }
        if let Some(value) = request
            .body
            .as_ref()
            .and_then(|b| b.get(&param.name))
        {
            args.insert(param.name.clone(), param.ty.coerce_value(&param.name, value)?);
            continue;
        }
        match &param.default {
            Some(default) => args.insert(param.name.clone(), default.clone()),
            None => return Err(HttpError::missing_parameter(&param.name)),
        }
    }
    Ok(args)
}

