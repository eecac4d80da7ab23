use crate::dispatch::{Args, Dispatchable};
use crate::error::{DefinitionError, ErrorMatcher, HttpError};
use crate::http::{ParsedRequest, Response};
use http::Method;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Endpoint callable: coerced arguments in, JSON body (or error) out.
pub type EndpointFn = Arc<dyn Fn(&Args) -> Result<Value, HttpError> + Send + Sync>;

/// Exception-handler callable: produces the response body for a raised error.
pub type ErrorHandlerFn = Arc<dyn Fn(&HttpError) -> Result<Value, HttpError> + Send + Sync>;

/// Hook run before endpoint invocation, outermost region first.
pub type BeforeHook = Arc<dyn Fn(&ParsedRequest) -> Result<(), HttpError> + Send + Sync>;

/// Hook run after response generation, innermost region first.
pub type AfterHook =
    Arc<dyn Fn(&ParsedRequest, &mut Response) -> Result<(), HttpError> + Send + Sync>;

/// Capability tag distinguishing URL-routed regions from RPC-named ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Endpoints bound to URL rules with typed path parameters.
    Url,
    /// Endpoints bound to flat RPC method names.
    Rpc,
}

/// Registration options for one endpoint.
#[derive(Clone, Default)]
pub struct EndpointOptions {
    /// HTTP methods this endpoint answers. Empty means the `GET` default.
    pub methods: Vec<Method>,
    /// Endpoint name for logs and diagnostics; defaults to the rule.
    pub name: Option<String>,
    /// Endpoint-level config, parented to the owning region's scope.
    pub config: HashMap<String, Value>,
    /// Explicit parameter schema overriding the one derived from the rule.
    pub dispatchable: Option<Dispatchable>,
}

impl EndpointOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn methods<I: IntoIterator<Item = Method>>(mut self, methods: I) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn dispatchable(mut self, d: Dispatchable) -> Self {
        self.dispatchable = Some(d);
        self
    }
}

/// A single routable unit: a callable plus its URL/RPC binding, parameter
/// schema, method set and endpoint-level config.
#[derive(Clone)]
pub struct Endpoint {
    pub name: String,
    pub rule: String,
    pub methods: HashSet<Method>,
    pub dispatchable: Dispatchable,
    pub handler: EndpointFn,
    pub config: HashMap<String, Value>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .field("methods", &self.methods)
            .field("params", &self.dispatchable.params().len())
            .finish()
    }
}

/// A handler bound to an error matcher and a config scope.
#[derive(Clone)]
pub struct ExceptionHandler {
    pub matcher: ErrorMatcher,
    pub handler: ErrorHandlerFn,
    pub dispatchable: Dispatchable,
    pub config: HashMap<String, Value>,
}

impl std::fmt::Debug for ExceptionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionHandler")
            .field("matcher", &self.matcher)
            .finish()
    }
}

/// A named, composable group of endpoints, exception handlers, hooks and
/// sub-regions sharing configuration.
pub struct Region {
    name: String,
    kind: RegionKind,
    endpoints: Vec<Endpoint>,
    children: Vec<(Region, Option<String>)>,
    config: HashMap<String, Value>,
    exception_handlers: Vec<ExceptionHandler>,
    before_hooks: Vec<BeforeHook>,
    after_hooks: Vec<AfterHook>,
}

impl Region {
    /// Create a URL-routed region.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, RegionKind::Url)
    }

    /// Create an RPC-named region.
    #[must_use]
    pub fn new_rpc(name: impl Into<String>) -> Self {
        Self::with_kind(name, RegionKind::Rpc)
    }

    fn with_kind(name: impl Into<String>, kind: RegionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoints: Vec::new(),
            children: Vec::new(),
            config: HashMap::new(),
            exception_handlers: Vec::new(),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Bind a config value on this region's scope. Cascades to endpoints
    /// and sub-regions; inner values shadow outer ones.
    pub fn set_config(&mut self, key: impl Into<String>, value: Value) {
        self.config.insert(key.into(), value);
    }

    /// Builder-style config binding, for declaration-time chaining.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set_config(key, value);
        self
    }

    /// Register an endpoint under a URL rule.
    ///
    /// The rule's `{name:type}` segments become the endpoint's typed
    /// parameter schema; the method set defaults to `{GET}`.
    pub fn add_endpoint(
        &mut self,
        rule: &str,
        handler: EndpointFn,
        options: EndpointOptions,
    ) -> Result<(), DefinitionError> {
        if self.kind != RegionKind::Url {
            return Err(DefinitionError::KindMismatch {
                region: self.name.clone(),
                detail: format!("cannot register URL rule '{rule}' on an RPC region"),
            });
        }
        let dispatchable = match options.dispatchable {
            Some(d) => d,
            None => Dispatchable::from_rule(rule)?,
        };
        dispatchable.ensure_typed(rule)?;

        let methods: HashSet<Method> = if options.methods.is_empty() {
            HashSet::from([Method::GET])
        } else {
            options.methods.into_iter().collect()
        };

        let name = options.name.unwrap_or_else(|| rule.to_string());
        info!(
            region = %self.name,
            endpoint = %name,
            rule = %rule,
            methods = ?methods,
            "Endpoint registered"
        );
        self.endpoints.push(Endpoint {
            name,
            rule: rule.to_string(),
            methods,
            dispatchable,
            handler,
            config: options.config,
        });
        Ok(())
    }

    /// Bulk endpoint registration from route tuples.
    pub fn add_endpoints<I>(&mut self, routes: I) -> Result<(), DefinitionError>
    where
        I: IntoIterator<Item = (String, EndpointFn, EndpointOptions)>,
    {
        for (rule, handler, options) in routes {
            self.add_endpoint(&rule, handler, options)?;
        }
        Ok(())
    }

    /// Register an endpoint under an RPC method name.
    pub fn add_rpc_endpoint(
        &mut self,
        name: &str,
        handler: EndpointFn,
        options: EndpointOptions,
    ) -> Result<(), DefinitionError> {
        if self.kind != RegionKind::Rpc {
            return Err(DefinitionError::KindMismatch {
                region: self.name.clone(),
                detail: format!("cannot register RPC method '{name}' on a URL region"),
            });
        }
        let dispatchable = options.dispatchable.unwrap_or_default();
        dispatchable.ensure_typed(name)?;
        info!(region = %self.name, rpc_name = %name, "RPC endpoint registered");
        self.endpoints.push(Endpoint {
            name: options.name.unwrap_or_else(|| name.to_string()),
            rule: name.to_string(),
            methods: HashSet::from([Method::POST]),
            dispatchable,
            handler,
            config: options.config,
        });
        Ok(())
    }

    /// Attach a child region, optionally under a URL prefix.
    ///
    /// The child is moved into the parent: attaching the same region twice,
    /// or forming a cycle, is unrepresentable. A URL prefix on an RPC child
    /// is a definition error.
    pub fn add_region(
        &mut self,
        child: Region,
        url_prefix: Option<&str>,
    ) -> Result<(), DefinitionError> {
        if child.kind == RegionKind::Rpc && url_prefix.is_some() {
            return Err(DefinitionError::KindMismatch {
                region: child.name.clone(),
                detail: "an RPC region cannot be attached under a URL prefix".to_string(),
            });
        }
        info!(
            parent = %self.name,
            child = %child.name,
            url_prefix = url_prefix.unwrap_or(""),
            "Region attached"
        );
        self.children
            .push((child, url_prefix.map(str::to_string)));
        Ok(())
    }

    /// Bulk region attachment from `(region, prefix)` tuples.
    pub fn add_regions<I>(&mut self, regions: I) -> Result<(), DefinitionError>
    where
        I: IntoIterator<Item = (Region, Option<String>)>,
    {
        for (child, prefix) in regions {
            self.add_region(child, prefix.as_deref())?;
        }
        Ok(())
    }

    /// Register an exception handler at this region's scope level.
    pub fn add_exception_handler(
        &mut self,
        matcher: ErrorMatcher,
        handler: ErrorHandlerFn,
        config: HashMap<String, Value>,
    ) {
        info!(region = %self.name, matcher = matcher.name(), "Exception handler registered");
        self.exception_handlers.push(ExceptionHandler {
            matcher,
            handler,
            dispatchable: Dispatchable::default(),
            config,
        });
    }

    /// Bulk exception-handler registration from `(matcher, handler, config)` tuples.
    pub fn add_exception_handlers<I>(&mut self, handlers: I)
    where
        I: IntoIterator<Item = (ErrorMatcher, ErrorHandlerFn, HashMap<String, Value>)>,
    {
        for (matcher, handler, config) in handlers {
            self.add_exception_handler(matcher, handler, config);
        }
    }

    /// Register a hook run before endpoint invocation. Hooks cascade:
    /// outermost region's hooks run first.
    pub fn add_before_hook(&mut self, hook: BeforeHook) {
        self.before_hooks.push(hook);
    }

    /// Register a hook run after response generation. Hooks cascade:
    /// innermost region's hooks run first.
    pub fn add_after_hook(&mut self, hook: AfterHook) {
        self.after_hooks.push(hook);
    }

    // HTTP-method sugar atop add_endpoint. Purely convenience; no extra
    // contract.

    pub fn get(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.add_endpoint(rule, handler, EndpointOptions::new().methods([Method::GET]))
    }

    pub fn post(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.add_endpoint(rule, handler, EndpointOptions::new().methods([Method::POST]))
    }

    pub fn put(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.add_endpoint(rule, handler, EndpointOptions::new().methods([Method::PUT]))
    }

    pub fn delete(&mut self, rule: &str, handler: EndpointFn) -> Result<(), DefinitionError> {
        self.add_endpoint(
            rule,
            handler,
            EndpointOptions::new().methods([Method::DELETE]),
        )
    }

    // Sealed-tree accessors used by the router during flattening.

    pub(crate) fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub(crate) fn children(&self) -> &[(Region, Option<String>)] {
        &self.children
    }

    pub(crate) fn config(&self) -> &HashMap<String, Value> {
        &self.config
    }

    pub(crate) fn exception_handlers(&self) -> &[ExceptionHandler] {
        &self.exception_handlers
    }

    pub(crate) fn before_hooks(&self) -> &[BeforeHook] {
        &self.before_hooks
    }

    pub(crate) fn after_hooks(&self) -> &[AfterHook] {
        &self.after_hooks
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("endpoints", &self.endpoints.len())
            .field("children", &self.children.len())
            .field("exception_handlers", &self.exception_handlers.len())
            .finish()
    }
}
