use crate::dispatch::{Args, ParamType};
use crate::error::{DefinitionError, HttpError, HttpErrorKind};
use crate::region::{AfterHook, BeforeHook, Endpoint, ExceptionHandler, Region, RegionKind};
use crate::scope::AttributeScope;
use http::Method;
use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of path parameters stored inline before spilling to the
/// heap. Rules rarely carry more than a handful of segments.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters as `(name, raw_text)` pairs, in rule order.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One sealed level of the region hierarchy: the region's attribute scope
/// plus the exception handlers and hooks registered at that level.
pub struct ScopeLayer {
    pub region: String,
    pub scope: Arc<AttributeScope>,
    pub exception_handlers: Vec<ExceptionHandler>,
    pub before_hooks: Vec<BeforeHook>,
    pub after_hooks: Vec<AfterHook>,
}

impl std::fmt::Debug for ScopeLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeLayer")
            .field("region", &self.region)
            .field("exception_handlers", &self.exception_handlers.len())
            .finish()
    }
}

/// The sealed chain of scope layers covering one endpoint, innermost region
/// first, root last. Shared by every endpoint of the same region.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    layers: Vec<Arc<ScopeLayer>>,
}

impl ScopeChain {
    #[must_use]
    pub fn layers(&self) -> &[Arc<ScopeLayer>] {
        &self.layers
    }

    /// Pick the exception handler for an error kind.
    ///
    /// Layers are searched innermost first; within a layer the most specific
    /// matcher wins (exact kind, then family, then any), and equally specific
    /// matchers tie-break on the lexicographically smallest matcher name.
    /// Outer layers are only consulted when an inner layer has no match at
    /// all.
    #[must_use]
    pub fn resolve_handler(&self, kind: HttpErrorKind) -> Option<&ExceptionHandler> {
        for layer in &self.layers {
            let best = layer
                .exception_handlers
                .iter()
                .filter(|h| h.matcher.matches(kind))
                .min_by_key(|h| (h.matcher.specificity(), h.matcher.name()));
            if let Some(handler) = best {
                debug!(
                    region = %layer.region,
                    matcher = handler.matcher.name(),
                    error = kind.name(),
                    "Exception handler resolved"
                );
                return Some(handler);
            }
        }
        None
    }

    /// Before hooks in execution order: outermost region first, then inward,
    /// each level in registration order.
    pub fn before_hooks(&self) -> impl Iterator<Item = &BeforeHook> {
        self.layers.iter().rev().flat_map(|l| l.before_hooks.iter())
    }

    /// After hooks in execution order: innermost region first, then outward,
    /// each level in registration order.
    pub fn after_hooks(&self) -> impl Iterator<Item = &AfterHook> {
        self.layers.iter().flat_map(|l| l.after_hooks.iter())
    }
}

/// One compiled entry of the dispatch table.
pub struct RouteEntry {
    /// Effective rule after prefix joining, e.g. `/api/users/{id:int}`.
    pub pattern: String,
    /// Anchored regex with one capture group per parametrized segment.
    pub regex: Regex,
    /// Parameter names in capture-group order.
    pub param_names: Vec<Arc<str>>,
    pub endpoint: Arc<Endpoint>,
    /// Endpoint-level scope: endpoint config parented to the region chain.
    pub scope: Arc<AttributeScope>,
    pub chain: Arc<ScopeChain>,
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("methods", &self.endpoint.methods)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

/// A successful resolution: the winning entry plus its parameter bindings.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    /// Raw captured segment text, in rule order.
    pub path_params: ParamVec,
    /// Path parameters coerced to their declared types.
    pub path_args: Args,
}

impl RouteMatch {
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.entry.endpoint
    }

    #[must_use]
    pub fn scope(&self) -> &Arc<AttributeScope> {
        &self.entry.scope
    }

    #[must_use]
    pub fn chain(&self) -> &Arc<ScopeChain> {
        &self.entry.chain
    }
}

/// The sealed dispatch table: URL rules in registration order plus a flat
/// RPC name table.
pub struct Router {
    routes: Vec<Arc<RouteEntry>>,
    rpc_routes: HashMap<String, Arc<RouteEntry>>,
    /// Chain holding only the root layer. Used when an error is raised
    /// before any route resolved.
    root_chain: Arc<ScopeChain>,
}

impl Router {
    /// Seal a region tree into a dispatch table.
    ///
    /// `defaults` becomes the outermost attribute scope, underneath the root
    /// region's own config. Walks the tree depth-first in attachment order,
    /// so earlier registrations take precedence on overlapping rules.
    pub fn new(root: &Region, defaults: HashMap<String, Value>) -> Result<Self, DefinitionError> {
        let mut router = Self {
            routes: Vec::new(),
            rpc_routes: HashMap::new(),
            root_chain: Arc::new(ScopeChain::default()),
        };
        let base = Arc::new(AttributeScope::from_values(defaults));
        router.root_chain = router.seal_region(root, "", base, &[])?;
        info!(
            routes = router.routes.len(),
            rpc_routes = router.rpc_routes.len(),
            "Routing table loaded"
        );
        Ok(router)
    }

    fn seal_region(
        &mut self,
        region: &Region,
        prefix: &str,
        parent_scope: Arc<AttributeScope>,
        parent_layers: &[Arc<ScopeLayer>],
    ) -> Result<Arc<ScopeChain>, DefinitionError> {
        let scope = Arc::new(AttributeScope::with_parent(
            region.config().clone(),
            parent_scope,
        ));
        let layer = Arc::new(ScopeLayer {
            region: region.name().to_string(),
            scope: Arc::clone(&scope),
            exception_handlers: region.exception_handlers().to_vec(),
            before_hooks: region.before_hooks().to_vec(),
            after_hooks: region.after_hooks().to_vec(),
        });
        let mut layers = Vec::with_capacity(parent_layers.len() + 1);
        layers.push(Arc::clone(&layer));
        layers.extend_from_slice(parent_layers);
        let chain = Arc::new(ScopeChain {
            layers: layers.clone(),
        });

        for endpoint in region.endpoints() {
            let endpoint_scope = if endpoint.config.is_empty() {
                Arc::clone(&scope)
            } else {
                Arc::new(AttributeScope::with_parent(
                    endpoint.config.clone(),
                    Arc::clone(&scope),
                ))
            };
            match region.kind() {
                RegionKind::Url => {
                    let pattern = join_url(prefix, &endpoint.rule);
                    let (regex, param_names) = compile_rule(&pattern, endpoint)?;
                    debug!(pattern = %pattern, regex = regex.as_str(), "Route compiled");
                    self.routes.push(Arc::new(RouteEntry {
                        pattern,
                        regex,
                        param_names,
                        endpoint: Arc::new(endpoint.clone()),
                        scope: endpoint_scope,
                        chain: Arc::clone(&chain),
                    }));
                }
                RegionKind::Rpc => {
                    let name = endpoint.rule.clone();
                    if self.rpc_routes.contains_key(&name) {
                        return Err(DefinitionError::DuplicateRpcName { name });
                    }
                    // RPC entries never bind path segments.
                    let regex = literal_regex(&name)?;
                    self.rpc_routes.insert(
                        name.clone(),
                        Arc::new(RouteEntry {
                            pattern: name,
                            regex,
                            param_names: Vec::new(),
                            endpoint: Arc::new(endpoint.clone()),
                            scope: endpoint_scope,
                            chain: Arc::clone(&chain),
                        }),
                    );
                }
            }
        }

        for (child, child_prefix) in region.children() {
            let next_prefix = match child_prefix {
                Some(p) => join_url(prefix, p),
                None => prefix.to_string(),
            };
            self.seal_region(child, &next_prefix, Arc::clone(&scope), &layers)?;
        }
        Ok(chain)
    }

    /// Resolve a URL request to an endpoint.
    ///
    /// Rules are tried in registration order. A rule whose pattern matches
    /// but whose typed segments fail coercion does not end the scan; if no
    /// later rule matches outright, the first coercion failure is returned.
    /// A path that matches only under other methods yields 405 with the
    /// union of the allowed methods; otherwise 404.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, HttpError> {
        let mut coercion_failure: Option<HttpError> = None;
        let mut allowed: HashSet<Method> = HashSet::new();

        for entry in &self.routes {
            let Some(caps) = entry.regex.captures(path) else {
                continue;
            };
            debug!(pattern = %entry.pattern, path = %path, "Route match attempt");
            if !entry.endpoint.methods.contains(method) {
                allowed.extend(entry.endpoint.methods.iter().cloned());
                continue;
            }
            match bind_path_params(entry, &caps) {
                Ok((path_params, path_args)) => {
                    info!(pattern = %entry.pattern, method = %method, path = %path, "Route matched");
                    return Ok(RouteMatch {
                        entry: Arc::clone(entry),
                        path_params,
                        path_args,
                    });
                }
                Err(err) => {
                    if coercion_failure.is_none() {
                        coercion_failure = Some(err);
                    }
                }
            }
        }

        if let Some(err) = coercion_failure {
            warn!(path = %path, "Path parameter failed coercion");
            return Err(err);
        }
        if !allowed.is_empty() {
            warn!(path = %path, method = %method, "Method not allowed");
            return Err(HttpError::method_not_allowed(path, &allowed));
        }
        warn!(path = %path, "No route matched");
        Err(HttpError::endpoint_not_found(path))
    }

    /// Resolve an RPC call by method name.
    pub fn resolve_rpc(&self, name: &str) -> Result<RouteMatch, HttpError> {
        match self.rpc_routes.get(name) {
            Some(entry) => {
                info!(rpc_name = %name, "RPC route matched");
                Ok(RouteMatch {
                    entry: Arc::clone(entry),
                    path_params: SmallVec::new(),
                    path_args: Args::new(),
                })
            }
            None => {
                warn!(rpc_name = %name, "No RPC route matched");
                Err(HttpError::endpoint_not_found(name))
            }
        }
    }

    /// Union of methods answered by any rule matching `path`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> HashSet<Method> {
        let mut allowed = HashSet::new();
        for entry in &self.routes {
            if entry.regex.is_match(path) {
                allowed.extend(entry.endpoint.methods.iter().cloned());
            }
        }
        allowed
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteEntry>] {
        &self.routes
    }

    #[must_use]
    pub fn root_chain(&self) -> &Arc<ScopeChain> {
        &self.root_chain
    }

    #[must_use]
    pub fn rpc_names(&self) -> impl Iterator<Item = &str> {
        self.rpc_routes.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .field("rpc_routes", &self.rpc_routes.len())
            .finish()
    }
}

/// Join a URL prefix and a tail with exactly one separator, preserving a
/// leading slash.
fn join_url(base: &str, tail: &str) -> String {
    let base = base.trim_end_matches('/');
    let tail = tail.trim_start_matches('/');
    if tail.is_empty() {
        if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        }
    } else {
        format!("{base}/{tail}")
    }
}

/// Compile an effective rule into an anchored regex plus the parameter names
/// in capture order.
fn compile_rule(
    pattern: &str,
    endpoint: &Endpoint,
) -> Result<(Regex, Vec<Arc<str>>), DefinitionError> {
    let mut source = String::from("^");
    let mut names: Vec<Arc<str>> = Vec::new();
    for (i, segment) in pattern.split('/').enumerate() {
        if i > 0 {
            source.push('/');
        }
        if segment.starts_with('{') && segment.ends_with('}') {
            let inner = &segment[1..segment.len() - 1];
            let name = inner.split(':').next().unwrap_or(inner);
            let ty = endpoint
                .dispatchable
                .params()
                .iter()
                .find(|p| p.name == name)
                .map_or(ParamType::Str, |p| p.ty);
            source.push_str(ty.pattern_fragment());
            names.push(Arc::from(name));
        } else {
            source.push_str(&regex::escape(segment));
        }
    }
    source.push('$');
    let regex = Regex::new(&source).map_err(|e| DefinitionError::MalformedRule {
        rule: pattern.to_string(),
        detail: e.to_string(),
    })?;
    Ok((regex, names))
}

fn literal_regex(name: &str) -> Result<Regex, DefinitionError> {
    Regex::new(&format!("^{}$", regex::escape(name))).map_err(|e| {
        DefinitionError::MalformedRule {
            rule: name.to_string(),
            detail: e.to_string(),
        }
    })
}

/// Capture groups to typed bindings. Coercion failures surface as invalid
/// parameter errors.
fn bind_path_params(
    entry: &RouteEntry,
    caps: &regex::Captures<'_>,
) -> Result<(ParamVec, Args), HttpError> {
    let mut path_params: ParamVec = SmallVec::new();
    let mut args = Args::new();
    for (i, name) in entry.param_names.iter().enumerate() {
        let raw = caps.get(i + 1).map_or("", |m| m.as_str());
        let ty = entry
            .endpoint
            .dispatchable
            .params()
            .iter()
            .find(|p| p.name == name.as_ref())
            .map_or(ParamType::Str, |p| p.ty);
        args.insert(name.as_ref(), ty.coerce(name, raw)?);
        path_params.push((Arc::clone(name), raw.to_string()));
    }
    Ok((path_params, args))
}
