use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Parent-chained key/value lookup implementing configuration inheritance
/// with local override.
///
/// A scope resolves `get` against its local mapping first, then delegates to
/// its parent, recursively, terminating at a scope with no parent. A missing
/// key at the root resolves to `None`. `set` mutates only the local mapping.
///
/// Parents are shared `Arc` references: a scope never manages its parent's
/// lifetime, it only chains lookups through it. Chains are built once when
/// the application seals its region tree and are read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct AttributeScope {
    local: HashMap<String, Value>,
    parent: Option<Arc<AttributeScope>>,
}

impl AttributeScope {
    /// Create an empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root scope pre-populated with `values`.
    #[must_use]
    pub fn from_values(values: HashMap<String, Value>) -> Self {
        Self {
            local: values,
            parent: None,
        }
    }

    /// Create a scope whose lookups fall back to `parent`.
    #[must_use]
    pub fn with_parent(values: HashMap<String, Value>, parent: Arc<AttributeScope>) -> Self {
        Self {
            local: values,
            parent: Some(parent),
        }
    }

    /// Resolve `key` in this scope, falling back through the parent chain.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.local.get(key) {
            Some(v) => Some(v),
            None => self.parent.as_deref().and_then(|p| p.get(key)),
        }
    }

    /// Collect every value bound to `key` from this scope up to the root,
    /// closest-first. Used for aggregated settings that must cascade rather
    /// than shadow.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&Value> {
        let mut values = Vec::new();
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(v) = s.local.get(key) {
                values.push(v);
            }
            scope = s.parent.as_deref();
        }
        values
    }

    /// Bind `key` in the local mapping only; never touches the parent.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.local.insert(key.into(), value);
    }

    /// Whether `key` resolves anywhere in the chain.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Materialize the flattened view of the whole chain: parent entries
    /// first, local entries override parent entries with the same key.
    #[must_use]
    pub fn flatten(&self) -> HashMap<String, Value> {
        let mut merged = match self.parent.as_deref() {
            Some(p) => p.flatten(),
            None => HashMap::new(),
        };
        for (k, v) in &self.local {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Number of distinct keys visible through this scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flatten().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.parent.as_deref().map_or(true, |p| p.is_empty())
    }

    /// Iterate the flattened view. Allocates; intended for diagnostics and
    /// startup-time introspection, not the dispatch path.
    pub fn iter(&self) -> impl Iterator<Item = (String, Value)> {
        self.flatten().into_iter()
    }

    /// The parent scope, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<AttributeScope>> {
        self.parent.as_ref()
    }
}
