use crate::error::{DefinitionError, HttpError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Grammar for one parametrized rule segment: `{name}` or `{name:type}`.
static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)(?::([a-z]+))?\}$").unwrap()
});

/// Declared type of a dispatch parameter.
///
/// `string`, `int` and `float` match exactly one path segment; `path`
/// matches greedily, including separators. `Untyped` is only legal where the
/// registration site does not require typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Path,
    Untyped,
}

impl ParamType {
    /// Parse a rule type tag. Untagged segments default to `string`.
    pub(crate) fn from_tag(tag: Option<&str>) -> Option<Self> {
        match tag {
            None | Some("string") => Some(ParamType::Str),
            Some("int") => Some(ParamType::Int),
            Some("float") => Some(ParamType::Float),
            Some("path") => Some(ParamType::Path),
            Some(_) => None,
        }
    }

    /// Regex fragment this type occupies in a compiled rule.
    #[must_use]
    pub fn pattern_fragment(&self) -> &'static str {
        match self {
            // int/float match loosely here; coercion decides afterwards so a
            // bad segment surfaces as an invalid parameter, not a 404.
            ParamType::Str | ParamType::Int | ParamType::Float | ParamType::Untyped => "([^/]+)",
            ParamType::Path => "(.+)",
        }
    }

    /// Coerce a JSON value (body field or RPC argument) into this type.
    ///
    /// Strings go through segment coercion so form-decoded bodies behave
    /// like path segments; already-typed JSON values pass through with a
    /// type check.
    pub fn coerce_value(&self, name: &str, value: &Value) -> Result<Value, HttpError> {
        match (self, value) {
            (_, Value::String(s)) => self.coerce(name, s),
            (ParamType::Int, v) if v.is_i64() => Ok(v.clone()),
            (ParamType::Float, v) if v.is_number() => Ok(v.clone()),
            (ParamType::Str | ParamType::Path | ParamType::Untyped, v) => Ok(v.clone()),
            (ty, v) => Err(HttpError::invalid_parameter(
                name,
                &ty.to_string(),
                &v.to_string(),
            )),
        }
    }

    /// Coerce a raw path segment into a typed value.
    ///
    /// Parse failures are invalid-parameter errors, never not-found.
    pub fn coerce(&self, name: &str, raw: &str) -> Result<Value, HttpError> {
        match self {
            ParamType::Str | ParamType::Path | ParamType::Untyped => {
                Ok(Value::String(raw.to_string()))
            }
            ParamType::Int => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| HttpError::invalid_parameter(name, "int", raw)),
            ParamType::Float => raw
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| HttpError::invalid_parameter(name, "float", raw)),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Str => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Path => "path",
            ParamType::Untyped => "untyped",
        };
        write!(f, "{s}")
    }
}

/// One declared parameter of a callable: name, type, optional default, and
/// free-form extras for registration-site metadata.
#[derive(Debug, Clone)]
pub struct DispatchParam {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
    pub extras: HashMap<String, Value>,
}

impl DispatchParam {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            extras: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// Structured description of a callable: its parameters in declaration order
/// and its return-type tag. Built once at registration time, immutable
/// thereafter.
#[derive(Debug, Clone, Default)]
pub struct Dispatchable {
    params: Vec<DispatchParam>,
    return_type: Option<ParamType>,
}

impl Dispatchable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from explicit parameter declarations.
    ///
    /// Fails when two parameters share a name.
    pub fn from_params(params: Vec<DispatchParam>) -> Result<Self, DefinitionError> {
        let mut seen = HashMap::new();
        for p in &params {
            if seen.insert(p.name.clone(), ()).is_some() {
                return Err(DefinitionError::DuplicateParameter {
                    rule: String::new(),
                    name: p.name.clone(),
                });
            }
        }
        Ok(Self {
            params,
            return_type: None,
        })
    }

    /// Derive the parameter schema from a URL rule's `{name:type}` segments.
    ///
    /// Supported types are `string` (the untagged default), `int`, `float`
    /// and `path`. Unknown tags and duplicate names fail with a
    /// [`DefinitionError`].
    pub fn from_rule(rule: &str) -> Result<Self, DefinitionError> {
        let mut params = Vec::new();
        for segment in rule.split('/') {
            // Only segments fully wrapped in braces are parameters; anything
            // else, stray braces included, is a literal.
            if !(segment.starts_with('{') && segment.ends_with('}')) {
                continue;
            }
            let caps =
                SEGMENT_RE
                    .captures(segment)
                    .ok_or_else(|| DefinitionError::MalformedRule {
                        rule: rule.to_string(),
                        detail: format!("cannot parse segment '{segment}'"),
                    })?;
            let name = caps[1].to_string();
            let tag = caps.get(2).map(|m| m.as_str());
            let ty = ParamType::from_tag(tag).ok_or_else(|| DefinitionError::MalformedRule {
                rule: rule.to_string(),
                detail: format!("unknown type tag '{}'", tag.unwrap_or_default()),
            })?;
            if params.iter().any(|p: &DispatchParam| p.name == name) {
                return Err(DefinitionError::DuplicateParameter {
                    rule: rule.to_string(),
                    name,
                });
            }
            params.push(DispatchParam::new(name, ty));
        }
        Ok(Self {
            params,
            return_type: None,
        })
    }

    #[must_use]
    pub fn with_return_type(mut self, ty: ParamType) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[DispatchParam] {
        &self.params
    }

    #[must_use]
    pub fn return_type(&self) -> Option<ParamType> {
        self.return_type
    }

    /// Verify that every parameter has a declared type.
    ///
    /// Used at endpoint/handler registration, where argument coercion
    /// depends on knowing the type.
    pub fn ensure_typed(&self, rule: &str) -> Result<(), DefinitionError> {
        for p in &self.params {
            if p.ty == ParamType::Untyped {
                return Err(DefinitionError::UntypedParameter {
                    rule: rule.to_string(),
                    name: p.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Coerced arguments handed to an endpoint callable: path parameters, query
/// parameters and body fields bound by name.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: HashMap<String, Value>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_values(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// Fetch a required argument, failing with a missing-parameter error.
    pub fn require(&self, name: &str) -> Result<&Value, HttpError> {
        self.values
            .get(name)
            .ok_or_else(|| HttpError::missing_parameter(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
