//! # Configuration Module
//!
//! Application settings consumed as the root scope's defaults.
//!
//! Settings are a flat mapping of uppercase keys to JSON values, populated
//! from a plain map or from environment variables. How a settings file is
//! located and parsed is the host's concern; this module only consumes the
//! resulting mapping.
//!
//! ## Recognized keys
//!
//! - `DEBUG: bool` - expose full error detail in responses instead of the
//!   generic catalog body.
//! - `HTTP_AUTOMATIC_OPTIONS_RESPONSE: bool` - answer `OPTIONS` requests for
//!   known paths automatically with an `Allow` header.
//! - `HTTP_OPTIONS_RESPONSE_BODY: bool` - include a JSON method listing in
//!   automatic `OPTIONS` responses.
//!
//! ## Environment loading
//!
//! `AppConfig::from_env()` reads every variable with the `LACONIC_` prefix,
//! strips the prefix, and parses the value leniently: `true`/`false` become
//! booleans, numeric strings become numbers, everything else stays a string.

use serde_json::Value;
use std::collections::HashMap;
use std::env;

const ENV_PREFIX: &str = "LACONIC_";

/// Flat, uppercase-keyed application settings.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    values: HashMap<String, Value>,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an explicit mapping. Keys are uppercased on the way in.
    #[must_use]
    pub fn from_map(map: HashMap<String, Value>) -> Self {
        let values = map
            .into_iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();
        Self { values }
    }

    /// Load every `LACONIC_`-prefixed environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut values = HashMap::new();
        for (key, raw) in env::vars() {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                values.insert(name.to_ascii_uppercase(), parse_env_value(&raw));
            }
        }
        Self { values }
    }

    /// Merge `other` over this config; `other` wins on key conflicts.
    pub fn merge(&mut self, other: AppConfig) {
        self.values.extend(other.values);
    }

    pub fn set(&mut self, key: impl AsRef<str>, value: Value) {
        self.values
            .insert(key.as_ref().to_ascii_uppercase(), value);
    }

    /// A missing key resolves to `None`, never an error.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_ascii_uppercase())
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.get_bool("DEBUG")
    }

    #[must_use]
    pub fn automatic_options_response(&self) -> bool {
        self.get_bool("HTTP_AUTOMATIC_OPTIONS_RESPONSE")
    }

    #[must_use]
    pub fn options_response_body(&self) -> bool {
        self.get_bool("HTTP_OPTIONS_RESPONSE_BODY")
    }

    /// The underlying mapping, for seeding the root attribute scope.
    #[must_use]
    pub fn into_values(self) -> HashMap<String, Value> {
        self.values
    }

    #[must_use]
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

fn parse_env_value(raw: &str) -> Value {
    match raw {
        "true" | "True" | "TRUE" | "1" => Value::Bool(true),
        "false" | "False" | "FALSE" | "0" => Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::from(n)
            } else if let Ok(f) = raw.parse::<f64>() {
                Value::from(f)
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}
