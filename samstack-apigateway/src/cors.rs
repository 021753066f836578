//! CORS configuration
//!
//! SAM accepts either a bare origin string (`Cors: "'*'"`) or a mapping with
//! `AllowOrigin`, `AllowMethods`, `AllowHeaders` and `MaxAge`. Values are
//! written as quoted string literals in templates, so surrounding single
//! quotes are stripped.

use crate::error::ApiError;
use crate::route::{HttpMethod, MethodSpec, Route};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

const DEFAULT_ALLOW_ORIGIN: &str = "*";

/// Resolved CORS policy of an API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cors {
    pub allow_origin: String,
    /// Sorted, comma-joined verbs
    pub allow_methods: String,
    pub allow_headers: Option<String>,
    pub max_age: Option<u64>,
}

impl Cors {
    pub fn new(allow_origin: impl Into<String>, allow_methods: &BTreeSet<HttpMethod>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
            allow_methods: join_methods(allow_methods),
            allow_headers: None,
            max_age: None,
        }
    }

    pub fn with_allow_headers(mut self, allow_headers: impl Into<String>) -> Self {
        self.allow_headers = Some(allow_headers.into());
        self
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// `Cors` property as written in the template
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CorsSpec {
    /// Shorthand: allowed origin, every method allowed
    Origin(String),
    Config(CorsConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsConfig {
    pub allow_origin: Option<String>,
    pub allow_methods: Option<String>,
    pub allow_headers: Option<String>,
    /// Number or numeric string
    pub max_age: Option<Value>,
}

impl CorsSpec {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        Self::deserialize(value)
            .map_err(|e| ApiError::InvalidDocument(format!("Invalid Cors property: {e}")))
    }
}

/// Applies a CORS spec to the routes of one API
pub struct CorsResolver;

impl CorsResolver {
    /// Every route gains `OPTIONS`. Allowed methods default to every verb
    /// served by the routes.
    pub fn resolve(spec: &CorsSpec, mut routes: Vec<Route>) -> Result<(Cors, Vec<Route>), ApiError> {
        for route in &mut routes {
            route.add_method(HttpMethod::Options);
        }

        let cors = match spec {
            CorsSpec::Origin(origin) => {
                Cors::new(unquote(origin), &HttpMethod::ANY.into_iter().collect())
            }
            CorsSpec::Config(config) => {
                let mut methods = match &config.allow_methods {
                    Some(raw) => parse_allow_methods(raw)?,
                    None => routes
                        .iter()
                        .flat_map(|r| r.methods().iter().copied())
                        .collect(),
                };
                methods.insert(HttpMethod::Options);

                let origin = config
                    .allow_origin
                    .as_deref()
                    .map_or(DEFAULT_ALLOW_ORIGIN, unquote);

                let mut cors = Cors::new(origin, &methods);
                if let Some(headers) = &config.allow_headers {
                    cors = cors.with_allow_headers(unquote(headers));
                }
                if let Some(max_age) = &config.max_age {
                    cors = cors.with_max_age(parse_max_age(max_age)?);
                }
                cors
            }
        };

        Ok((cors, routes))
    }
}

/// Parse a comma-separated `AllowMethods` value. `*` and `ANY` mean every verb.
pub fn parse_allow_methods(raw: &str) -> Result<BTreeSet<HttpMethod>, ApiError> {
    let mut methods = BTreeSet::new();
    for name in unquote(raw).split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if name == "*" {
            methods.extend(HttpMethod::ANY);
            continue;
        }
        let spec: MethodSpec = name.parse().map_err(|_| {
            ApiError::InvalidDocument(format!("Cors AllowMethods has invalid method: {name}"))
        })?;
        methods.extend(spec.expand());
    }
    Ok(methods)
}

fn parse_max_age(value: &Value) -> Result<u64, ApiError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => unquote(s).trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::InvalidDocument(format!("Cors MaxAge is not a number: {value}")))
}

fn join_methods(methods: &BTreeSet<HttpMethod>) -> String {
    methods
        .iter()
        .map(HttpMethod::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(trimmed)
}
