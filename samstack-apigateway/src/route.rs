//! Routes and HTTP methods

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Swagger extension key standing in for "every method" on a path
pub const ANY_METHOD_EXTENSION: &str = "x-amazon-apigateway-any-method";

/// A method name that is neither a known HTTP verb nor `ANY`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid HTTP method: {0}")]
pub struct InvalidMethod(pub String);

/// HTTP verbs API Gateway can route to a function.
///
/// Variants are declared alphabetically so that the derived `Ord` gives the
/// sort order used when methods are joined into a CORS header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
}

impl HttpMethod {
    /// What `ANY` stands for, in the order routes list it
    pub const ANY: [HttpMethod; 7] = [
        Self::Get,
        Self::Delete,
        Self::Put,
        Self::Post,
        Self::Head,
        Self::Options,
        Self::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DELETE" => Ok(Self::Delete),
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH" => Ok(Self::Patch),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            _ => Err(InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method as declared in a template or Swagger document, before `ANY` is
/// expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodSpec {
    Named(HttpMethod),
    Any,
}

impl MethodSpec {
    /// Expand into concrete verbs
    pub fn expand(self) -> Vec<HttpMethod> {
        match self {
            Self::Named(method) => vec![method],
            Self::Any => HttpMethod::ANY.to_vec(),
        }
    }
}

impl FromStr for MethodSpec {
    type Err = InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("any") || trimmed == ANY_METHOD_EXTENSION {
            return Ok(Self::Any);
        }
        trimmed.parse().map(Self::Named)
    }
}

/// A path served by a single function.
///
/// Methods keep their declaration order but compare as a set, so two routes
/// listing the same verbs in a different order are equal.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub function_name: String,
    methods: Vec<HttpMethod>,
}

impl Route {
    pub fn new(
        path: impl Into<String>,
        methods: impl IntoIterator<Item = HttpMethod>,
        function_name: impl Into<String>,
    ) -> Self {
        let mut route = Self {
            path: path.into(),
            function_name: function_name.into(),
            methods: Vec::new(),
        };
        for method in methods {
            route.add_method(method);
        }
        route
    }

    pub fn methods(&self) -> &[HttpMethod] {
        &self.methods
    }

    pub fn has_method(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    /// Add a method unless it is already present
    pub fn add_method(&mut self, method: HttpMethod) {
        if !self.has_method(method) {
            self.methods.push(method);
        }
    }

    pub fn remove_method(&mut self, method: HttpMethod) {
        self.methods.retain(|m| *m != method);
    }

    fn method_set(&self) -> BTreeSet<HttpMethod> {
        self.methods.iter().copied().collect()
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.function_name == other.function_name
            && self.method_set() == other.method_set()
    }
}

impl Eq for Route {}

impl Hash for Route {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.function_name.hash(state);
        self.method_set().hash(state);
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self.methods.iter().map(HttpMethod::as_str).collect();
        write!(f, "{} {} -> {}", methods.join(","), self.path, self.function_name)
    }
}
