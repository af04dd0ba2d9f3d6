//! Route table compilation and lookup.
//!
//! # Responsibilities
//! - Compile the handler's declared routes into descriptors
//! - Look up the first descriptor matching a path and method
//! - Degrade to the raw path when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (shared through the published snapshot)
//! - Declaration order is preserved; first match wins
//! - O(n) scan over descriptors (route counts are small in development)
//! - An unmatched request is not an error; it keeps flowing to the handler

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::routing::pattern::{PathPattern, RouteCompileError};

/// Compiled form of one declared route template.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    /// Canonical resource path, placeholders intact (e.g. `/items/{id}`).
    pub resource_path: String,
    /// Uppercase HTTP methods declared for this route.
    pub supported_methods: BTreeSet<String>,
    /// Compiled matcher for the resource path.
    pub pattern: PathPattern,
}

impl RouteDescriptor {
    /// Compile a single template with its verb mapping.
    pub fn compile(template: &str, methods: &Value) -> Result<Self, RouteCompileError> {
        let resource_path = format!("/{}", template);

        let supported_methods = match methods {
            Value::Object(verbs) => verbs.keys().map(|verb| verb.to_uppercase()).collect(),
            Value::Null => BTreeSet::new(),
            _ => {
                return Err(RouteCompileError::InvalidMethods {
                    template: template.to_string(),
                })
            }
        };

        let pattern = PathPattern::compile(&resource_path)?;

        Ok(Self {
            resource_path,
            supported_methods,
            pattern,
        })
    }

    fn supports(&self, method: &str) -> bool {
        self.supported_methods.contains(method)
    }
}

/// Resource path and parameters recovered for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub resource_path: String,
    pub path_parameters: HashMap<String, String>,
}

impl MatchResult {
    /// The result used when no route matches.
    pub fn unmatched(path: &str) -> Self {
        Self {
            resource_path: path.to_string(),
            path_parameters: HashMap::new(),
        }
    }
}

/// Ordered list of compiled routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Compile the `routes` object of a handler's API configuration.
    ///
    /// A missing configuration yields an empty table.
    pub fn compile(routes: Option<&Map<String, Value>>) -> Result<Self, RouteCompileError> {
        let Some(routes) = routes else {
            return Ok(Self::default());
        };

        let routes = routes
            .iter()
            .map(|(template, methods)| RouteDescriptor::compile(template, methods))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { routes })
    }

    /// Find the first route matching `path` and `method`.
    pub fn match_route(&self, path: &str, method: &str) -> MatchResult {
        self.lookup(path, method)
            .unwrap_or_else(|| MatchResult::unmatched(path))
    }

    /// Like [`match_route`](Self::match_route), but `None` when no declared
    /// route matches.
    pub fn lookup(&self, path: &str, method: &str) -> Option<MatchResult> {
        self.routes
            .iter()
            .filter(|route| route.supports(method))
            .find_map(|route| {
                route.pattern.captures(path).map(|path_parameters| MatchResult {
                    resource_path: route.resource_path.clone(),
                    path_parameters,
                })
            })
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
