//! Path template compilation.
//!
//! # Responsibilities
//! - Rewrite `{name}` placeholders into single-segment captures
//! - Escape everything else so it matches literally
//! - Reject templates whose placeholders cannot be bound unambiguously
//!
//! # Design Decisions
//! - Compiled once per reload, matched on every request
//! - Captures are positional; names are kept alongside in declaration order
//! - Anchored on both ends, so matching is structural and never prefix-based
//! - One optional trailing slash is tolerated on the request path

use std::collections::HashMap;
use std::sync::OnceLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use thiserror::Error;

/// Errors raised while compiling route templates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteCompileError {
    #[error("route '{template}' declares path parameter '{name}' more than once")]
    DuplicateParameter { template: String, name: String },

    #[error("route '{template}' contains an empty path parameter '{{}}'")]
    EmptyParameter { template: String },

    #[error("route '{template}' must map to an object of HTTP methods")]
    InvalidMethods { template: String },

    #[error("route '{template}' could not be compiled: {reason}")]
    Pattern { template: String, reason: String },
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^/{}]*)\}").expect("placeholder regex is valid"))
}

/// A compiled resource path such as `/items/{id}`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    names: Vec<String>,
}

impl PathPattern {
    /// Compile a resource path (already prefixed with `/`).
    pub fn compile(resource_path: &str) -> Result<Self, RouteCompileError> {
        let body = match resource_path.strip_suffix('/') {
            Some(stripped) => stripped,
            None => resource_path,
        };

        let mut source = String::with_capacity(body.len() + 16);
        let mut names: Vec<String> = Vec::new();
        let mut cursor = 0;

        source.push('^');
        for caps in placeholder_regex().captures_iter(body) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            if name.is_empty() {
                return Err(RouteCompileError::EmptyParameter {
                    template: resource_path.to_string(),
                });
            }
            if names.iter().any(|n| n == name) {
                return Err(RouteCompileError::DuplicateParameter {
                    template: resource_path.to_string(),
                    name: name.to_string(),
                });
            }

            source.push_str(&regex::escape(&body[cursor..whole.start()]));
            source.push_str("([^/]+)");
            names.push(name.to_string());
            cursor = whole.end();
        }
        source.push_str(&regex::escape(&body[cursor..]));
        source.push_str("/?$");

        let regex = Regex::new(&source).map_err(|e| RouteCompileError::Pattern {
            template: resource_path.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { regex, names })
    }

    /// Placeholder names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns the captured parameters if `path` matches this pattern.
    ///
    /// `path` is matched still percent-encoded, so an encoded `/` never adds
    /// a segment; each captured value is decoded afterwards.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let params = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| {
                caps.get(i + 1)
                    .map(|m| (name.clone(), percent_decode_str(m.as_str()).decode_utf8_lossy().into_owned()))
            })
            .collect();
        Some(params)
    }
}
