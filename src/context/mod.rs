//! Per-request routing state.
//!
//! # Responsibilities
//! - Track how much of the request path nested routers have consumed
//! - Accumulate the matched pattern and captured parameters
//!
//! # Data Flow
//! ```text
//! RoutingContext::new(request path)
//!     → step(matched prefix, params)   (router at depth 0)
//!     → step(matched prefix, params)   (nested router)
//!     → handler reads prefix()/path()/params()
//! ```
//!
//! Contexts are values: `step` never mutates the receiver, so a parent
//! router can keep its own context while the child works on a new one.

mod params;

pub use params::{ParamError, ParamValue, RouteParams};

/// Routing metadata threaded through nested dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    prefix: String,
    path: String,
    pattern: String,
    params: RouteParams,
}

impl RoutingContext {
    /// Context for a request that nothing has routed yet.
    pub fn new(path: &str) -> Self {
        let path = if path.is_empty() { "/" } else { path };
        Self {
            prefix: "/".to_string(),
            path: path.to_string(),
            pattern: String::new(),
            params: RouteParams::new(),
        }
    }

    /// Consumed portion of the request path; `/` when nothing is consumed.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Unconsumed suffix; starts with `/` or is empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pattern matched so far, e.g. `/api/*` or `/api/users/{id}`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut RouteParams {
        &mut self.params
    }

    /// Shorthand for `params().get_str(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get_str(name)
    }

    /// The request path as seen by the router that created this context.
    pub fn full_path(&self) -> String {
        match (self.prefix.as_str(), self.path.is_empty()) {
            ("/", true) => "/".to_string(),
            ("/", false) => self.path.clone(),
            (prefix, true) => prefix.to_string(),
            (prefix, false) => format!("{prefix}{}", self.path),
        }
    }

    /// Derive the context for the next routing level after `prefix` of the
    /// remaining path has been matched.
    ///
    /// # Panics
    /// When `prefix` does not occur in the remaining path, or consuming it
    /// would leave a remainder that does not start at a segment boundary.
    pub fn step(&self, prefix: &str, params: RouteParams) -> Self {
        let base = self.pattern.strip_suffix("/*").unwrap_or(&self.pattern);

        let (consumed_prefix, path, pattern) = if prefix == self.path {
            (self.full_path(), String::new(), format!("{base}{prefix}"))
        } else if let Some(rest) = self.path.strip_prefix(prefix) {
            self.check_remainder(prefix, rest);
            (
                self.accumulate(prefix),
                rest.to_string(),
                format!("{base}{prefix}/*"),
            )
        } else {
            let Some(offset) = self.path.find(prefix) else {
                panic!(
                    "routing context: prefix {prefix:?} does not occur in remaining path {:?}",
                    self.path
                );
            };
            let (consumed, rest) = self.path.split_at(offset + prefix.len());
            self.check_remainder(prefix, rest);
            (
                self.accumulate(consumed),
                rest.to_string(),
                format!("{base}{consumed}/*"),
            )
        };

        let mut merged = self.params.clone();
        merged.merge(params);

        Self {
            prefix: if consumed_prefix.is_empty() {
                "/".to_string()
            } else {
                consumed_prefix
            },
            path,
            pattern,
            params: merged,
        }
    }

    /// Step past the first segment of the remaining path, returning the new
    /// context and the bare segment.
    pub fn next(&self) -> Option<(Self, String)> {
        let rest = self.path.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }

        let (prefix, segment) = match rest.find('/') {
            Some(end) => (&self.path[..end + 1], &rest[..end]),
            None => (self.path.as_str(), rest),
        };
        Some((self.step(prefix, RouteParams::new()), segment.to_string()))
    }

    fn accumulate(&self, consumed: &str) -> String {
        if self.prefix == "/" {
            consumed.to_string()
        } else {
            format!("{}{consumed}", self.prefix)
        }
    }

    fn check_remainder(&self, prefix: &str, rest: &str) {
        assert!(
            rest.is_empty() || rest.starts_with('/'),
            "routing context: prefix {prefix:?} splits {:?} inside a segment",
            self.path
        );
    }
}
