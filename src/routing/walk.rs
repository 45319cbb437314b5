//! Route table introspection.

use std::fmt;

/// What a walked route serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    /// Node with middleware only; answers 404 on its own.
    Empty,
    Handler,
    Methods { allow: String },
}

/// One route visited by `CompiledRouter::walk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Full pattern including the mount prefixes of enclosing routers.
    pub pattern: String,
    pub kind: RouteKind,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RouteKind::Empty => write!(f, "{:<8} {}", "-", self.pattern),
            RouteKind::Handler => write!(f, "{:<8} {}", "*", self.pattern),
            RouteKind::Methods { allow } => write!(f, "{:<8} {} [{allow}]", "METHODS", self.pattern),
        }
    }
}

/// Prefix a nested pattern with the mount pattern it lives under.
pub fn join_pattern(mount: &str, pattern: &str) -> String {
    let base = mount.strip_suffix("/*").unwrap_or(mount);
    format!("{base}{pattern}")
}
