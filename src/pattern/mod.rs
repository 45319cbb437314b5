//! Path pattern compilation.
//!
//! # Responsibilities
//! - Parse the registration DSL (`/users/{id}`, `/{lang:en|pt}`, `/a[/b]`)
//! - Decide between a literal trie key and a compiled regex
//! - Normalize mount points (`/api/`, `/api/*`) to one canonical pattern
//!
//! # Design Decisions
//! - Purely literal paths never touch the regex engine
//! - Capture groups are named positionally so a name may repeat

mod compiler;
mod parser;

use std::fmt;

use regex::Regex;
use thiserror::Error;

pub use compiler::group_name;
pub use parser::Token;

/// Registration path rejected by the compiler.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("empty route path")]
    Empty,

    #[error("route path {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("unexpected {found:?} at offset {offset} in {path:?}")]
    Unexpected {
        path: String,
        offset: usize,
        found: char,
    },

    #[error("unterminated {open:?} opened at offset {offset} in {path:?}")]
    Unterminated {
        path: String,
        offset: usize,
        open: char,
    },

    #[error("empty capture name at offset {offset} in {path:?}")]
    EmptyCaptureName { path: String, offset: usize },

    #[error("invalid capture name {name:?} in {path:?}")]
    InvalidCaptureName { path: String, name: String },

    #[error("empty option in capture {name:?} of {path:?}")]
    EmptyOption { path: String, name: String },

    #[error("empty optional group at offset {offset} in {path:?}")]
    EmptyOptional { path: String, offset: usize },

    #[error("failed to compile {path:?}: {source}")]
    Regex {
        path: String,
        #[source]
        source: regex::Error,
    },
}

/// How a pattern is matched.
#[derive(Debug, Clone)]
pub enum PatternKind {
    Literal {
        key: String,
    },
    Regex {
        regex: Regex,
        params: Vec<String>,
        leaf: bool,
    },
}

/// Compiled form of one registration path.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    path: String,
    pattern: String,
    kind: PatternKind,
}

impl Pattern {
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        match raw {
            "/" => return Ok(Self::literal(raw, "/", "/", "/")),
            "/*" => return Ok(Self::literal(raw, "/", "/*", "/")),
            _ => {}
        }

        // "/api/*" and "/api/" are the same mount point.
        let (path, pattern) = if let Some(stem) = raw.strip_suffix('*') {
            if !stem.ends_with('/') {
                return Err(PatternError::Unexpected {
                    path: raw.to_string(),
                    offset: raw.len() - 1,
                    found: '*',
                });
            }
            (stem.to_string(), raw.to_string())
        } else if raw.ends_with('/') {
            (raw.to_string(), format!("{raw}*"))
        } else {
            (raw.to_string(), raw.to_string())
        };

        let tokens = parser::parse(&path)?;

        if tokens.iter().all(Token::is_literal) {
            let key = path.strip_suffix('/').unwrap_or(&path);
            let key = if key.is_empty() { "/" } else { key };
            return Ok(Self::literal(raw, &path, &pattern, key));
        }

        let compiled = compiler::compile(&tokens);
        let regex = Regex::new(&compiled.source).map_err(|source| PatternError::Regex {
            path: raw.to_string(),
            source,
        })?;

        Ok(Self {
            raw: raw.to_string(),
            path,
            pattern,
            kind: PatternKind::Regex {
                regex,
                params: compiled.params,
                leaf: compiled.leaf,
            },
        })
    }

    fn literal(raw: &str, path: &str, pattern: &str, key: &str) -> Self {
        Self {
            raw: raw.to_string(),
            path: path.to_string(),
            pattern: pattern.to_string(),
            kind: PatternKind::Literal {
                key: key.to_string(),
            },
        }
    }

    /// The path exactly as registered.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The path with any `*` mount marker removed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Canonical pattern string; mounts end in `/*`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, PatternKind::Literal { .. })
    }

    pub fn literal_key(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::Literal { key } => Some(key),
            PatternKind::Regex { .. } => None,
        }
    }

    pub fn regex(&self) -> Option<&Regex> {
        match &self.kind {
            PatternKind::Regex { regex, .. } => Some(regex),
            PatternKind::Literal { .. } => None,
        }
    }

    /// Parameter names in capture-group order.
    pub fn param_names(&self) -> &[String] {
        match &self.kind {
            PatternKind::Regex { params, .. } => params,
            PatternKind::Literal { .. } => &[],
        }
    }

    pub fn is_mount(&self) -> bool {
        self.pattern.ends_with("/*")
    }

    pub fn is_leaf(&self) -> bool {
        match &self.kind {
            PatternKind::Literal { .. } => !self.is_mount(),
            PatternKind::Regex { leaf, .. } => *leaf,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
