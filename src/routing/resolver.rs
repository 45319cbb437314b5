//! Path → node resolution across literal and pattern routes.
//!
//! # Precedence
//! 1. Literal routes: the longest registered key that is acceptable wins
//!    (exact leaf match, or a mount whose remainder starts at a `/`).
//! 2. Pattern routes: the longest matched prefix wins, ties go to the
//!    earliest registration.
//! 3. Between the two, a pattern wins only with a strictly longer prefix.
//! 4. A mount matched with nothing left over (other than the root mount)
//!    resolves to a redirect to its canonical `/`-terminated form.

use crate::context::RouteParams;
use crate::pattern::{group_name, Pattern};
use crate::routing::trie::Trie;

/// A successful match, prior to stepping the routing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Portion of the path consumed by the matched route.
    pub prefix: String,
    /// Unconsumed suffix handed to the node; empty or starting with `/`.
    pub remainder: String,
    /// Index of the node in registration order.
    pub node: usize,
    pub params: RouteParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched(RouteMatch),
    /// A mount point was addressed without its trailing slash.
    Redirect(RouteMatch),
    NotFound,
}

#[derive(Debug, Default, Clone, Copy)]
struct LiteralSlot {
    exact: Option<usize>,
    mount: Option<usize>,
}

struct Candidate {
    matched: RouteMatch,
    mount: bool,
}

/// Lookup structure over one router's nodes.
#[derive(Debug, Default)]
pub struct Resolver {
    literals: Trie<LiteralSlot>,
    patterns: Vec<(Pattern, usize)>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern` as addressing node `node`.
    pub fn insert(&mut self, pattern: &Pattern, node: usize) {
        match pattern.literal_key() {
            Some(key) => {
                let slot = self.literals.get_or_default(key);
                if pattern.is_mount() {
                    slot.mount = Some(node);
                } else {
                    slot.exact = Some(node);
                }
            }
            None => self.patterns.push((pattern.clone(), node)),
        }
    }

    pub fn resolve(&self, path: &str) -> Resolution {
        let winner = match (self.literal_candidate(path), self.pattern_candidate(path)) {
            (Some(literal), Some(pattern)) => {
                if pattern.matched.prefix.len() > literal.matched.prefix.len() {
                    pattern
                } else {
                    literal
                }
            }
            (Some(candidate), None) | (None, Some(candidate)) => candidate,
            (None, None) => return Resolution::NotFound,
        };

        if winner.mount && winner.matched.remainder.is_empty() && !winner.matched.prefix.is_empty()
        {
            return Resolution::Redirect(winner.matched);
        }
        Resolution::Matched(winner.matched)
    }

    /// Node indices in walk order: literal keys (exact before mount), then
    /// patterns in registration order.
    pub fn order(&self) -> Vec<usize> {
        let literals = self
            .literals
            .entries()
            .into_iter()
            .flat_map(|(_, slot)| slot.exact.into_iter().chain(slot.mount));
        literals
            .chain(self.patterns.iter().map(|(_, node)| *node))
            .collect()
    }

    fn literal_candidate(&self, path: &str) -> Option<Candidate> {
        for (len, slot) in self.literals.prefixes(path) {
            let key = &path[..len];
            let rest = &path[len..];

            if rest.is_empty() {
                if let Some(node) = slot.exact {
                    return Some(candidate(key, "", node, RouteParams::new(), false));
                }
            }

            let Some(node) = slot.mount else { continue };
            if key == "/" {
                // The root mount consumes nothing.
                return Some(candidate("", path, node, RouteParams::new(), true));
            }
            if rest.is_empty() || rest.starts_with('/') {
                return Some(candidate(key, rest, node, RouteParams::new(), true));
            }
        }
        None
    }

    fn pattern_candidate(&self, path: &str) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for (pattern, node) in &self.patterns {
            let Some(regex) = pattern.regex() else { continue };
            let Some(captures) = regex.captures(path) else { continue };
            let Some(whole) = captures.get(0) else { continue };

            let mut end = whole.end();
            if !pattern.is_leaf() && whole.as_str().ends_with('/') {
                end -= 1;
            }

            if best
                .as_ref()
                .is_some_and(|best| best.matched.prefix.len() >= end)
            {
                continue;
            }

            let mut params = RouteParams::new();
            for (index, name) in pattern.param_names().iter().enumerate() {
                if let Some(value) = captures.name(&group_name(index)) {
                    params.add(name.as_str(), value.as_str());
                }
            }

            best = Some(candidate(
                &path[..end],
                &path[end..],
                *node,
                params,
                pattern.is_mount(),
            ));
        }

        best
    }
}

fn candidate(prefix: &str, remainder: &str, node: usize, params: RouteParams, mount: bool) -> Candidate {
    Candidate {
        matched: RouteMatch {
            prefix: prefix.to_string(),
            remainder: remainder.to_string(),
            node,
            params,
        },
        mount,
    }
}
