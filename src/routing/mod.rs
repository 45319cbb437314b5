//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Remaining request path
//!     → trie.rs (literal keys, longest prefix first)
//!     → resolver.rs (regex routes, precedence, mount redirect)
//!     → Return: Matched(prefix, remainder, node, params) | Redirect | NotFound
//!
//! Route Compilation (at build):
//!     Node patterns in registration order
//!     → literal keys into the trie, regexes into an ordered list
//!     → Freeze inside CompiledRouter
//! ```
//!
//! # Design Decisions
//! - Literal routes never touch the regex engine
//! - Deterministic: same input always resolves to the same node
//! - Equal-length regex matches go to the earliest registration

pub mod resolver;
pub mod trie;
pub mod walk;

pub use resolver::{Resolution, Resolver, RouteMatch};
pub use walk::{RouteInfo, RouteKind};
