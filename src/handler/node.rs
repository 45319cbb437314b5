//! Route node state machine.
//!
//! # States
//! ```text
//! Raw { target, chain } ──compile()──▶ Compiled { handler }
//! ```
//! `target` is one of: empty, a single handler, a method table, a nested
//! `RouteBuilder`, or an already compiled router. Compilation happens once,
//! from `RouteBuilder::compile`; any registration on a compiled node panics.

use axum::http::{Method, StatusCode};

use crate::handler::method::MethodTable;
use crate::handler::{compile_chain, Handler, Middleware};
use crate::pattern::Pattern;
use crate::router::{CompiledRouter, RouteBuilder, RouteError};

/// One entry in a router, addressed by its pattern.
pub struct Node {
    pattern: Pattern,
    state: NodeState,
}

enum NodeState {
    Raw(RawNode),
    Compiled(CompiledNode),
}

#[derive(Default)]
struct RawNode {
    target: Target,
    chain: Vec<Middleware>,
}

#[derive(Default)]
enum Target {
    #[default]
    Empty,
    Handler(Handler, Vec<Middleware>),
    Methods(MethodTable),
    Router(Box<RouteBuilder>),
    Mounted(CompiledRouter),
}

impl Target {
    fn describe(&self) -> &'static str {
        match self {
            Target::Empty => "nothing",
            Target::Handler(..) => "handler",
            Target::Methods(_) => "method table",
            Target::Router(_) | Target::Mounted(_) => "sub-router",
        }
    }
}

/// What a compiled node dispatches to.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Empty,
    Handler,
    Methods { allow: String },
    Router(CompiledRouter),
}

/// A node after compilation: one handler with its middleware folded in.
#[derive(Debug, Clone)]
pub struct CompiledNode {
    pattern: Pattern,
    handler: Handler,
    kind: NodeKind,
}

impl CompiledNode {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

impl Node {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            state: NodeState::Raw(RawNode::default()),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, NodeState::Compiled(_))
    }

    /// Serve every method with `handler`. On a node that already has a method
    /// table this sets the catch-all entry.
    pub fn handle(&mut self, handler: Handler, chain: Vec<Middleware>) -> Result<(), RouteError> {
        let raw = raw_mut(&self.pattern, &mut self.state, "handle");
        match &mut raw.target {
            Target::Methods(table) => table.set_any(handler, chain),
            target @ (Target::Router(_) | Target::Mounted(_)) => {
                return Err(conflict(&self.pattern, target, "handler"))
            }
            target => *target = Target::Handler(handler, chain),
        }
        Ok(())
    }

    /// Serve `method` with `handler`. A node holding a single handler keeps
    /// it as the catch-all entry.
    pub fn method(
        &mut self,
        method: Method,
        handler: Handler,
        chain: Vec<Middleware>,
    ) -> Result<(), RouteError> {
        let raw = raw_mut(&self.pattern, &mut self.state, "method");
        let mut table = match std::mem::take(&mut raw.target) {
            Target::Empty => MethodTable::new(),
            Target::Handler(any, any_chain) => {
                let mut table = MethodTable::new();
                table.set_any(any, any_chain);
                table
            }
            Target::Methods(table) => table,
            other => {
                let err = conflict(&self.pattern, &other, "method handler");
                raw.target = other;
                return Err(err);
            }
        };
        table.insert(method, handler, chain);
        raw.target = Target::Methods(table);
        Ok(())
    }

    /// Append middleware wrapping whatever this node serves.
    pub fn with(&mut self, middleware: Middleware) {
        raw_mut(&self.pattern, &mut self.state, "with").chain.push(middleware);
    }

    /// The nested builder of a mount node, created on first use.
    pub fn router(&mut self) -> Result<&mut RouteBuilder, RouteError> {
        if !self.pattern.is_mount() {
            return Err(RouteError::NotMount(self.pattern.raw().to_string()));
        }

        let raw = raw_mut(&self.pattern, &mut self.state, "route");
        match raw.target {
            Target::Empty => raw.target = Target::Router(Box::default()),
            Target::Router(_) => {}
            ref other => return Err(conflict(&self.pattern, other, "sub-router")),
        }
        let Target::Router(builder) = &mut raw.target else {
            unreachable!("target set to a router above");
        };
        Ok(&mut **builder)
    }

    /// Delegate this mount node to an already compiled router.
    pub fn mount(&mut self, router: CompiledRouter) -> Result<(), RouteError> {
        if !self.pattern.is_mount() {
            return Err(RouteError::NotMount(self.pattern.raw().to_string()));
        }

        let raw = raw_mut(&self.pattern, &mut self.state, "mount");
        match raw.target {
            Target::Empty => {
                raw.target = Target::Mounted(router);
                Ok(())
            }
            ref other => Err(conflict(&self.pattern, other, "sub-router")),
        }
    }

    /// Fold the node into its executable form. Idempotent.
    pub fn compile(&mut self) -> &CompiledNode {
        if let NodeState::Raw(raw) = &mut self.state {
            let compiled = std::mem::take(raw).compile(&self.pattern);
            self.state = NodeState::Compiled(compiled);
        }
        match &self.state {
            NodeState::Compiled(compiled) => compiled,
            NodeState::Raw(_) => unreachable!("node compiled above"),
        }
    }
}

impl RawNode {
    fn compile(self, pattern: &Pattern) -> CompiledNode {
        let (handler, kind) = match self.target {
            // Middleware still runs; the node itself answers 404.
            Target::Empty => (Handler::status(StatusCode::NOT_FOUND), NodeKind::Empty),
            Target::Handler(handler, chain) => (compile_chain(&chain, handler), NodeKind::Handler),
            Target::Methods(table) => {
                let methods = table.compile();
                let allow = methods.allow().to_string();
                (Handler::from_serve(methods), NodeKind::Methods { allow })
            }
            Target::Router(mut builder) => {
                let router = builder.compile();
                (Handler::from_serve(router.clone()), NodeKind::Router(router))
            }
            Target::Mounted(router) => (Handler::from_serve(router.clone()), NodeKind::Router(router)),
        };

        CompiledNode {
            pattern: pattern.clone(),
            handler: compile_chain(&self.chain, handler),
            kind,
        }
    }
}

fn raw_mut<'a>(pattern: &Pattern, state: &'a mut NodeState, op: &str) -> &'a mut RawNode {
    match state {
        NodeState::Raw(raw) => raw,
        NodeState::Compiled(_) => panic!("can't call {op}() on compiled route {pattern}"),
    }
}

fn conflict(pattern: &Pattern, existing: &Target, requested: &'static str) -> RouteError {
    RouteError::Conflict {
        pattern: pattern.raw().to_string(),
        existing: existing.describe(),
        requested,
    }
}
