//! Route registration.

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

use crate::error::RenderOptions;
use crate::handler::{Handler, Middleware, Node};
use crate::pattern::Pattern;
use crate::router::compiled::{CompiledRouter, RouteTable};
use crate::router::RouteError;
use crate::routing::Resolver;

/// Mutable route tree; `build()` freezes it into a `CompiledRouter`.
#[derive(Default)]
pub struct RouteBuilder {
    nodes: Vec<Node>,
    /// Canonical pattern string → index into `nodes`.
    index: HashMap<String, usize>,
    chain: Vec<Middleware>,
    not_found: Option<Handler>,
    render: RenderOptions,
    compiled: Option<CompiledRouter>,
}

impl RouteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct patterns registered.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serve every method at `path` with `handler`.
    pub fn handle(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.node(path, "handle")?.handle(handler, Vec::new())?;
        Ok(self)
    }

    pub fn method(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
    ) -> Result<&mut Self, RouteError> {
        self.node(path, "method")?.method(method, handler, Vec::new())?;
        Ok(self)
    }

    pub fn get(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::GET, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::POST, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::PUT, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::PATCH, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::DELETE, path, handler)
    }

    /// Alias of `handle`: the catch-all method entry.
    pub fn any(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.handle(path, handler)
    }

    /// Middleware wrapping every request this router dispatches, matched or not.
    pub fn use_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.ensure_open("use_middleware");
        self.chain.push(middleware);
        self
    }

    /// Registration view whose handlers are wrapped in `middleware`.
    pub fn with(&mut self, middleware: Middleware) -> Chain<'_> {
        self.ensure_open("with");
        Chain {
            router: self,
            chain: vec![middleware],
        }
    }

    /// Middleware wrapping everything the node at `path` serves: every
    /// method, its `OPTIONS`/405 answers, or a nested router.
    pub fn wrap(&mut self, path: &str, middleware: Middleware) -> Result<&mut Self, RouteError> {
        self.node(path, "wrap")?.with(middleware);
        Ok(self)
    }

    /// Build a nested router under the mount form of `path`
    /// (`/api` → `/api/*`). Calling it again for the same path extends the
    /// same nested router.
    pub fn route<F>(&mut self, path: &str, f: F) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut RouteBuilder) -> Result<(), RouteError>,
    {
        let nested = self.node(&mount_path(path), "route")?.router()?;
        f(nested)?;
        Ok(self)
    }

    /// Mount an already compiled router under the mount form of `path`.
    pub fn mount(&mut self, path: &str, router: CompiledRouter) -> Result<&mut Self, RouteError> {
        self.node(&mount_path(path), "mount")?.mount(router)?;
        Ok(self)
    }

    /// Handler for requests that resolve to 404 at this level.
    pub fn not_found(&mut self, handler: Handler) -> &mut Self {
        self.ensure_open("not_found");
        self.not_found = Some(handler);
        self
    }

    /// How the top-level `serve` renders failures.
    pub fn render_options(&mut self, options: RenderOptions) -> &mut Self {
        self.ensure_open("render_options");
        self.render = options;
        self
    }

    /// Compile every node and freeze the tree. Further registration panics;
    /// calling `compile` again returns the same router.
    pub fn compile(&mut self) -> CompiledRouter {
        if let Some(router) = &self.compiled {
            return router.clone();
        }

        let mut resolver = Resolver::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let compiled = node.compile().clone();
            resolver.insert(compiled.pattern(), index);
            nodes.push(compiled);
        }

        let router = CompiledRouter::new(
            RouteTable::new(resolver, nodes),
            &self.chain,
            self.not_found.clone(),
            self.render.clone(),
        );
        tracing::debug!(
            routes = router.len(),
            middleware = self.chain.len(),
            "router compiled"
        );

        self.compiled = Some(router.clone());
        router
    }

    pub fn build(mut self) -> CompiledRouter {
        self.compile()
    }

    fn ensure_open(&self, op: &str) {
        if self.compiled.is_some() {
            panic!("can't call {op}() on a compiled router");
        }
    }

    fn node(&mut self, path: &str, op: &str) -> Result<&mut Node, RouteError> {
        self.ensure_open(op);
        let pattern = Pattern::compile(path)?;

        let index = match self.index.get(pattern.pattern()) {
            Some(&index) => index,
            None => {
                let index = self.nodes.len();
                self.index.insert(pattern.pattern().to_string(), index);
                self.nodes.push(Node::new(pattern));
                index
            }
        };
        Ok(&mut self.nodes[index])
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("routes", &self.nodes.len())
            .field("middleware", &self.chain.len())
            .field("compiled", &self.compiled.is_some())
            .finish()
    }
}

/// `/api` → `/api/*`, `/api/` → `/api/*`, `/` → `/*`.
fn mount_path(path: &str) -> String {
    if path.ends_with("/*") {
        path.to_string()
    } else if path.ends_with('/') {
        format!("{path}*")
    } else {
        format!("{path}/*")
    }
}

/// Registrations wrapped in an extra middleware chain; see `RouteBuilder::with`.
pub struct Chain<'a> {
    router: &'a mut RouteBuilder,
    chain: Vec<Middleware>,
}

impl Chain<'_> {
    pub fn with(mut self, middleware: Middleware) -> Self {
        self.chain.push(middleware);
        self
    }

    pub fn handle(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.router
            .node(path, "handle")?
            .handle(handler, self.chain.clone())?;
        Ok(self)
    }

    pub fn method(
        &mut self,
        method: Method,
        path: &str,
        handler: Handler,
    ) -> Result<&mut Self, RouteError> {
        self.router
            .node(path, "method")?
            .method(method, handler, self.chain.clone())?;
        Ok(self)
    }

    pub fn get(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::GET, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::POST, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::PUT, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::PATCH, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: Handler) -> Result<&mut Self, RouteError> {
        self.method(Method::DELETE, path, handler)
    }
}
