//! Per-method dispatch for one route.
//!
//! # Responsibilities
//! - Map request methods to handlers, with an optional catch-all
//! - Serve `HEAD` through `GET` when no explicit `HEAD` is registered
//! - Answer `OPTIONS` and reject unknown methods with the `Allow` list
//!
//! # Design Decisions
//! - `Allow` is computed once at compile time
//! - Each entry keeps its own middleware chain so `with(..)` registrations
//!   only wrap the handlers they registered

use std::borrow::Cow;
use std::collections::HashMap;

use axum::http::header::ALLOW;
use axum::http::{HeaderValue, Method, StatusCode};

use crate::context::RoutingContext;
use crate::error::MethodNotAllowed;
use crate::handler::{compile_chain, Handler, HandlerResult, Middleware, Serve};
use crate::http::{Request, ResponseWriter};

/// Methods the catch-all entry is advertised as serving.
static CATCH_ALL_METHODS: [Method; 4] = [Method::GET, Method::HEAD, Method::PUT, Method::DELETE];

#[derive(Clone)]
struct Entry {
    handler: Handler,
    chain: Vec<Middleware>,
}

impl Entry {
    fn compile(&self) -> Handler {
        compile_chain(&self.chain, self.handler.clone())
    }
}

/// Registration-time method table.
#[derive(Clone, Default)]
pub struct MethodTable {
    entries: HashMap<Method, Entry>,
    any: Option<Entry>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: Method, handler: Handler, chain: Vec<Middleware>) {
        let method = canonical_method(&method).into_owned();
        self.entries.insert(method, Entry { handler, chain });
    }

    /// Set the entry used for methods without their own handler.
    pub fn set_any(&mut self, handler: Handler, chain: Vec<Middleware>) {
        self.any = Some(Entry { handler, chain });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.any.is_none()
    }

    pub fn compile(&self) -> MethodHandler {
        let mut handlers: HashMap<Method, Handler> = self
            .entries
            .iter()
            .map(|(method, entry)| (method.clone(), entry.compile()))
            .collect();

        if !handlers.contains_key(&Method::HEAD) {
            if let Some(get) = handlers.get(&Method::GET).cloned() {
                handlers.insert(Method::HEAD, head_from_get(get));
            }
        }

        let allow = allow_list(handlers.keys(), self.any.is_some());
        MethodHandler {
            allow_header: HeaderValue::from_str(&allow).ok(),
            allow,
            handlers,
            any: self.any.as_ref().map(Entry::compile),
        }
    }
}

fn head_from_get(get: Handler) -> Handler {
    Handler::new(move |req, cx, res| {
        let result = get.try_serve(req, cx, res);
        res.strip_body();
        result
    })
}

fn allow_list<'a>(methods: impl Iterator<Item = &'a Method>, catch_all: bool) -> String {
    let mut allowed: Vec<&str> = methods.map(Method::as_str).collect();
    if catch_all {
        for method in &CATCH_ALL_METHODS {
            if !allowed.contains(&method.as_str()) {
                allowed.push(method.as_str());
            }
        }
    }
    allowed.sort_unstable();
    if !allowed.contains(&"OPTIONS") {
        allowed.push("OPTIONS");
    }
    allowed.join(", ")
}

/// Compiled method table.
pub struct MethodHandler {
    handlers: HashMap<Method, Handler>,
    any: Option<Handler>,
    allow: String,
    allow_header: Option<HeaderValue>,
}

impl MethodHandler {
    /// Value of the `Allow` header, e.g. `GET, HEAD, OPTIONS`.
    pub fn allow(&self) -> &str {
        &self.allow
    }
}

/// Uppercase form of a method token, borrowing when it already is.
fn canonical_method(method: &Method) -> Cow<'_, Method> {
    let token = method.as_str();
    if !token.bytes().any(|b| b.is_ascii_lowercase()) {
        return Cow::Borrowed(method);
    }
    match Method::from_bytes(token.to_ascii_uppercase().as_bytes()) {
        Ok(upper) => Cow::Owned(upper),
        Err(_) => Cow::Borrowed(method),
    }
}

impl Serve for MethodHandler {
    fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        let method = canonical_method(req.method());
        if let Some(handler) = self.handlers.get(method.as_ref()) {
            return handler.try_serve(req, cx, res);
        }
        if let Some(handler) = &self.any {
            return handler.try_serve(req, cx, res);
        }

        if *method == Method::OPTIONS {
            if let Some(allow) = &self.allow_header {
                res.set_header(ALLOW, allow.clone());
            }
            res.set_status(StatusCode::NO_CONTENT);
            return Ok(());
        }

        Err(MethodNotAllowed::new(method.into_owned(), self.allow.clone()).into())
    }
}
