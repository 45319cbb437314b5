//! Request dispatch over a frozen route tree.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{Method, Response};

use crate::context::RoutingContext;
use crate::error::{recover, render_error, Error, Outcome, Redirect, RenderOptions};
use crate::handler::{compile_chain, CompiledNode, Handler, HandlerResult, Middleware, NodeKind, Serve};
use crate::http::request::RequestIdExt;
use crate::http::{Request, ResponseWriter};
use crate::observability::metrics;
use crate::routing::walk::join_pattern;
use crate::routing::{Resolution, Resolver, RouteInfo, RouteKind, RouteMatch};

/// Compiled nodes and the resolver indexing them.
pub(crate) struct RouteTable {
    resolver: Resolver,
    nodes: Vec<CompiledNode>,
}

impl RouteTable {
    pub(crate) fn new(resolver: Resolver, nodes: Vec<CompiledNode>) -> Self {
        Self { resolver, nodes }
    }
}

/// Innermost handler of a router: resolve, step, call the node.
struct Dispatcher {
    table: Arc<RouteTable>,
    not_found: Option<Handler>,
}

impl Dispatcher {
    fn route(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        match self.table.resolver.resolve(cx.path()) {
            Resolution::Matched(RouteMatch {
                prefix,
                node,
                params,
                ..
            }) => {
                let node = &self.table.nodes[node];
                let next = cx.step(&prefix, params);
                tracing::trace!(
                    pattern = %next.pattern(),
                    prefix = %next.prefix(),
                    path = %next.path(),
                    "route matched"
                );
                node.handler().try_serve(req, &next, res)
            }
            Resolution::Redirect(_) => {
                let mut location = cx.full_path();
                location.push('/');
                if let Some(query) = req.uri().query() {
                    location.push('?');
                    location.push_str(query);
                }
                Err(Redirect::permanent(location).into())
            }
            Resolution::NotFound => Err(Error::route_miss()),
        }
    }
}

impl Serve for Dispatcher {
    fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        match (self.route(req, cx, res), &self.not_found) {
            (Err(err), Some(not_found)) if err.is_route_miss() => {
                res.reset();
                not_found.try_serve(req, cx, res)
            }
            (result, _) => result,
        }
    }
}

/// Immutable router, cheap to clone and share across threads.
#[derive(Clone)]
pub struct CompiledRouter {
    inner: Arc<Inner>,
}

struct Inner {
    table: Arc<RouteTable>,
    /// Router middleware folded around the dispatcher.
    entry: Handler,
    render: RenderOptions,
}

impl CompiledRouter {
    pub(crate) fn new(
        table: RouteTable,
        chain: &[Middleware],
        not_found: Option<Handler>,
        render: RenderOptions,
    ) -> Self {
        let table = Arc::new(table);
        let dispatcher = Dispatcher {
            table: Arc::clone(&table),
            not_found,
        };
        Self {
            inner: Arc::new(Inner {
                table,
                entry: compile_chain(chain, Handler::from_serve(dispatcher)),
                render,
            }),
        }
    }

    /// Number of routes registered at this level.
    pub fn len(&self) -> usize {
        self.inner.table.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.table.nodes.is_empty()
    }

    /// Resolve `path` at this level without dispatching.
    pub fn resolve(&self, path: &str) -> Resolution {
        self.inner.table.resolver.resolve(path)
    }

    /// Dispatch with an existing routing context. Failures are returned,
    /// not rendered, and panics propagate.
    pub fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        self.inner.entry.try_serve(req, cx, res)
    }

    /// Dispatch a request from the top, behind a recovery boundary.
    pub fn dispatch(&self, req: &Request, res: &mut ResponseWriter) -> Outcome {
        let cx = RoutingContext::new(req.uri().path());
        Outcome::from(recover(|| self.try_serve(req, &cx, res)))
    }

    /// Dispatch and render: the full request → response cycle.
    pub fn serve(&self, req: &Request) -> Response<Bytes> {
        let started = Instant::now();
        let mut res = ResponseWriter::new();
        let outcome = self.dispatch(req, &mut res);
        let label = outcome.label();

        let request_id = req.request_id().unwrap_or("-");
        match &outcome {
            Outcome::Panicked(panic) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %req.method(),
                    path = %req.uri().path(),
                    panic = %panic.message(),
                    frames = panic.stack().len(),
                    "handler panicked"
                );
                metrics::record_panic();
            }
            Outcome::Failed(err) if err.status().is_server_error() => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %req.method(),
                    path = %req.uri().path(),
                    error = %err,
                    "handler failed"
                );
            }
            _ => {}
        }

        if let Some(err) = outcome.into_error() {
            render_error(&err, req, &mut res, &self.inner.render);
            if req.method() == Method::HEAD {
                res.strip_body();
            }
        }

        tracing::debug!(
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path(),
            status = res.status().as_u16(),
            outcome = label,
            "request dispatched"
        );
        metrics::record_request(req.method().as_str(), res.status().as_u16(), label, started);

        res.into_response()
    }

    /// Visit every route, nested routers included, until `f` returns `true`.
    /// Returns whether the walk was stopped early.
    pub fn walk<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&RouteInfo) -> bool,
    {
        self.walk_under("", &mut f)
    }

    /// Every route, in walk order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut routes = Vec::new();
        self.walk(|route| {
            routes.push(route.clone());
            false
        });
        routes
    }

    fn walk_under(&self, mount: &str, f: &mut dyn FnMut(&RouteInfo) -> bool) -> bool {
        for index in self.inner.table.resolver.order() {
            let node = &self.inner.table.nodes[index];
            let pattern = join_pattern(mount, node.pattern().pattern());

            let kind = match node.kind() {
                NodeKind::Router(nested) => {
                    if nested.walk_under(&pattern, f) {
                        return true;
                    }
                    continue;
                }
                NodeKind::Empty => RouteKind::Empty,
                NodeKind::Handler => RouteKind::Handler,
                NodeKind::Methods { allow } => RouteKind::Methods {
                    allow: allow.clone(),
                },
            };

            if f(&RouteInfo { pattern, kind }) {
                return true;
            }
        }
        false
    }
}

impl Serve for CompiledRouter {
    fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        CompiledRouter::try_serve(self, req, cx, res)
    }
}

impl fmt::Debug for CompiledRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRouter")
            .field("routes", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::router::RouteBuilder;
    use axum::http::header::LOCATION;
    use axum::http::StatusCode;

    fn get(path: &str) -> Request {
        axum::http::Request::builder().uri(path).body(Bytes::new()).unwrap()
    }

    fn echo_context() -> Handler {
        Handler::writer(|_, cx, res| {
            res.write(format!("{}|{}|{}", cx.prefix(), cx.path(), cx.pattern()));
        })
    }

    #[test]
    fn test_nested_context() {
        let mut router = RouteBuilder::new();
        router
            .route("/api", |api| {
                api.get("/users/{id}", echo_context())?;
                Ok(())
            })
            .unwrap();
        let router = router.build();

        let response = router.serve(&get("/api/users/7"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.body().as_ref(),
            b"/api/users/7||/api/users/7".as_slice()
        );
    }

    #[test]
    fn test_mount_redirect_keeps_query() {
        let mut router = RouteBuilder::new();
        router
            .route("/api", |api| {
                api.get("/", echo_context())?;
                Ok(())
            })
            .unwrap();
        let router = router.build();

        let response = router.serve(&get("/api?page=2"));
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/api/?page=2");
    }

    #[test]
    fn test_not_found_handler() {
        let mut router = RouteBuilder::new();
        router.get("/", echo_context()).unwrap();
        router.not_found(Handler::writer(|_, _, res| {
            res.set_status(StatusCode::NOT_FOUND);
            res.write("nothing here");
        }));
        let router = router.build();

        let response = router.serve(&get("/missing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"nothing here".as_slice());
    }

    #[test]
    fn test_handler_404_bypasses_not_found_handler() {
        let mut router = RouteBuilder::new();
        router
            .get("/users/{id}", Handler::new(|_, _, _| {
                Err(HttpError::not_found().with_detail("no such user").into())
            }))
            .unwrap();
        router
            .route("/api", |api| {
                api.get("/", echo_context())?;
                Ok(())
            })
            .unwrap();
        router.not_found(Handler::writer(|_, _, res| {
            res.set_status(StatusCode::NOT_FOUND);
            res.write("nothing here");
        }));
        let router = router.build();

        let mut res = ResponseWriter::new();
        let outcome = router.dispatch(&get("/users/9"), &mut res);
        let Outcome::Failed(Error::Http(err)) = outcome else {
            panic!("expected the handler's 404");
        };
        assert_eq!(err.details(), ["no such user".to_string()]);

        // a miss inside the nested router still reaches the fallback
        let response = router.serve(&get("/api/missing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_ref(), b"nothing here".as_slice());
    }

    #[test]
    fn test_head_error_has_no_body() {
        let mut router = RouteBuilder::new();
        router
            .get("/gone", Handler::new(|_, _, _| Err(HttpError::new(StatusCode::GONE).into())))
            .unwrap();
        let router = router.build();

        let head = |path: &str| {
            axum::http::Request::builder()
                .method(Method::HEAD)
                .uri(path)
                .body(Bytes::new())
                .unwrap()
        };

        let get_response = router.serve(&get("/gone"));
        let response = router.serve(&head("/gone"));
        assert_eq!(response.status(), StatusCode::GONE);
        assert!(response.body().is_empty());
        assert_eq!(
            response.headers()["content-length"],
            get_response.body().len().to_string().as_str()
        );

        let response = router.serve(&head("/missing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_router_middleware_wraps_misses() {
        let mut router = RouteBuilder::new();
        router.use_middleware(Middleware::new(|next| {
            Handler::new(move |req, cx, res| {
                res.set_header(
                    axum::http::HeaderName::from_static("x-seen"),
                    axum::http::HeaderValue::from_static("1"),
                );
                next.try_serve(req, cx, res)
            })
        }));
        let router = router.build();

        let response = router.serve(&get("/nothing"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-seen").unwrap(), "1");
    }

    #[test]
    fn test_walk_stops_early() {
        let mut router = RouteBuilder::new();
        router.get("/a", echo_context()).unwrap();
        router.get("/b", echo_context()).unwrap();
        router.get("/c", echo_context()).unwrap();
        let router = router.build();

        let mut seen = Vec::new();
        let stopped = router.walk(|route| {
            seen.push(route.pattern.clone());
            route.pattern == "/b"
        });
        assert!(stopped);
        assert_eq!(seen, vec!["/a", "/b"]);
    }
}
