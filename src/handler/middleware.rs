//! Middleware composition.

use std::fmt;
use std::sync::Arc;

use crate::error::recover;
use crate::handler::Handler;

/// Wraps a handler into a new handler.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Handler) -> Handler + Send + Sync>);

impl Middleware {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn wrap(&self, next: Handler) -> Handler {
        (self.0)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// Fold `chain` around `handler`; `chain[0]` ends up outermost.
pub fn compile_chain(chain: &[Middleware], handler: Handler) -> Handler {
    chain
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware.wrap(next))
}

/// Recovery boundary at this layer: panics below it become `Error`s.
pub fn recoverer() -> Middleware {
    Middleware::new(|next| Handler::new(move |req, cx, res| recover(|| next.try_serve(req, cx, res))))
}
