//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum Router that hands every request to a `CompiledRouter`
//! - Wire up tower layers (tracing, timeout, request ID)
//! - Buffer request bodies up to the configured limit
//! - Run synchronous dispatch on the blocking pool
//! - Bind to a listener and shut down gracefully

use std::future::Future;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{RouterConfig, ServerConfig};
use crate::http::request::RequestIdExt;
use crate::router::CompiledRouter;

/// Application state injected into the fallback handler.
#[derive(Clone)]
pub struct AppState {
    pub router: CompiledRouter,
    pub max_body_bytes: usize,
}

/// Serves a compiled router over HTTP.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: &RouterConfig, router: CompiledRouter) -> Self {
        let state = AppState {
            router,
            max_body_bytes: config.server.max_body_bytes,
        };
        Self {
            router: Self::build_router(&config.server, state),
            config: config.server.clone(),
        }
    }

    /// Build the axum Router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The layered axum Router, for embedding or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.request_timeout_secs,
            max_body_bytes = self.config.max_body_bytes,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffer the body, then dispatch through the compiled router.
async fn dispatch(State(state): State<AppState>, request: axum::extract::Request) -> Response {
    let request_id = request.request_id().unwrap_or("unknown").to_string();
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                limit = state.max_body_bytes,
                error = %e,
                "Request body rejected"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let request = axum::http::Request::from_parts(parts, bytes);
    let router = state.router.clone();
    match tokio::task::spawn_blocking(move || router.serve(&request)).await {
        Ok(response) => response.map(Body::from),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Dispatch task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Handler, RouteBuilder};
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut router = RouteBuilder::new();
        router
            .get("/ping", Handler::writer(|_, _, res| res.write("pong")))
            .unwrap();
        HttpServer::new(&RouterConfig::default(), router.build())
    }

    #[tokio::test]
    async fn test_dispatch_through_layers() {
        let request = axum::http::Request::builder()
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        let response = server().into_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(body.as_ref(), b"pong");
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let request = axum::http::Request::builder()
            .uri("/missing")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();
        let response = server().into_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }
}
