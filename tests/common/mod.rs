//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{Method, Response};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use pathmux::config::RouterConfig;
use pathmux::{CompiledRouter, HttpServer, Request};

/// Build a buffered request.
#[allow(dead_code)]
pub fn request(method: Method, uri: &str) -> Request {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request {
    request(Method::GET, uri)
}

/// Response body as UTF-8 text.
#[allow(dead_code)]
pub fn text(response: &Response<Bytes>) -> String {
    String::from_utf8(response.body().to_vec()).unwrap()
}

/// A server running on an ephemeral port; dropped → shut down.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Serve `router` on 127.0.0.1 with an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_server(config: RouterConfig, router: CompiledRouter) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = HttpServer::new(&config, router);
    tokio::spawn(async move {
        let _ = server
            .run_until(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        addr,
        shutdown: Some(tx),
    }
}
