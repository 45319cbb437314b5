//! pathmux demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum fallback ──▶ CompiledRouter::serve ──▶ node handler
//!                      (tower layers)     (recover, resolve,        (or nested
//!                                          step, render)             router)
//!     Client Response
//!     ◀────────────── buffered ResponseWriter
//! ```
//!
//! Run with `--routes` to print the route table and exit.

use std::path::PathBuf;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use clap::Parser;
use tokio::net::TcpListener;

use pathmux::config::{load_config, RouterConfig};
use pathmux::error::RenderOptions;
use pathmux::handler::middleware::recoverer;
use pathmux::observability::{logging, metrics};
use pathmux::{CompiledRouter, Handler, HttpError, HttpServer, Middleware, RouteBuilder, RouteError};

#[derive(Parser, Debug)]
#[command(name = "pathmux", version, about = "Nested HTTP path router demo server")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the route table and exit.
    #[arg(long)]
    routes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("pathmux v{} starting", env!("CARGO_PKG_VERSION"));

    let router = demo_router(&config)?;

    if cli.routes {
        for route in router.routes() {
            println!("{route}");
        }
        return Ok(());
    }

    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        routes = router.routes().len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(&config, router);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_router(config: &RouterConfig) -> Result<CompiledRouter, RouteError> {
    let mut router = RouteBuilder::new();
    router
        .use_middleware(recoverer())
        .use_middleware(server_header())
        .render_options(RenderOptions::from(&config.errors));

    router.get("/", Handler::writer(|_, _, res| res.write("pathmux\n")))?;
    router.get("/users/me", Handler::writer(|_, _, res| res.write("it's you\n")))?;
    router.get(
        "/users/{id}",
        Handler::new(|_, cx, res| {
            let id: u64 = cx
                .params()
                .parse("id")
                .map_err(|e| HttpError::bad_request(e.to_string()))?;
            res.write(format!("user {id}\n"));
            Ok(())
        }),
    )?;
    router.get(
        "/files/{name}.txt",
        Handler::writer(|_, cx, res| {
            res.write(format!("file {}\n", cx.param("name").unwrap_or_default()));
        }),
    )?;
    router.get(
        "/teapot",
        Handler::new(|_, _, _| {
            Err(HttpError::new(StatusCode::IM_A_TEAPOT)
                .with_detail("short and stout")
                .into())
        }),
    )?;
    router.get("/panic", Handler::writer(|_, _, _| panic!("demo panic")))?;

    router.route("/api", |api| {
        api.get(
            "/v{version:1|2}/status",
            Handler::writer(|_, cx, res| {
                res.write(format!(
                    "api v{} ok ({})\n",
                    cx.param("version").unwrap_or_default(),
                    cx.pattern()
                ));
            }),
        )?;
        api.get(
            "/archive[/{year}]",
            Handler::writer(|_, cx, res| match cx.param("year") {
                Some(year) => res.write(format!("archive {year}\n")),
                None => res.write("archive\n"),
            }),
        )?;
        Ok(())
    })?;

    router.not_found(Handler::writer(|req, _, res| {
        res.set_status(StatusCode::NOT_FOUND);
        res.write(format!("no route for {}\n", req.uri().path()));
    }));

    Ok(router.build())
}

fn server_header() -> Middleware {
    Middleware::new(|next| {
        Handler::new(move |req, cx, res| {
            res.set_header(
                HeaderName::from_static("x-powered-by"),
                HeaderValue::from_static("pathmux"),
            );
            next.try_serve(req, cx, res)
        })
    })
}
