//! End-to-end dispatch through compiled routers, without a network.

use std::panic::panic_any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::header::{ACCEPT, ALLOW, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};

use pathmux::error::{Format, RenderOptions};
use pathmux::handler::middleware::recoverer;
use pathmux::routing::Resolution;
use pathmux::{Handler, HttpError, Middleware, Redirect, RouteBuilder};

mod common;

use common::{get, request, text};

/// Writes `prefix|path|pattern|params` of the context it receives.
fn echo() -> Handler {
    Handler::writer(|_, cx, res| {
        let params: Vec<String> = cx
            .params()
            .iter()
            .map(|(name, value)| format!("{name}={}", value.last()))
            .collect();
        res.write(format!(
            "{}|{}|{}|{}",
            cx.prefix(),
            cx.path(),
            cx.pattern(),
            params.join(",")
        ));
    })
}

fn body(text: &'static str) -> Handler {
    Handler::writer(move |_, _, res| res.write(text))
}

#[test]
fn test_literal_route_exact_match() {
    let mut router = RouteBuilder::new();
    router.get("/about/team", echo()).unwrap();
    let router = router.build();

    let response = router.serve(&get("/about/team"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(&response), "/about/team||/about/team|");

    assert_eq!(router.serve(&get("/about/team/x")).status(), StatusCode::NOT_FOUND);
    assert_eq!(router.serve(&get("/about")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_capture_any_token() {
    let mut router = RouteBuilder::new();
    router.get("/users/{id}", echo()).unwrap();
    let router = router.build();

    let response = router.serve(&get("/users/a-b.c"));
    assert_eq!(text(&response), "/users/a-b.c||/users/a-b.c|id=a-b.c");
    assert_eq!(router.serve(&get("/users/a/b")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_capture_options_restrict_values() {
    let mut router = RouteBuilder::new();
    router.get("/v{version:1|2}/status", echo()).unwrap();
    let router = router.build();

    assert_eq!(
        text(&router.serve(&get("/v2/status"))),
        "/v2/status||/v2/status|version=2"
    );
    assert_eq!(router.serve(&get("/v3/status")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_optional_segment() {
    let mut router = RouteBuilder::new();
    router.get("/foo[/bar]", body("foo")).unwrap();
    let router = router.build();

    assert_eq!(router.serve(&get("/foo")).status(), StatusCode::OK);
    assert_eq!(router.serve(&get("/foo/bar")).status(), StatusCode::OK);
    assert_eq!(router.serve(&get("/foo/")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_mount_point_redirect_and_remainder() {
    let mut router = RouteBuilder::new();
    router.handle("/api/*", echo()).unwrap();
    let router = router.build();

    let response = router.serve(&get("/api"));
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/api/");

    let response = router.serve(&get("/api/v1"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(&response), "/api|/v1|/api/*|");

    assert_eq!(router.serve(&get("/apiary")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_literal_beats_capture() {
    let mut router = RouteBuilder::new();
    router.get("/users/{id}", body("by id")).unwrap();
    router.get("/users/me", body("me")).unwrap();
    let router = router.build();

    assert_eq!(text(&router.serve(&get("/users/me"))), "me");
    assert_eq!(text(&router.serve(&get("/users/42"))), "by id");
}

#[test]
fn test_longer_pattern_prefix_beats_mount() {
    let mut router = RouteBuilder::new();
    router.handle("/files/*", body("mount")).unwrap();
    router.get("/files/{name}.txt", body("text file")).unwrap();
    let router = router.build();

    assert_eq!(text(&router.serve(&get("/files/notes.txt"))), "text file");
    assert_eq!(text(&router.serve(&get("/files/notes.md"))), "mount");
}

#[test]
fn test_get_only_method_handling() {
    let mut router = RouteBuilder::new();
    router
        .get(
            "/hello",
            Handler::writer(|_, _, res| {
                res.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                res.write("hello");
            }),
        )
        .unwrap();
    let router = router.build();

    let response = router.serve(&request(Method::HEAD, "/hello"));
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body().is_empty());
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");

    let response = router.serve(&request(Method::OPTIONS, "/hello"));
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers().get(ALLOW).unwrap(), "GET, HEAD, OPTIONS");
    assert!(response.body().is_empty());

    let response = router.serve(&request(Method::POST, "/hello"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get(ALLOW).unwrap(), "GET, HEAD, OPTIONS");
}

#[test]
fn test_panic_with_error_value_keeps_its_status() {
    let mut router = RouteBuilder::new();
    router
        .get(
            "/conflict",
            Handler::writer(|_, _, _| panic_any(HttpError::new(StatusCode::CONFLICT))),
        )
        .unwrap();
    router
        .get(
            "/moved",
            Handler::writer(|_, _, _| panic_any(Redirect::permanent("/new"))),
        )
        .unwrap();
    let router = router.build();

    assert_eq!(router.serve(&get("/conflict")).status(), StatusCode::CONFLICT);

    let response = router.serve(&get("/moved"));
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/new");
}

#[test]
fn test_other_panics_render_500() {
    let mut router = RouteBuilder::new();
    router
        .get(
            "/boom",
            Handler::writer(|_, _, res| {
                res.write("partial");
                panic!("boom");
            }),
        )
        .unwrap();
    let router = router.build();

    let response = router.serve(&get("/boom"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = text(&response);
    assert!(body.starts_with("Internal Server Error (Error 500)\n"), "{body}");
    assert!(body.contains("panic: boom"), "{body}");
    assert!(!body.contains("partial"));
}

#[test]
fn test_recoverer_middleware_inside_router() {
    let mut router = RouteBuilder::new();
    router.use_middleware(recoverer());
    router
        .get("/boom", Handler::writer(|_, _, _| panic!("caught early")))
        .unwrap();
    let router = router.build();

    assert_eq!(
        router.serve(&get("/boom")).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_json_error_body() {
    let mut router = RouteBuilder::new();
    router
        .get(
            "/teapot",
            Handler::new(|_, _, _| {
                Err(HttpError::new(StatusCode::IM_A_TEAPOT)
                    .with_detail("short and stout")
                    .into())
            }),
        )
        .unwrap();
    let router = router.build();

    let mut req = get("/teapot");
    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static("application/json"));
    let response = router.serve(&req);

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(response.headers().get("x-content-type-options").unwrap(), "nosniff");

    let json: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(json["statusCode"], 418);
    assert_eq!(json["error"][0], "short and stout");
}

#[test]
fn test_render_options_hide_stack() {
    let mut router = RouteBuilder::new();
    router.render_options(RenderOptions {
        expose_stack: false,
        expose_causes: false,
        default_format: Format::Json,
    });
    router
        .get("/boom", Handler::writer(|_, _, _| panic!("quiet")))
        .unwrap();
    let router = router.build();

    let response = router.serve(&get("/boom"));
    let json: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(json["statusCode"], 500);
    assert_eq!(json["fatal"], "quiet");
    assert!(json.get("stack").is_none());
}

#[test]
fn test_plain_404_body() {
    let router = RouteBuilder::new().build();
    let response = router.serve(&get("/nowhere"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(&response), "Not Found (Error 404)\n");
}

#[test]
fn test_resolution_is_deterministic() {
    let mut router = RouteBuilder::new();
    router.get("/a/{x}", body("x")).unwrap();
    router.get("/a/{y:one|two}", body("y")).unwrap();
    router.handle("/a/*", body("mount")).unwrap();
    let router = router.build();

    for path in ["/a/one", "/a/three", "/a", "/a/one/two", "/b"] {
        assert_eq!(router.resolve(path), router.resolve(path));
    }
    // Equal-length pattern matches go to the first registered.
    assert_eq!(text(&router.serve(&get("/a/one"))), "x");
    assert!(matches!(router.resolve("/a"), Resolution::Redirect(_)));
}

#[test]
fn test_nested_routers_accumulate_context() {
    let mut router = RouteBuilder::new();
    router
        .route("/orgs/{org}", |org| {
            org.route("/repos", |repos| {
                repos.get("/{repo}", echo())?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
    let router = router.build();

    let response = router.serve(&get("/orgs/rust/repos/regex"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        text(&response),
        "/orgs/rust/repos/regex||/orgs/rust/repos/regex|org=rust,repo=regex"
    );

    let response = router.serve(&get("/orgs/rust/repos?sort=name"));
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/orgs/rust/repos/?sort=name"
    );
}

#[test]
fn test_mounting_a_compiled_router() {
    let mut admin = RouteBuilder::new();
    admin.get("/stats", echo()).unwrap();
    let admin = admin.build();

    let mut router = RouteBuilder::new();
    router.mount("/admin", admin.clone()).unwrap();
    router.mount("/internal/admin", admin).unwrap();
    let router = router.build();

    assert_eq!(
        text(&router.serve(&get("/admin/stats"))),
        "/admin/stats||/admin/stats|"
    );
    assert_eq!(
        text(&router.serve(&get("/internal/admin/stats"))),
        "/internal/admin/stats||/internal/admin/stats|"
    );
}

#[test]
fn test_middleware_order_and_scope() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = {
        let calls = Arc::clone(&calls);
        Middleware::new(move |next| {
            let calls = Arc::clone(&calls);
            Handler::new(move |req, cx, res| {
                calls.fetch_add(1, Ordering::SeqCst);
                next.try_serve(req, cx, res)
            })
        })
    };
    let tagged = Middleware::new(|next| {
        Handler::new(move |req, cx, res| {
            res.set_header(
                HeaderName::from_static("x-tagged"),
                HeaderValue::from_static("yes"),
            );
            next.try_serve(req, cx, res)
        })
    });

    let mut router = RouteBuilder::new();
    router.use_middleware(counted);
    router.with(tagged).get("/tagged", body("t")).unwrap();
    router.get("/plain", body("p")).unwrap();
    let router = router.build();

    let response = router.serve(&get("/tagged"));
    assert_eq!(response.headers().get("x-tagged").unwrap(), "yes");
    let response = router.serve(&get("/plain"));
    assert!(response.headers().get("x-tagged").is_none());
    router.serve(&get("/missing"));

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_walk_lists_nested_routes() {
    let mut router = RouteBuilder::new();
    router.get("/", body("root")).unwrap();
    router.get("/users/{id}", body("user")).unwrap();
    router
        .route("/api", |api| {
            api.get("/status", body("ok"))?;
            api.handle("/echo", echo())?;
            Ok(())
        })
        .unwrap();
    let router = router.build();

    let patterns: Vec<String> = router.routes().into_iter().map(|r| r.pattern).collect();
    assert_eq!(patterns, vec!["/", "/api/echo", "/api/status", "/users/{id}"]);
}

#[test]
#[should_panic(expected = "can't call handle() on a compiled router")]
fn test_registration_after_compile_panics() {
    let mut router = RouteBuilder::new();
    router.get("/", body("root")).unwrap();
    router.compile();
    let _ = router.handle("/late", body("late"));
}

#[test]
fn test_route_middleware_wraps_nested_router() {
    let mut router = RouteBuilder::new();
    router
        .route("/admin", |admin| {
            admin.get("/users", body("users"))?;
            Ok(())
        })
        .unwrap();
    router
        .wrap(
            "/admin/*",
            Middleware::new(|next| {
                Handler::new(move |req, cx, res| {
                    if req.headers().contains_key("x-admin") {
                        next.try_serve(req, cx, res)
                    } else {
                        Err(HttpError::new(StatusCode::FORBIDDEN).into())
                    }
                })
            }),
        )
        .unwrap();
    router.get("/public", body("public")).unwrap();
    let router = router.build();

    assert_eq!(router.serve(&get("/admin/users")).status(), StatusCode::FORBIDDEN);
    assert_eq!(router.serve(&get("/public")).status(), StatusCode::OK);

    let mut req = get("/admin/users");
    req.headers_mut()
        .insert(HeaderName::from_static("x-admin"), HeaderValue::from_static("1"));
    let response = router.serve(&req);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(&response), "users");
}

#[test]
fn test_handler_not_found_is_not_replaced() {
    let mut router = RouteBuilder::new();
    router
        .get("/users/{id}", Handler::new(|_, cx, _| {
            Err(HttpError::not_found()
                .with_detail(format!("user {} does not exist", cx.param("id").unwrap_or_default()))
                .into())
        }))
        .unwrap();
    router.not_found(body("custom miss page"));
    let router = router.build();

    let response = router.serve(&get("/users/42"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(text(&response).contains("user 42 does not exist"));

    let response = router.serve(&get("/nowhere"));
    assert_eq!(text(&response), "custom miss page");
}

#[test]
fn test_lowercase_method_is_routed() {
    let mut router = RouteBuilder::new();
    router.get("/users", body("users")).unwrap();
    let router = router.build();

    let response = router.serve(&request(Method::from_bytes(b"get").unwrap(), "/users"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text(&response), "users");

    let response = router.serve(&request(Method::from_bytes(b"delete").unwrap(), "/users"));
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[ALLOW], "GET, HEAD, OPTIONS");
}

#[test]
fn test_head_mirrors_get_headers() {
    let mut router = RouteBuilder::new();
    router.get("/doc", body("a document body")).unwrap();
    let router = router.build();

    let get_response = router.serve(&get("/doc"));
    let head_response = router.serve(&request(Method::HEAD, "/doc"));
    assert_eq!(head_response.status(), StatusCode::OK);
    assert!(head_response.body().is_empty());
    assert_eq!(
        head_response.headers()["content-length"],
        get_response.body().len().to_string().as_str()
    );

    let missing = router.serve(&request(Method::HEAD, "/missing"));
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert!(missing.body().is_empty());
    assert_eq!(missing.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
}
