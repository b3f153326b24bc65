//! Validation, hooks, error handling and concurrency through the full pipeline

use arbor_core::*;
use arbor_validation::Schema;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Log = Arc<Mutex<Vec<String>>>;

fn user_app(calls: Arc<AtomicUsize>) -> App {
    let mut app = App::new();
    app.post_with(
        "/user",
        move |ctx: Context| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                ctx.body_value().map(Json)
            }
        },
        RouteOptions::new().body(Schema::object([
            ("name", Schema::string().min_length(1)),
            ("age", Schema::integer().minimum(0.0)),
        ])),
    )
    .unwrap();
    app
}

fn post_json(uri: &str, body: Value) -> HttpRequest {
    HttpRequest::post(uri).with_json(&body).unwrap()
}

// ========== Validation ==========

#[tokio::test]
async fn test_body_is_coerced_before_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = user_app(Arc::clone(&calls));

    let res = app
        .handle(post_json("/user", json!({"name": "Al", "age": "25"})))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body_json::<Value>().unwrap(), json!({"name": "Al", "age": 25}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_body_never_reaches_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = user_app(Arc::clone(&calls));

    let res = app
        .handle(post_json("/user", json!({"name": "Al", "age": "x"})))
        .await;
    let body: Value = res.body_json().unwrap();

    assert_eq!(res.status, 400);
    assert_eq!(body["error"], "Validation Error");
    assert_eq!(body["details"].as_array().unwrap().len(), 1);
    assert_eq!(body["details"][0]["field"], "age");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_body_is_reported() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = user_app(Arc::clone(&calls));

    let res = app.handle(HttpRequest::post("/user")).await;
    let body: Value = res.body_json().unwrap();

    assert_eq!(res.status, 400);
    assert_eq!(body["details"][0]["field"], "body");
    assert_eq!(body["details"][0]["received"], "missing");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_binary_body_is_unsupported() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = user_app(Arc::clone(&calls));

    let request = HttpRequest::post("/user")
        .with_header("content-type", "application/octet-stream")
        .with_body(vec![0u8, 159, 146, 150]);
    let res = app.handle(request).await;
    let body: Value = res.body_json().unwrap();

    assert_eq!(res.status, 415);
    assert_eq!(body["error"], "Unsupported Media Type");
    assert_eq!(
        body["message"],
        "cannot validate a application/octet-stream body"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_params_checked_before_body() {
    let mut app = App::new();
    app.put_with(
        "/items/:id",
        |_ctx: Context| async { "updated" },
        RouteOptions::new()
            .params(Schema::object([("id", Schema::integer())]))
            .body(Schema::object([("qty", Schema::integer())])),
    )
    .unwrap();

    let res = app
        .handle(
            HttpRequest::put("/items/abc")
                .with_json(&json!({"qty": "many"}))
                .unwrap(),
        )
        .await;
    let body: Value = res.body_json().unwrap();

    assert_eq!(res.status, 400);
    assert_eq!(body["details"].as_array().unwrap().len(), 1);
    assert_eq!(body["details"][0]["field"], "id");
}

#[tokio::test]
async fn test_query_defaults_and_coercion() {
    let mut app = App::new();
    app.get_with(
        "/list",
        |ctx: Context| async move { Json(ctx.query_value()) },
        RouteOptions::new().query(Schema::object([
            ("page", Schema::integer().minimum(1.0).default(1)),
            ("q", Schema::string().optional()),
        ])),
    )
    .unwrap();

    let res = app.handle(HttpRequest::get("/list")).await;
    assert_eq!(res.body_json::<Value>().unwrap(), json!({"page": 1}));

    let res = app.handle(HttpRequest::get("/list?page=3&q=tea")).await;
    assert_eq!(res.body_json::<Value>().unwrap(), json!({"page": 3, "q": "tea"}));

    let res = app.handle(HttpRequest::get("/list?page=0")).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn test_validation_failure_skips_hooks() {
    let log: Log = Arc::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut app = user_app(calls);

    let before_log = Arc::clone(&log);
    app.on_before_handle(move |_ctx| {
        let log = Arc::clone(&before_log);
        async move {
            log.lock().push("before".into());
            Ok(None)
        }
    });
    let after_log = Arc::clone(&log);
    app.on_after_handle(move |_ctx, res| {
        let log = Arc::clone(&after_log);
        async move {
            log.lock().push("after".into());
            Ok(res)
        }
    });

    let res = app.handle(post_json("/user", json!({"age": 3}))).await;
    assert_eq!(res.status, 400);
    assert!(log.lock().is_empty());
}

// ========== Hooks ==========

#[tokio::test]
async fn test_hook_order() {
    let log: Log = Arc::default();
    let mut app = App::new();

    fn push(
        log: &Log,
        label: &'static str,
    ) -> impl Fn(Context) -> BoxFuture<'static, Result<Option<HttpResponse>, Error>> + Send + Sync + 'static
    {
        let log = Arc::clone(log);
        move |_ctx: Context| -> BoxFuture<'static, Result<Option<HttpResponse>, Error>> {
            log.lock().push(label.to_string());
            Box::pin(async { Ok(None) })
        }
    }
    fn push_after(
        log: &Log,
        label: &'static str,
    ) -> impl Fn(Context, HttpResponse) -> BoxFuture<'static, Result<HttpResponse, Error>> + Send + Sync + 'static
    {
        let log = Arc::clone(log);
        move |_ctx: Context, res: HttpResponse| -> BoxFuture<'static, Result<HttpResponse, Error>> {
            log.lock().push(label.to_string());
            Box::pin(async move { Ok(res) })
        }
    }

    app.on_before_handle(push(&log, "global before"));
    app.on_after_handle(push_after(&log, "global after"));
    let handler_log = Arc::clone(&log);
    app.get_with(
        "/hooks",
        move |_ctx: Context| {
            handler_log.lock().push("handler".into());
            async { "done" }
        },
        RouteOptions::new()
            .before_handle(push(&log, "route before"))
            .after_handle(push_after(&log, "route after")),
    )
    .unwrap();

    let res = app.handle(HttpRequest::get("/hooks")).await;
    assert_eq!(res.text(), "done");
    assert_eq!(
        *log.lock(),
        vec![
            "global before",
            "route before",
            "handler",
            "global after",
            "route after"
        ]
    );
}

#[tokio::test]
async fn test_before_hook_response_still_runs_after_hooks() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    app.on_before_handle(|ctx: Context| async move {
        if ctx.header("authorization").is_none() {
            return Ok(Some(HttpResponse::new(401).with_text("login first")));
        }
        Ok(None)
    });
    app.on_after_handle(|_ctx, res: HttpResponse| async move {
        Ok(res.with_header("x-trace", "1"))
    });

    let handler_calls = Arc::clone(&calls);
    app.get("/me", move |_ctx: Context| {
        handler_calls.fetch_add(1, Ordering::SeqCst);
        async { "me" }
    })
    .unwrap();

    let res = app.handle(HttpRequest::get("/me")).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.header("x-trace"), Some("1"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_route_before_hook_can_respond() {
    let mut app = App::new();
    app.get_with(
        "/maintenance",
        |_ctx: Context| async { "unreachable" },
        RouteOptions::new().before_handle(|_ctx| async {
            Ok(Some(HttpResponse::new(503).with_text("down")))
        }),
    )
    .unwrap();

    let res = app.handle(HttpRequest::get("/maintenance")).await;
    assert_eq!(res.status, 503);
    assert_eq!(res.text(), "down");
}

#[tokio::test]
async fn test_hooks_share_request_store() {
    let mut app = App::new();
    app.on_before_handle(|ctx: Context| async move {
        ctx.set("user", "al".to_string());
        Ok(None)
    });
    app.get("/whoami", |ctx: Context| async move {
        ctx.get::<String>("user")
            .map(|user| user.as_str().to_string())
            .unwrap_or_default()
    })
    .unwrap();

    assert_eq!(app.handle(HttpRequest::get("/whoami")).await.text(), "al");
}

// ========== Errors ==========

#[tokio::test]
async fn test_handler_error_default_response() {
    let mut app = App::new();
    app.get("/conflict", |_ctx: Context| async {
        Err::<String, _>(Error::Conflict("email taken".into()))
    })
    .unwrap();
    app.get("/broken", |_ctx: Context| async {
        Err::<String, _>(Error::Internal("db password leaked".into()))
    })
    .unwrap();

    let res = app.handle(HttpRequest::get("/conflict")).await;
    assert_eq!(res.status, 409);
    assert_eq!(
        res.body_json::<Value>().unwrap(),
        json!({"error": "Conflict", "message": "email taken"})
    );

    let res = app.handle(HttpRequest::get("/broken")).await;
    assert_eq!(res.status, 500);
    assert_eq!(
        res.body_json::<Value>().unwrap(),
        json!({"error": "Internal Server Error"})
    );
}

#[tokio::test]
async fn test_first_error_hook_response_wins() {
    let third_calls = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    app.on_error(|_ctx, _err| async { Ok(None) });
    app.on_error(|_ctx, err: Arc<Error>| async move {
        Ok(Some(
            HttpResponse::new(418).with_text(format!("caught: {}", err)),
        ))
    });
    let third = Arc::clone(&third_calls);
    app.on_error(move |_ctx, _err| {
        third.fetch_add(1, Ordering::SeqCst);
        async { Ok(Some(HttpResponse::new(500))) }
    });
    app.get("/fail", |_ctx: Context| async {
        Err::<String, _>(Error::BadRequest("nope".into()))
    })
    .unwrap();

    let res = app.handle(HttpRequest::get("/fail")).await;
    assert_eq!(res.status, 418);
    assert_eq!(res.text(), "caught: Bad Request: nope");
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_error_hook_gives_bare_500() {
    let mut app = App::new();
    app.on_error(|_ctx, _err| async { Err(Error::Internal("hook broke".into())) });
    app.get("/fail", |_ctx: Context| async {
        Err::<String, _>(Error::Forbidden("no".into()))
    })
    .unwrap();

    let res = app.handle(HttpRequest::get("/fail")).await;
    assert_eq!(res.status, 500);
    assert!(!res.text().contains("hook broke"));
}

#[tokio::test]
async fn test_handler_panic_becomes_500() {
    let mut app = App::new();
    app.get("/panic", |_ctx: Context| async {
        if true {
            panic!("handler exploded");
        }
        "never"
    })
    .unwrap();
    app.get("/fine", |_ctx: Context| async { "fine" }).unwrap();

    let res = app.handle(HttpRequest::get("/panic")).await;
    assert_eq!(res.status, 500);
    assert_eq!(
        res.body_json::<Value>().unwrap(),
        json!({"error": "Internal Server Error"})
    );

    // The app keeps serving
    assert_eq!(app.handle(HttpRequest::get("/fine")).await.text(), "fine");
}

#[tokio::test]
async fn test_error_hook_sees_panics() {
    let mut app = App::new();
    app.on_error(|_ctx, err: Arc<Error>| async move {
        let is_panic = matches!(*err, Error::Panic(_));
        Ok(is_panic.then(|| HttpResponse::new(500).with_text("recovered")))
    });
    app.get("/panic", |_ctx: Context| async {
        if true {
            panic!("boom");
        }
        "never"
    })
    .unwrap();

    assert_eq!(app.handle(HttpRequest::get("/panic")).await.text(), "recovered");
}

#[tokio::test]
async fn test_after_hook_error_goes_to_error_path() {
    let mut app = App::new();
    app.on_after_handle(|_ctx, _res| async {
        Err(Error::ServiceUnavailable("draining".into()))
    });
    app.get("/", |_ctx: Context| async { "home" }).unwrap();

    let res = app.handle(HttpRequest::get("/")).await;
    assert_eq!(res.status, 503);
}

// ========== Response builder ==========

#[tokio::test]
async fn test_status_and_headers_from_context() {
    let mut app = App::new();
    app.post("/items", |ctx: Context| async move {
        ctx.set_status(201);
        ctx.set_header("location", "/items/9");
        Json(json!({"id": 9}))
    })
    .unwrap();

    let res = app.handle(HttpRequest::post("/items")).await;
    assert_eq!(res.status, 201);
    assert_eq!(res.header("location"), Some("/items/9"));
    assert_eq!(res.body_json::<Value>().unwrap(), json!({"id": 9}));
}

#[tokio::test]
async fn test_response_headers_win_over_context_headers() {
    let mut app = App::new();
    app.get("/h", |ctx: Context| async move {
        ctx.set_header("x-source", "context");
        ctx.set_header("x-extra", "kept");
        HttpResponse::ok().with_header("x-source", "response")
    })
    .unwrap();

    let res = app.handle(HttpRequest::get("/h")).await;
    assert_eq!(res.header("x-source"), Some("response"));
    assert_eq!(res.header("x-extra"), Some("kept"));
}

// ========== State ==========

#[tokio::test]
async fn test_state_and_decorators() {
    let mut app = App::new();
    app.set_state("hits", AtomicUsize::new(0));
    app.decorate("greeting", "hello".to_string());
    app.get("/greet/:name", |ctx: Context| async move {
        if let Some(hits) = ctx.state::<AtomicUsize>("hits") {
            hits.fetch_add(1, Ordering::SeqCst);
        }
        let greeting = ctx.decorator::<String>("greeting").ok_or_else(|| {
            Error::Internal("greeting decorator missing".into())
        })?;
        Ok::<_, Error>(format!("{} {}", greeting, ctx.param("name").unwrap_or_default()))
    })
    .unwrap();

    assert_eq!(app.handle(HttpRequest::get("/greet/al")).await.text(), "hello al");
    app.handle(HttpRequest::get("/greet/bo")).await;
    assert_eq!(
        app.state::<AtomicUsize>("hits").unwrap().load(Ordering::SeqCst),
        2
    );
}

// ========== Concurrency ==========

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_are_isolated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let passes = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    let middleware_passes = Arc::clone(&passes);
    app.use_middleware(from_fn(move |ctx: Context, next: Next| {
        let passes = Arc::clone(&middleware_passes);
        async move {
            passes.fetch_add(1, Ordering::SeqCst);
            next.run(ctx).await
        }
    }));
    let handler_calls = Arc::clone(&calls);
    app.get_with(
        "/echo/:id",
        move |ctx: Context| {
            let calls = Arc::clone(&handler_calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                ctx.set_header("x-id", &ctx.params_value()["id"].to_string());
                Json(ctx.params_value())
            }
        },
        RouteOptions::new().params(Schema::object([("id", Schema::integer())])),
    )
    .unwrap();
    app.compile().unwrap();

    let app = Arc::new(app);
    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let res = app.handle(HttpRequest::get(format!("/echo/{}", i))).await;
                (i, res)
            })
        })
        .collect();

    for task in tasks {
        let (i, res) = task.await.unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body_json::<Value>().unwrap(), json!({"id": i}));
        assert_eq!(res.header("x-id"), Some(i.to_string().as_str()));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 100);
    assert_eq!(passes.load(Ordering::SeqCst), 100);
}
