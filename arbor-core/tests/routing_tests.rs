//! Integration tests for request routing through `App::handle`

use arbor_core::*;
use serde_json::{Value, json};

async fn text(app: &App, request: HttpRequest) -> (u16, String) {
    let res = app.handle(request).await;
    (res.status, res.text())
}

fn named(label: &'static str) -> impl Fn(Context) -> std::future::Ready<String> + Send + Sync {
    move |ctx: Context| {
        let params: Vec<String> = ctx
            .params()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        std::future::ready(format!("{} {}", label, params.join(",")).trim_end().to_string())
    }
}

#[tokio::test]
async fn test_static_beats_param() {
    let mut app = App::new();
    app.get("/user/:id/profile", named("profile")).unwrap();
    app.get("/user/admin/settings", named("settings")).unwrap();

    assert_eq!(
        text(&app, HttpRequest::get("/user/admin/settings")).await,
        (200, "settings".to_string())
    );
    assert_eq!(
        text(&app, HttpRequest::get("/user/admin/profile")).await,
        (200, "profile id=admin".to_string())
    );
}

#[tokio::test]
async fn test_backtracking_is_deterministic() {
    let mut app = App::new();
    app.get("/a/:x/c", named("first")).unwrap();
    app.get("/a/b/:y", named("second")).unwrap();

    // Static `b` wins at depth 2
    assert_eq!(
        text(&app, HttpRequest::get("/a/b/c")).await,
        (200, "second y=c".to_string())
    );
    // No static `z`, so the param branch binds x
    assert_eq!(
        text(&app, HttpRequest::get("/a/z/c")).await,
        (200, "first x=z".to_string())
    );
}

#[tokio::test]
async fn test_backtracks_out_of_dead_static_branch() {
    let mut app = App::new();
    app.get("/files/special/info", named("info")).unwrap();
    app.get("/files/:name", named("file")).unwrap();

    assert_eq!(
        text(&app, HttpRequest::get("/files/special")).await,
        (200, "file name=special".to_string())
    );
}

#[tokio::test]
async fn test_wildcard_takes_the_rest() {
    let mut app = App::new();
    app.get("/static/*", named("asset")).unwrap();
    app.get("/static/logo.png", named("logo")).unwrap();

    assert_eq!(
        text(&app, HttpRequest::get("/static/css/site.css")).await,
        (200, "asset *=css/site.css".to_string())
    );
    assert_eq!(
        text(&app, HttpRequest::get("/static/logo.png")).await,
        (200, "logo".to_string())
    );
}

#[tokio::test]
async fn test_param_names_come_from_matched_route() {
    let mut app = App::new();
    app.get("/user/:id/x", named("x")).unwrap();
    app.get("/user/:name/y", named("y")).unwrap();

    assert_eq!(text(&app, HttpRequest::get("/user/7/x")).await.1, "x id=7");
    assert_eq!(text(&app, HttpRequest::get("/user/al/y")).await.1, "y name=al");
}

#[tokio::test]
async fn test_params_are_percent_decoded() {
    let mut app = App::new();
    app.get("/tags/:tag", named("tag")).unwrap();

    assert_eq!(
        text(&app, HttpRequest::get("/tags/rust%20lang")).await.1,
        "tag tag=rust lang"
    );
}

#[tokio::test]
async fn test_duplicate_and_trailing_slashes_are_ignored() {
    let mut app = App::new();
    app.get("/users/:id", named("user")).unwrap();

    assert_eq!(text(&app, HttpRequest::get("//users///5/")).await.1, "user id=5");
}

#[tokio::test]
async fn test_all_routes_lose_to_exact_method() {
    let mut app = App::new();
    app.all("/ping", named("any")).unwrap();
    app.get("/ping", named("get")).unwrap();

    assert_eq!(text(&app, HttpRequest::get("/ping")).await.1, "get");
    assert_eq!(text(&app, HttpRequest::delete("/ping")).await.1, "any");
}

#[tokio::test]
async fn test_base_path_is_stripped_on_segment_boundary() {
    let mut app = App::with_config(AppConfig::new().base_path("/api"));
    app.get("/users", named("users")).unwrap();

    assert_eq!(text(&app, HttpRequest::get("/api/users")).await, (200, "users".to_string()));
    assert_eq!(text(&app, HttpRequest::get("/apix/users")).await.0, 404);
    assert_eq!(text(&app, HttpRequest::get("/users")).await.0, 404);
}

#[tokio::test]
async fn test_not_found_with_suggestions_in_development() {
    let mut app = App::new();
    app.get("/users", named("users")).unwrap();
    app.get("/health", named("health")).unwrap();

    let res = app.handle(HttpRequest::get("/user")).await;
    let body: Value = res.body_json().unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["path"], "/user");
    assert_eq!(body["suggestions"], json!(["/users"]));
}

#[tokio::test]
async fn test_suggestions_use_normalized_patterns() {
    let mut app = App::new();
    app.get("/users/", named("users")).unwrap();
    app.get("/health/", named("health")).unwrap();

    let res = app.handle(HttpRequest::get("/user")).await;
    let body: Value = res.body_json().unwrap();
    assert_eq!(body["suggestions"], json!(["/users"]));

    let res = app.handle(HttpRequest::get("/healt")).await;
    let body: Value = res.body_json().unwrap();
    assert_eq!(body["suggestions"], json!(["/health"]));
}

#[tokio::test]
async fn test_no_suggestions_in_production() {
    let mut app = App::with_config(AppConfig::new().mode(Mode::Production));
    app.get("/users", named("users")).unwrap();

    let res = app.handle(HttpRequest::get("/user")).await;
    let body: Value = res.body_json().unwrap();
    assert_eq!(res.status, 404);
    assert!(body.get("suggestions").is_none());
}

#[tokio::test]
async fn test_wrong_method_is_404_by_default() {
    let mut app = App::new();
    app.post("/login", named("login")).unwrap();

    let res = app.handle(HttpRequest::get("/login")).await;
    assert_eq!(res.status, 404);
    assert!(res.header("allow").is_none());
}

#[tokio::test]
async fn test_wrong_method_is_405_when_strict() {
    let mut app = App::with_config(AppConfig::new().strict_methods(true));
    app.post("/login", named("login")).unwrap();
    app.put("/login", named("login")).unwrap();

    let res = app.handle(HttpRequest::get("/login")).await;
    assert_eq!(res.status, 405);
    assert_eq!(res.header("allow"), Some("POST, PUT"));

    // Unknown paths stay 404
    assert_eq!(app.handle(HttpRequest::get("/nope")).await.status, 404);
}

#[tokio::test]
async fn test_unknown_method_is_not_found() {
    let mut app = App::new();
    app.all("/x", named("x")).unwrap();

    let res = app.handle(HttpRequest::new("BREW", "/x")).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn test_custom_not_found_hook() {
    let mut app = App::new();
    app.on_not_found(|ctx| async move {
        Ok(HttpResponse::new(404).with_text(format!("nothing at {}", ctx.path())))
    });

    assert_eq!(
        text(&app, HttpRequest::get("/missing")).await,
        (404, "nothing at /missing".to_string())
    );
}

#[test]
fn test_invalid_patterns_fail_registration() {
    let mut app = App::new();
    let wildcard = app.get("/a/*/b", named("x")).unwrap_err();
    assert!(matches!(wildcard, Error::Pattern(PatternError::WildcardNotLast(_))));

    let empty = app.get("/a/:", named("x")).unwrap_err();
    assert!(matches!(empty, Error::Pattern(PatternError::EmptyParamName(_))));
}
