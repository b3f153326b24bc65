//! Plugin registration

use arbor_core::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_test::assert_ok;

struct Health;

impl Plugin for Health {
    fn name(&self) -> &str {
        "health"
    }

    fn setup(&self, app: &mut App) -> Result<(), Error> {
        app.get("/health", |_ctx: Context| async { "healthy" })?;
        Ok(())
    }
}

struct Metrics {
    setups: Arc<AtomicUsize>,
}

impl Plugin for Metrics {
    fn name(&self) -> &str {
        "metrics"
    }

    fn dependencies(&self) -> Vec<&str> {
        vec!["health"]
    }

    fn setup(&self, app: &mut App) -> Result<(), Error> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        app.set_state("requests", AtomicUsize::new(0));
        app.on_before_handle(|ctx: Context| async move {
            if let Some(counter) = ctx.state::<AtomicUsize>("requests") {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(None)
        });
        app.get("/metrics", |ctx: Context| async move {
            let count = ctx
                .state::<AtomicUsize>("requests")
                .map(|c| c.load(Ordering::SeqCst))
                .unwrap_or_default();
            format!("requests {}", count)
        })?;
        Ok(())
    }
}

#[test]
fn test_missing_dependency_is_rejected() {
    let mut app = App::new();
    let err = app
        .register(Metrics {
            setups: Arc::default(),
        })
        .unwrap_err();

    match err {
        Error::PluginDependency { plugin, missing } => {
            assert_eq!(plugin, "metrics");
            assert_eq!(missing, "health");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!app.has_plugin("metrics"));
    assert!(app.routes().is_empty());
}

#[test]
fn test_registration_is_idempotent() {
    let setups = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    assert_ok!(app.register(Health));
    assert_ok!(app.register(Metrics {
        setups: Arc::clone(&setups),
    }));
    assert_ok!(app.register(Metrics {
        setups: Arc::clone(&setups),
    }));
    assert_ok!(app.register(Health));

    assert_eq!(setups.load(Ordering::SeqCst), 1);
    assert_eq!(app.plugins(), ["health", "metrics"]);
    assert_eq!(app.routes().len(), 2);
}

#[tokio::test]
async fn test_plugin_routes_and_hooks_are_live() {
    let mut app = App::new();
    app.register(Health).unwrap();
    app.register(Metrics {
        setups: Arc::default(),
    })
    .unwrap();

    assert_eq!(app.handle(HttpRequest::get("/health")).await.text(), "healthy");
    assert_eq!(
        app.handle(HttpRequest::get("/metrics")).await.text(),
        "requests 2"
    );
}

#[tokio::test]
async fn test_closure_plugin_with_decorator() {
    let mut app = App::new();
    app.register(plugin("greeter", |app: &mut App| {
        app.decorate("greeting", "hi".to_string());
        app.get("/hello/:name", |ctx: Context| async move {
            let greeting = ctx
                .decorator::<String>("greeting")
                .map(|g| g.as_str().to_string())
                .unwrap_or_default();
            format!("{} {}", greeting, ctx.param("name").unwrap_or_default())
        })?;
        Ok(())
    }))
    .unwrap();

    assert!(app.has_plugin("greeter"));
    assert_eq!(app.decorator::<String>("greeting").as_deref().map(String::as_str), Some("hi"));
    assert_eq!(app.handle(HttpRequest::get("/hello/bo")).await.text(), "hi bo");
}

#[test]
fn test_closure_plugin_dependencies() {
    let mut app = App::new();
    let needs_db = plugin("repo", |_app: &mut App| Ok(())).depends_on("db");
    assert!(matches!(
        app.register(needs_db),
        Err(Error::PluginDependency { .. })
    ));

    assert_ok!(app.register(plugin("db", |_app: &mut App| Ok(()))));
    assert_ok!(app.register(plugin("repo", |_app: &mut App| Ok(())).depends_on("db")));
    assert_eq!(app.plugins(), ["db", "repo"]);
}

#[test]
fn test_failing_setup_is_not_recorded() {
    let mut app = App::new();
    let err = app
        .register(plugin("broken", |_app: &mut App| {
            Err(Error::Internal("cannot connect".into()))
        }))
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
    assert!(!app.has_plugin("broken"));
}
