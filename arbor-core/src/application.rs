// Application: route registration, hooks, state and plugins

use crate::compiler::StaticTable;
use crate::config::AppConfig;
use crate::context::Shared;
use crate::handler::BoxedHandler;
use crate::hooks::{after_hook, before_hook, error_hook, not_found_hook, GlobalHooks};
use crate::logging::{debug, info, warn};
use crate::pattern::{split_path, RoutePattern};
use crate::plugin::Plugin;
use crate::route::{RouteEntry, RouteOptions, RouteRegistrar};
use crate::route_group::{RouteGroup, Scope};
use crate::router::Router;
use crate::{Context, Error, HttpMethod, HttpResponse, Middleware};
use std::future::Future;
use std::sync::Arc;

/// An Arbor application.
///
/// Routes, middleware, hooks and plugins are registered on a mutable
/// `App`; requests are then served through [`App::handle`] (or
/// [`App::listen`]) on a shared reference.
///
/// ```
/// use arbor_core::{App, Context, HttpRequest, MethodRoutes};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), arbor_core::Error> {
/// let mut app = App::new();
/// app.get("/user/:id", |ctx: Context| async move {
///     json!({ "id": ctx.param("id") })
/// })?;
/// app.compile()?;
///
/// let res = app.handle(HttpRequest::get("/user/123")).await;
/// assert_eq!(res.status, 200);
/// assert_eq!(res.text(), r#"{"id":"123"}"#);
/// # Ok(())
/// # }
/// ```
pub struct App {
    pub(crate) config: AppConfig,
    pub(crate) router: Router<RouteEntry>,
    pub(crate) static_table: StaticTable<RouteEntry>,
    entries: Vec<Arc<RouteEntry>>,
    generation: u64,
    compiled_generation: Option<u64>,
    pub(crate) global_middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) scoped_middleware: Vec<(Vec<String>, Arc<dyn Middleware>)>,
    pub(crate) hooks: GlobalHooks,
    pub(crate) shared: Arc<Shared>,
    plugins: Vec<String>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("routes", &self.router.len())
            .field("compiled", &self.is_compiled())
            .field("middleware", &self.global_middleware.len())
            .field("plugins", &self.plugins)
            .finish()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::with_config(AppConfig::default())
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            static_table: StaticTable::default(),
            entries: Vec::new(),
            generation: 0,
            compiled_generation: None,
            global_middleware: Vec::new(),
            scoped_middleware: Vec::new(),
            hooks: GlobalHooks::default(),
            shared: Arc::new(Shared::default()),
            plugins: Vec::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub(crate) fn insert_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: BoxedHandler,
        options: RouteOptions,
        group_middleware: &[Arc<dyn Middleware>],
    ) -> Result<(), Error> {
        let pattern = RoutePattern::parse(path)?;
        let entry = RouteEntry::new(
            method,
            pattern.raw().to_string(),
            handler,
            options,
            group_middleware,
        );

        let entry = match self.router.insert(method, pattern, entry) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(method = %method, pattern = path, "Duplicate route rejected");
                return Err(err);
            }
        };

        if self.compiled_generation.is_some() && self.config.warns_late_routes() {
            warn!(
                method = %method,
                pattern = path,
                "Route registered after compile(); served by trie lookup until the next compile()"
            );
        }
        debug!(method = %method, pattern = path, "Registered route");

        self.entries.push(entry);
        self.generation += 1;
        Ok(())
    }

    /// Middleware run for every matched request, in registration order
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.global_middleware.push(Arc::new(middleware));
        self
    }

    /// Middleware for requests whose path is `path` or below it.
    ///
    /// Matching is by whole segments: `/api` covers `/api/users` but not
    /// `/apix`. Runs after global middleware.
    pub fn use_at(&mut self, path: &str, middleware: impl Middleware + 'static) -> &mut Self {
        let segments = split_path(path).iter().map(|s| s.to_string()).collect();
        self.scoped_middleware.push((segments, Arc::new(middleware)));
        self
    }

    /// Register routes under a common prefix and middleware
    pub fn group<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<(), Error>,
    {
        let group = RouteGroup::new().prefix(prefix);
        f(&mut Scope::new(self, group))?;
        Ok(self)
    }

    // ========== Hooks ==========

    /// Runs before middleware. Returning a response skips the handler;
    /// after hooks still run on it.
    pub fn on_before_handle<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<HttpResponse>, Error>> + Send + 'static,
    {
        self.hooks.before.push(before_hook(hook));
        self
    }

    pub fn on_after_handle<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Context, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.hooks.after.push(after_hook(hook));
        self
    }

    /// Error hooks run in registration order; the first `Some` wins
    pub fn on_error<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Context, Arc<Error>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<HttpResponse>, Error>> + Send + 'static,
    {
        self.hooks.error.push(error_hook(hook));
        self
    }

    /// Replaces the default 404 response. Only one is kept.
    pub fn on_not_found<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.hooks.not_found = Some(not_found_hook(hook));
        self
    }

    // ========== State and decorators ==========

    pub fn set_state<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> &mut Self {
        self.shared.state.write().insert(key, value);
        self
    }

    pub fn state<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.shared.state.read().get(key)
    }

    /// Attach a named helper, readable from every request via
    /// [`Context::decorator`]
    pub fn decorate<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> &mut Self {
        let key = key.into();
        debug!(key = %key, "Registered decorator");
        self.shared.decorators.write().insert(key, value);
        self
    }

    pub fn decorator<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.shared.decorators.read().get(key)
    }

    // ========== Plugins ==========

    /// Apply a plugin once. Dependencies must already be registered.
    pub fn register<P: Plugin>(&mut self, plugin: P) -> Result<&mut Self, Error> {
        let name = plugin.name().to_string();
        if self.has_plugin(&name) {
            debug!(plugin = %name, "Plugin already registered, skipping");
            return Ok(self);
        }

        if let Some(missing) = plugin
            .dependencies()
            .into_iter()
            .find(|dep| !self.has_plugin(dep))
        {
            return Err(Error::PluginDependency {
                plugin: name,
                missing: missing.to_string(),
            });
        }

        plugin.setup(self)?;
        info!(plugin = %name, "Registered plugin");
        self.plugins.push(name);
        Ok(self)
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    // ========== Compilation ==========

    /// Build the static route table and compile every route schema.
    ///
    /// Does nothing when no route was added since the last call. Routes
    /// added afterwards are still served, through the trie.
    pub fn compile(&mut self) -> Result<&mut Self, Error> {
        if self.is_compiled() {
            debug!("Routes unchanged since last compile, skipping");
            return Ok(self);
        }

        for entry in &self.entries {
            entry.compiled()?;
        }
        self.static_table = StaticTable::build(&self.router);
        self.compiled_generation = Some(self.generation);

        info!(
            routes = self.router.len(),
            static_paths = self.static_table.len(),
            "Compiled routes"
        );
        Ok(self)
    }

    /// True when the static table reflects every registered route
    pub fn is_compiled(&self) -> bool {
        self.compiled_generation == Some(self.generation)
    }

    /// Every registered `(method, pattern)`, sorted by pattern
    pub fn routes(&self) -> Vec<(HttpMethod, String)> {
        self.router
            .routes()
            .into_iter()
            .map(|(method, pattern)| (method, pattern.raw().to_string()))
            .collect()
    }
}

impl RouteRegistrar for App {
    fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: BoxedHandler,
        options: RouteOptions,
    ) -> Result<&mut Self, Error> {
        self.insert_route(method, path, handler, options, &[])?;
        Ok(self)
    }
}
