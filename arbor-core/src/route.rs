// Route entries, per-route options and the registration trait

use crate::handler::BoxedHandler;
use crate::hooks::{after_hook, before_hook, AfterHook, BeforeHook};
use crate::responder::Responder;
use crate::{Context, Error, HttpMethod, HttpResponse, Middleware};
use arbor_validation::{CompiledSchema, Schema, SchemaError};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::sync::Arc;

/// Checkers for the schemas attached to a route
#[derive(Debug, Default)]
pub struct CompiledSchemas {
    pub params: Option<Arc<CompiledSchema>>,
    pub query: Option<Arc<CompiledSchema>>,
    pub body: Option<Arc<CompiledSchema>>,
}

/// Everything the dispatcher needs to serve one `(method, pattern)`.
///
/// Group prefixes and group middleware are already folded in; groups do
/// not exist at request time.
pub struct RouteEntry {
    method: HttpMethod,
    pattern: String,
    handler: BoxedHandler,
    params: Option<Arc<Schema>>,
    query: Option<Arc<Schema>>,
    body: Option<Arc<Schema>>,
    compiled: OnceCell<CompiledSchemas>,
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
    middleware: Arc<[Arc<dyn Middleware>]>,
}

impl RouteEntry {
    pub(crate) fn new(
        method: HttpMethod,
        pattern: String,
        handler: BoxedHandler,
        options: RouteOptions,
        group_middleware: &[Arc<dyn Middleware>],
    ) -> Self {
        let middleware: Vec<Arc<dyn Middleware>> = group_middleware
            .iter()
            .cloned()
            .chain(options.middleware)
            .collect();

        Self {
            method,
            pattern,
            handler,
            params: options.params,
            query: options.query,
            body: options.body,
            compiled: OnceCell::new(),
            before: options.before,
            after: options.after,
            middleware: Arc::from(middleware),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Full pattern, group prefixes included
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn has_schemas(&self) -> bool {
        self.params.is_some() || self.query.is_some() || self.body.is_some()
    }

    /// Schema checkers, compiled on first use through the shared cache
    pub fn compiled(&self) -> Result<&CompiledSchemas, SchemaError> {
        self.compiled.get_or_try_init(|| {
            let compile = |schema: &Option<Arc<Schema>>| {
                schema.as_ref().map(arbor_validation::compile).transpose()
            };
            Ok(CompiledSchemas {
                params: compile(&self.params)?,
                query: compile(&self.query)?,
                body: compile(&self.body)?,
            })
        })
    }

    pub(crate) fn handler(&self) -> &BoxedHandler {
        &self.handler
    }

    pub(crate) fn before_hooks(&self) -> &[BeforeHook] {
        &self.before
    }

    pub(crate) fn after_hooks(&self) -> &[AfterHook] {
        &self.after
    }

    pub(crate) fn middleware(&self) -> &Arc<[Arc<dyn Middleware>]> {
        &self.middleware
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("has_schemas", &self.has_schemas())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Schemas, hooks and middleware for a single route.
///
/// ```
/// use arbor_core::RouteOptions;
/// use arbor_validation::Schema;
///
/// let options = RouteOptions::new()
///     .params(Schema::object([("id", Schema::integer())]))
///     .body(Schema::object([("age", Schema::integer().minimum(0.0))]));
/// ```
#[derive(Clone, Default)]
pub struct RouteOptions {
    params: Option<Arc<Schema>>,
    query: Option<Arc<Schema>>,
    body: Option<Arc<Schema>>,
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema for path parameters. Values arrive as strings and are coerced.
    pub fn params(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.params = Some(schema.into());
        self
    }

    pub fn query(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.query = Some(schema.into());
        self
    }

    pub fn body(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.body = Some(schema.into());
        self
    }

    /// Runs after middleware, right before the handler
    pub fn before_handle<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<HttpResponse>, Error>> + Send + 'static,
    {
        self.before.push(before_hook(hook));
        self
    }

    /// Runs after the global after hooks
    pub fn after_handle<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Context, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.after.push(after_hook(hook));
        self
    }

    /// Innermost middleware, after any group middleware
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }
}

/// Route registration, shared by [`App`](crate::App) and group scopes.
///
/// Handlers are async functions or closures taking a [`Context`] and
/// returning anything that implements [`Responder`].
pub trait RouteRegistrar: Sized {
    /// Register an already boxed handler
    fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: BoxedHandler,
        options: RouteOptions,
    ) -> Result<&mut Self, Error>;

    fn route_with<F, Fut, R>(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: F,
        options: RouteOptions,
    ) -> Result<&mut Self, Error>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Responder + 'static,
    {
        self.add_route(method, path, BoxedHandler::new(handler), options)
    }

    fn route<F, Fut, R>(&mut self, method: HttpMethod, path: &str, handler: F) -> Result<&mut Self, Error>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Responder + 'static,
    {
        self.route_with(method, path, handler, RouteOptions::default())
    }
}

macro_rules! method_routes {
    ($($method:ident, $method_with:ident => $variant:ident;)*) => {
        /// Per-method shorthands for [`RouteRegistrar`]
        pub trait MethodRoutes: RouteRegistrar {
            $(
                fn $method<F, Fut, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, Error>
                where
                    F: Fn(Context) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = R> + Send + 'static,
                    R: Responder + 'static,
                {
                    self.route_with(HttpMethod::$variant, path, handler, RouteOptions::default())
                }

                fn $method_with<F, Fut, R>(
                    &mut self,
                    path: &str,
                    handler: F,
                    options: RouteOptions,
                ) -> Result<&mut Self, Error>
                where
                    F: Fn(Context) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = R> + Send + 'static,
                    R: Responder + 'static,
                {
                    self.route_with(HttpMethod::$variant, path, handler, options)
                }
            )*
        }

        impl<T: RouteRegistrar> MethodRoutes for T {}
    };
}

method_routes! {
    get, get_with => Get;
    post, post_with => Post;
    put, put_with => Put;
    patch, patch_with => Patch;
    delete, delete_with => Delete;
    options, options_with => Options;
    head, head_with => Head;
    all, all_with => All;
}
