//! Route groups for registering routes under a shared prefix and
//! middleware.
//!
//! Groups exist only while routes are being registered. Each route added
//! through a [`Scope`] gets the group's prefix prepended and the group's
//! middleware (outer groups first) placed in front of its own.
//!
//! # Examples
//!
//! ```
//! use arbor_core::{App, Context, MethodRoutes};
//!
//! # fn main() -> Result<(), arbor_core::Error> {
//! let mut app = App::new();
//! app.group("/api", |api| {
//!     api.group("/v1", |v1| {
//!         v1.get("/users", |_ctx: Context| async { "users" })?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//!
//! assert_eq!(app.routes()[0].1, "/api/v1/users");
//! # Ok(())
//! # }
//! ```

use crate::handler::BoxedHandler;
use crate::route::{RouteOptions, RouteRegistrar};
use crate::{App, Error, HttpMethod, Middleware};
use std::sync::Arc;

/// Prefix and middleware shared by the routes of a group
#[derive(Clone, Default)]
pub struct RouteGroup {
    prefix: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl RouteGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path prefix. A leading slash is added and trailing slashes
    /// are dropped, so `"api/v1/"` becomes `"/api/v1"`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = if prefix.starts_with('/') {
            prefix
        } else {
            format!("/{}", prefix)
        };
        self.prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn get_prefix(&self) -> &str {
        &self.prefix
    }

    /// Prepend the prefix to a route path
    pub fn apply_prefix(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            return path.to_string();
        }
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}/{}", self.prefix, path)
        }
    }

    pub fn get_middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Nest this group inside `parent`: prefixes concatenate and the
    /// parent's middleware runs first
    pub fn with_parent(self, parent: &RouteGroup) -> Self {
        let mut middleware = parent.middleware.clone();
        middleware.extend(self.middleware);
        Self {
            prefix: format!("{}{}", parent.prefix, self.prefix),
            middleware,
        }
    }
}

impl std::fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGroup")
            .field("prefix", &self.prefix)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Registration handle for the body of [`App::group`]
pub struct Scope<'a> {
    app: &'a mut App,
    group: RouteGroup,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(app: &'a mut App, group: RouteGroup) -> Self {
        Self { app, group }
    }

    pub fn prefix(&self) -> &str {
        self.group.get_prefix()
    }

    /// Add middleware for the routes registered after this call,
    /// including those of groups nested after it
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.group.middleware.push(Arc::new(middleware));
        self
    }

    /// Nest a group under this one
    pub fn group<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<(), Error>,
    {
        let group = RouteGroup::new().prefix(prefix).with_parent(&self.group);
        f(&mut Scope::new(&mut *self.app, group))?;
        Ok(self)
    }
}

impl RouteRegistrar for Scope<'_> {
    fn add_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: BoxedHandler,
        options: RouteOptions,
    ) -> Result<&mut Self, Error> {
        let path = self.group.apply_prefix(path);
        self.app
            .insert_route(method, &path, handler, options, &self.group.middleware)?;
        Ok(self)
    }
}
