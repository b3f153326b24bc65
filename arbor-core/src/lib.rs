// Core library for the Arbor HTTP framework
// Routing, the request pipeline, and the types handlers work with

pub mod application;
pub mod body;
pub mod compiler;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod pattern;
pub mod plugin;
pub mod responder;
pub mod route;
pub mod route_group;
pub mod router;
pub mod server;
pub mod status;
pub mod store;
pub mod suggest;

// Re-export commonly used types
pub use application::App;
pub use body::Body;
pub use compiler::StaticTable;
pub use config::{AppConfig, ConfigError, EnvLoader, Mode};
pub use context::Context;
pub use error::*;
pub use handler::{BoxedHandler, Handler};
pub use hooks::{AfterHook, BeforeHook, ErrorHook, NotFoundHook};
pub use http::*;
pub use middleware::{FnMiddleware, Middleware, Next, from_fn};
pub use pattern::{PatternError, RoutePattern, Segment};
pub use plugin::{FnPlugin, Plugin, plugin};
pub use responder::Responder;
pub use route::{CompiledSchemas, MethodRoutes, RouteEntry, RouteOptions, RouteRegistrar};
pub use route_group::{RouteGroup, Scope};
pub use router::{Match, Params, Resolution, Router};
pub use status::*;
pub use store::Store;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        App, AppConfig, Context, Error, HttpMethod, HttpRequest, HttpResponse, Json, MethodRoutes,
        Middleware, Mode, Next, Plugin, Responder, RouteOptions, RouteRegistrar, from_fn,
    };
}
