//! Request dispatch.
//!
//! Every request goes through the same stages:
//!
//! 1. **Matching**: the path is normalized, the base path stripped, and
//!    the route looked up (static table when compiled, then the trie).
//! 2. **Validating**: params, query and body schemas, in that order. The
//!    first failure answers 400 and nothing else runs.
//! 3. **Before hooks**: global before hooks. A response here skips the
//!    handler but still goes through the after hooks.
//! 4. **Handling**: global, path-scoped, group and route middleware wrap
//!    the route's before hooks and the handler.
//! 5. **After hooks**: global, then the route's.
//!
//! Errors and panics from any stage go to the error hooks (or the default
//! error response); unmatched requests go to the not-found hook (or the
//! default 404/405). Exactly one response comes out.

use crate::context::ContextParts;
use crate::hooks::{run_after, run_before};
use crate::logging::{debug, error};
use crate::middleware::{Endpoint, Next};
use crate::pattern::{has_segment_prefix, join_segments, split_path};
use crate::route::RouteEntry;
use crate::router::{Match, Params, Resolution};
use crate::suggest::suggest;
use crate::{App, Body, Context, Error, HttpMethod, HttpRequest, HttpResponse, Middleware};
use arbor_validation::ValidationErrors;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::header::CONTENT_TYPE;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, info_span};

impl App {
    /// Serve one request. Never fails: errors become responses.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let span = info_span!("request", method = %request.method, path = %request.path());
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let HttpRequest {
            method,
            uri,
            headers,
            body,
        } = request;

        let (raw_path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (uri.as_str(), None),
        };

        let segments = split_path(raw_path);
        let base = split_path(&self.config.base_path);
        let relative = if has_segment_prefix(&segments, &base) {
            Some(&segments[base.len()..])
        } else {
            None
        };

        let parsed = method.parse::<HttpMethod>().ok();
        let resolution = match (parsed, relative) {
            (Some(method), Some(relative)) => self.resolve(method, relative),
            _ => Resolution::NotFound,
        };

        let route_path = join_segments(relative.unwrap_or(&segments[..]));
        let (route, params, entry, allowed) = match resolution {
            Resolution::Found(Match {
                value,
                pattern,
                params,
            }) => (Some(pattern.raw().to_string()), params, Some(value), Vec::new()),
            Resolution::MethodNotAllowed { allowed } => (None, Params::new(), None, allowed),
            Resolution::NotFound => (None, Params::new(), None, Vec::new()),
        };

        let ctx = Context::from_parts(ContextParts {
            method,
            path: route_path,
            route,
            params,
            query,
            headers,
            body,
            shared: Arc::clone(&self.shared),
        });

        match entry {
            Some(entry) => self.serve_route(&ctx, &entry, relative.unwrap_or(&[])).await,
            None => self.not_found(&ctx, &allowed).await,
        }
    }

    fn resolve(&self, method: HttpMethod, segments: &[&str]) -> Resolution<RouteEntry> {
        if self.is_compiled() {
            if let Some((pattern, value)) = self
                .static_table
                .lookup(method, &join_segments(segments))
            {
                return Resolution::Found(Match {
                    value: Arc::clone(value),
                    pattern: Arc::clone(pattern),
                    params: Params::new(),
                });
            }
        }
        self.router.resolve_segments(method, segments)
    }

    async fn serve_route(&self, ctx: &Context, entry: &Arc<RouteEntry>, segments: &[&str]) -> HttpResponse {
        let outcome = AssertUnwindSafe(self.pipeline(ctx, entry, segments))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::Panic(panic_message(panic))));

        match outcome {
            Ok(response) => response,
            Err(err) => self.handle_error(ctx, err).await,
        }
    }

    async fn pipeline(
        &self,
        ctx: &Context,
        entry: &Arc<RouteEntry>,
        segments: &[&str],
    ) -> Result<HttpResponse, Error> {
        if let Err(errors) = validate(ctx, entry)? {
            debug!(details = errors.len(), "Request failed validation");
            return Ok(validation_response(&errors));
        }

        let mut response = match run_before(&self.hooks.before, ctx).await? {
            Some(early) => early,
            None => {
                Next::new(self.chain_for(entry, segments), endpoint(entry))
                    .run(ctx.clone())
                    .await?
            }
        };
        ctx.merge_headers_into(&mut response.headers);

        let response = run_after(&self.hooks.after, ctx, response).await?;
        run_after(entry.after_hooks(), ctx, response).await
    }

    /// Global, then path-scoped, then the route's own (group first)
    fn chain_for(&self, entry: &RouteEntry, segments: &[&str]) -> Arc<[Arc<dyn Middleware>]> {
        let scoped = self
            .scoped_middleware
            .iter()
            .filter(|(prefix, _)| {
                let prefix: Vec<&str> = prefix.iter().map(String::as_str).collect();
                has_segment_prefix(segments, &prefix)
            })
            .map(|(_, middleware)| middleware);

        let mut chain: Vec<Arc<dyn Middleware>> = self.global_middleware.clone();
        chain.extend(scoped.cloned());
        if chain.is_empty() {
            return Arc::clone(entry.middleware());
        }
        chain.extend(entry.middleware().iter().cloned());
        Arc::from(chain)
    }

    async fn handle_error(&self, ctx: &Context, err: Error) -> HttpResponse {
        if err.is_server_error() {
            error!(error = %err, error_debug = ?err, "Request failed");
        } else {
            debug!(error = %err, status = err.status_code(), "Request rejected");
        }

        let err = Arc::new(err);
        for hook in &self.hooks.error {
            match AssertUnwindSafe(hook(ctx.clone(), Arc::clone(&err)))
                .catch_unwind()
                .await
            {
                Ok(Ok(Some(response))) => return response,
                Ok(Ok(None)) => continue,
                Ok(Err(hook_err)) => {
                    error!(error = %hook_err, error_debug = ?hook_err, "Error hook failed");
                    return HttpResponse::internal_server_error();
                }
                Err(panic) => {
                    error!(panic = %panic_message(panic), "Error hook panicked");
                    return HttpResponse::internal_server_error();
                }
            }
        }

        default_error_response(&err)
    }

    async fn not_found(&self, ctx: &Context, allowed: &[HttpMethod]) -> HttpResponse {
        debug!(path = %ctx.path(), "No route matched");

        if let Some(hook) = &self.hooks.not_found {
            let outcome = AssertUnwindSafe(hook(ctx.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(Error::Panic(panic_message(panic))));
            return match outcome {
                Ok(response) => response,
                Err(err) => self.handle_error(ctx, err).await,
            };
        }

        if self.config.strict_methods && !allowed.is_empty() {
            let allow: Vec<&str> = allowed.iter().map(HttpMethod::as_str).collect();
            return HttpResponse::json(
                405,
                &json!({
                    "error": "Method Not Allowed",
                    "path": ctx.path(),
                    "allowed": allow,
                }),
            )
            .with_header("allow", &allow.join(", "));
        }

        let mut body = json!({ "error": "Not Found", "path": ctx.path() });
        if self.config.mode.is_development() {
            let routes = self.router.routes();
            let candidates: Vec<String> = routes
                .iter()
                .filter(|(_, pattern)| pattern.is_static())
                .map(|(_, pattern)| pattern.canonical())
                .collect();
            let suggestions = suggest(ctx.path(), candidates.iter().map(String::as_str));
            if !suggestions.is_empty() {
                body["suggestions"] = json!(suggestions);
            }
        }
        HttpResponse::json(404, &body)
    }
}

/// Check params, query and body against the route's schemas, storing the
/// coerced values on the context. The outer error is a failure to compile
/// or decode; the inner one is a validation failure.
fn validate(ctx: &Context, entry: &RouteEntry) -> Result<Result<(), ValidationErrors>, Error> {
    if !entry.has_schemas() {
        return Ok(Ok(()));
    }
    let schemas = entry.compiled()?;

    if let Some(schema) = &schemas.params {
        match schema.check_input(Some(ctx.params().to_json()), "params") {
            Ok(value) => ctx.set_validated_params(value),
            Err(errors) => return Ok(Err(errors)),
        }
    }

    if let Some(schema) = &schemas.query {
        match schema.check_input(Some(ctx.query_object()), "query") {
            Ok(value) => ctx.set_validated_query(value),
            Err(errors) => return Ok(Err(errors)),
        }
    }

    if let Some(schema) = &schemas.body {
        let body = ctx.body()?;
        if let Body::Binary(_) = body {
            let content_type = ctx.header(CONTENT_TYPE.as_str()).unwrap_or_default();
            return Err(Error::UnsupportedMediaType(format!(
                "cannot validate a {} body",
                content_type
            )));
        }
        match schema.check_input(body.to_value(), "body") {
            Ok(value) => ctx.set_validated_body(value),
            Err(errors) => return Ok(Err(errors)),
        }
    }

    Ok(Ok(()))
}

/// Route before hooks, then the handler
fn endpoint(entry: &Arc<RouteEntry>) -> Endpoint {
    let entry = Arc::clone(entry);
    Arc::new(move |ctx: Context| -> BoxFuture<'static, Result<HttpResponse, Error>> {
        let entry = Arc::clone(&entry);
        Box::pin(async move {
            if let Some(response) = run_before(entry.before_hooks(), &ctx).await? {
                return Ok(response);
            }
            entry.handler().call(ctx).await
        })
    })
}

fn validation_response(errors: &ValidationErrors) -> HttpResponse {
    HttpResponse::json(
        400,
        &json!({
            "error": "Validation Error",
            "details": errors,
        }),
    )
}

/// 5xx bodies never carry error details
pub(crate) fn default_error_response(err: &Error) -> HttpResponse {
    let status = err.status_code();
    match err {
        Error::Validation(errors) => validation_response(errors),
        err if err.is_server_error() => {
            HttpResponse::json(status, &json!({ "error": "Internal Server Error" }))
        }
        err => HttpResponse::json(
            status,
            &json!({
                "error": err.http_status().reason(),
                "message": err.client_message(),
            }),
        ),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
