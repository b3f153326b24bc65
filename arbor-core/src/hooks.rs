// Lifecycle hooks

use crate::{Context, Error, HttpResponse};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Runs before the handler. Returning `Some(response)` skips the handler.
pub type BeforeHook =
    Arc<dyn Fn(Context) -> BoxFuture<'static, Result<Option<HttpResponse>, Error>> + Send + Sync>;

/// Receives the response and returns the one to send
pub type AfterHook = Arc<
    dyn Fn(Context, HttpResponse) -> BoxFuture<'static, Result<HttpResponse, Error>>
        + Send
        + Sync,
>;

/// Turns an error into a response. `None` defers to the next error hook.
pub type ErrorHook = Arc<
    dyn Fn(Context, Arc<Error>) -> BoxFuture<'static, Result<Option<HttpResponse>, Error>>
        + Send
        + Sync,
>;

/// Produces the response for unmatched requests
pub type NotFoundHook =
    Arc<dyn Fn(Context) -> BoxFuture<'static, Result<HttpResponse, Error>> + Send + Sync>;

pub fn before_hook<F, Fut>(f: F) -> BeforeHook
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<HttpResponse>, Error>> + Send + 'static,
{
    Arc::new(
        move |ctx: Context| -> BoxFuture<'static, Result<Option<HttpResponse>, Error>> {
            Box::pin(f(ctx))
        },
    )
}

pub fn after_hook<F, Fut>(f: F) -> AfterHook
where
    F: Fn(Context, HttpResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(
        move |ctx: Context, response: HttpResponse| -> BoxFuture<'static, Result<HttpResponse, Error>> {
            Box::pin(f(ctx, response))
        },
    )
}

pub fn error_hook<F, Fut>(f: F) -> ErrorHook
where
    F: Fn(Context, Arc<Error>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<HttpResponse>, Error>> + Send + 'static,
{
    Arc::new(
        move |ctx: Context, error: Arc<Error>| -> BoxFuture<'static, Result<Option<HttpResponse>, Error>> {
            Box::pin(f(ctx, error))
        },
    )
}

pub fn not_found_hook<F, Fut>(f: F) -> NotFoundHook
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(
        move |ctx: Context| -> BoxFuture<'static, Result<HttpResponse, Error>> { Box::pin(f(ctx)) },
    )
}

/// Application-wide hooks, in registration order
#[derive(Clone, Default)]
pub(crate) struct GlobalHooks {
    pub before: Vec<BeforeHook>,
    pub after: Vec<AfterHook>,
    pub error: Vec<ErrorHook>,
    pub not_found: Option<NotFoundHook>,
}

/// Run before hooks in order until one answers
pub(crate) async fn run_before(
    hooks: &[BeforeHook],
    ctx: &Context,
) -> Result<Option<HttpResponse>, Error> {
    for hook in hooks {
        if let Some(response) = hook(ctx.clone()).await? {
            return Ok(Some(response));
        }
    }
    Ok(None)
}

/// Feed the response through every after hook
pub(crate) async fn run_after(
    hooks: &[AfterHook],
    ctx: &Context,
    mut response: HttpResponse,
) -> Result<HttpResponse, Error> {
    for hook in hooks {
        response = hook(ctx.clone(), response).await?;
    }
    Ok(response)
}
