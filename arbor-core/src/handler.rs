// Route handlers
//
// Any `Fn(Context) -> impl Future<Output = impl Responder>` is a handler.
// Handlers are type-erased into `BoxedHandler` when a route is registered,
// so routes with different handler types can share one table.

use crate::responder::Responder;
use crate::{Context, Error, HttpResponse};
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// A handler that can process a request
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<HttpResponse, Error>>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<HttpResponse, Error>> {
        let fut = (self)(ctx.clone());
        Box::pin(async move { fut.await.respond(&ctx) })
    }
}

/// Type-erased handler for storing in route tables.
///
/// Cloning is cheap; the handler itself lives behind an `Arc`.
#[derive(Clone)]
pub struct BoxedHandler {
    inner: Arc<dyn Handler>,
}

impl BoxedHandler {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    #[inline]
    pub fn call(&self, ctx: Context) -> BoxFuture<'static, Result<HttpResponse, Error>> {
        self.inner.call(ctx)
    }
}

impl std::fmt::Debug for BoxedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoxedHandler")
    }
}
