// Middleware system for request/response processing

use crate::logging::trace;
use crate::{Context, Error, HttpResponse};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Innermost step of a chain: route hooks plus the handler
pub(crate) type Endpoint =
    Arc<dyn Fn(Context) -> BoxFuture<'static, Result<HttpResponse, Error>> + Send + Sync>;

/// Middleware wraps the rest of the pipeline.
///
/// An implementation either calls `next.run(ctx)` and returns (or
/// transforms) its result, or returns its own response without calling it,
/// which stops the chain before the handler. `Next` is consumed by `run`,
/// so the rest of the chain cannot be driven twice.
///
/// ```
/// use arbor_core::{Context, Error, HttpResponse, Middleware, Next};
/// use async_trait::async_trait;
///
/// struct RequireKey;
///
/// #[async_trait]
/// impl Middleware for RequireKey {
///     async fn handle(&self, ctx: Context, next: Next) -> Result<HttpResponse, Error> {
///         if ctx.header("x-api-key").is_none() {
///             return Err(Error::Unauthorized("missing api key".into()));
///         }
///         next.run(ctx).await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: Context, next: Next) -> Result<HttpResponse, Error>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The remainder of a middleware chain
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    endpoint: Endpoint,
}

impl Next {
    pub(crate) fn new(chain: Arc<[Arc<dyn Middleware>]>, endpoint: Endpoint) -> Self {
        Self {
            chain,
            index: 0,
            endpoint,
        }
    }

    /// Run the next middleware, or the endpoint once the chain is exhausted
    pub async fn run(self, ctx: Context) -> Result<HttpResponse, Error> {
        match self.chain.get(self.index).cloned() {
            Some(middleware) => {
                trace!(
                    middleware = middleware.name(),
                    index = self.index,
                    "Executing middleware"
                );
                let next = Next {
                    chain: self.chain,
                    index: self.index + 1,
                    endpoint: self.endpoint,
                };
                middleware.handle(ctx, next).await
            }
            None => {
                trace!("Middleware chain complete, calling endpoint");
                (self.endpoint)(ctx).await
            }
        }
    }

    /// Middleware left to run after the current one
    pub fn remaining(&self) -> usize {
        self.chain.len() - self.index
    }
}

/// Middleware built from an async closure
pub struct FnMiddleware<F> {
    f: F,
}

/// Build middleware from `|ctx, next| async move { ... }`
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, ctx: Context, next: Next) -> Result<HttpResponse, Error> {
        (self.f)(ctx, next).await
    }

    fn name(&self) -> &str {
        "fn_middleware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use parking_lot::Mutex;

    fn recorder(log: Arc<Mutex<Vec<String>>>, label: &'static str) -> Arc<dyn Middleware> {
        Arc::new(from_fn(move |ctx, next: Next| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(format!("{} before", label));
                let res = next.run(ctx).await;
                log.lock().push(format!("{} after", label));
                res
            }
        }))
    }

    fn endpoint(log: Arc<Mutex<Vec<String>>>) -> Endpoint {
        Arc::new(move |_ctx: Context| -> BoxFuture<'static, Result<HttpResponse, Error>> {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().push("handler".to_string());
                Ok(HttpResponse::ok())
            })
        })
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![
            recorder(Arc::clone(&log), "a"),
            recorder(Arc::clone(&log), "b"),
        ]);

        let res = Next::new(chain, endpoint(Arc::clone(&log)))
            .run(context("/", &[]))
            .await
            .unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(
            *log.lock(),
            vec!["a before", "b before", "handler", "b after", "a after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let gate: Arc<dyn Middleware> = Arc::new(from_fn(|_ctx, _next: Next| async {
            Ok(HttpResponse::new(401))
        }));
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(vec![gate]);

        let res = Next::new(chain, endpoint(Arc::clone(&log)))
            .run(context("/", &[]))
            .await
            .unwrap();

        assert_eq!(res.status, 401);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_calls_endpoint() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(Vec::new());
        let next = Next::new(chain, endpoint(Arc::clone(&log)));
        assert_eq!(next.remaining(), 0);
        next.run(context("/", &[])).await.unwrap();
        assert_eq!(*log.lock(), vec!["handler"]);
    }
}
