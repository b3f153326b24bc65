// Conversion of handler return values into responses

use crate::http::{HttpResponse, Json};
use crate::{Context, Error};
use serde::Serialize;
use serde_json::Value;

/// Anything a handler may return.
///
/// Values without an explicit status (`String`, `Value`, `Json`, `()`)
/// take the status set through [`Context::set_status`], or their natural
/// default. An [`HttpResponse`] is passed through untouched.
pub trait Responder {
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error>;
}

impl Responder for HttpResponse {
    fn respond(self, _ctx: &Context) -> Result<HttpResponse, Error> {
        Ok(self)
    }
}

impl Responder for &'static str {
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::new(ctx.status().unwrap_or(200)).with_text(self))
    }
}

impl Responder for String {
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::new(ctx.status().unwrap_or(200)).with_text(self))
    }
}

impl Responder for Value {
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::json(ctx.status().unwrap_or(200), &self))
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error> {
        HttpResponse::new(ctx.status().unwrap_or(200)).with_json(&self.0)
    }
}

impl Responder for () {
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error> {
        Ok(HttpResponse::new(ctx.status().unwrap_or(204)))
    }
}

impl<R: Responder> Responder for (u16, R) {
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error> {
        let (status, inner) = self;
        Ok(inner.respond(ctx)?.with_status(status))
    }
}

impl<R, E> Responder for Result<R, E>
where
    R: Responder,
    E: Into<Error>,
{
    fn respond(self, ctx: &Context) -> Result<HttpResponse, Error> {
        match self {
            Ok(inner) => inner.respond(ctx),
            Err(err) => Err(err.into()),
        }
    }
}
