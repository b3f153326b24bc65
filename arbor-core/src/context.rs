//! Per-request context.
//!
//! A [`Context`] is created by the dispatcher for every request and handed
//! to hooks, middleware and the handler. It is a cheap handle: cloning it
//! shares the same request. Nothing in it outlives the request except what
//! is written to application state.
//!
//! ```no_run
//! use arbor_core::{Context, Error};
//! use serde_json::{Value, json};
//!
//! async fn show(ctx: Context) -> Result<Value, Error> {
//!     let id = ctx.param("id").unwrap_or_default();
//!     let verbose = ctx.query("verbose") == Some("true");
//!     ctx.set_header("x-user", id);
//!     Ok(json!({ "id": id, "verbose": verbose }))
//! }
//! ```

use crate::body::{Body, parse_query};
use crate::router::Params;
use crate::store::Store;
use crate::Error;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Application-wide data shared by every request
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) state: RwLock<Store>,
    pub(crate) decorators: RwLock<Store>,
}

#[derive(Debug, Default)]
struct Validated {
    params: Option<Value>,
    query: Option<Value>,
    body: Option<Value>,
}

#[derive(Debug, Default)]
struct ResponseParts {
    status: Option<u16>,
    headers: HeaderMap,
}

struct Inner {
    method: String,
    path: String,
    route: Option<String>,
    params: Params,
    query: Map<String, Value>,
    headers: HeaderMap,
    raw_body: Bytes,
    body: OnceCell<Result<Body, String>>,
    validated: Mutex<Validated>,
    store: Mutex<Store>,
    response: Mutex<ResponseParts>,
    shared: Arc<Shared>,
}

/// Per-request handle passed through the pipeline
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.inner.method)
            .field("path", &self.inner.path)
            .field("route", &self.inner.route)
            .field("params", &self.inner.params)
            .finish()
    }
}

pub(crate) struct ContextParts {
    pub method: String,
    pub path: String,
    pub route: Option<String>,
    pub params: Params,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub shared: Arc<Shared>,
}

impl Context {
    pub(crate) fn from_parts(parts: ContextParts) -> Self {
        let query = parts.query.as_deref().map(parse_query).unwrap_or_default();
        Self {
            inner: Arc::new(Inner {
                method: parts.method,
                path: parts.path,
                route: parts.route,
                params: parts.params,
                query,
                headers: parts.headers,
                raw_body: parts.body,
                body: OnceCell::new(),
                validated: Mutex::new(Validated::default()),
                store: Mutex::new(Store::new()),
                response: Mutex::new(ResponseParts::default()),
                shared: parts.shared,
            }),
        }
    }

    // ========== Request ==========

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Normalized request path, base path removed
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Pattern of the matched route, if any
    pub fn route(&self) -> Option<&str> {
        self.inner.route.as_deref()
    }

    /// Raw (percent-decoded) path parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    /// First value of a query parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        match self.inner.query.get(name)? {
            Value::String(value) => Some(value),
            Value::Array(values) => values.first().and_then(Value::as_str),
            _ => None,
        }
    }

    /// Every value of a query parameter
    pub fn query_all(&self, name: &str) -> Vec<&str> {
        match self.inner.query.get(name) {
            Some(Value::String(value)) => vec![value.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.inner.raw_body
    }

    /// Decoded body. Parsed on first access and cached.
    pub fn body(&self) -> Result<&Body, Error> {
        self.inner
            .body
            .get_or_init(|| Body::parse(self.header(CONTENT_TYPE.as_str()), &self.inner.raw_body))
            .as_ref()
            .map_err(|reason| Error::BadRequest(reason.clone()))
    }

    /// Path parameters as JSON, coerced if a params schema ran
    pub fn params_value(&self) -> Value {
        self.inner
            .validated
            .lock()
            .params
            .clone()
            .unwrap_or_else(|| self.inner.params.to_json())
    }

    /// Query as JSON, coerced and defaulted if a query schema ran
    pub fn query_value(&self) -> Value {
        self.inner
            .validated
            .lock()
            .query
            .clone()
            .unwrap_or_else(|| Value::Object(self.inner.query.clone()))
    }

    /// Body as JSON, coerced and defaulted if a body schema ran.
    /// `Null` when there is no body.
    pub fn body_value(&self) -> Result<Value, Error> {
        if let Some(validated) = self.inner.validated.lock().body.clone() {
            return Ok(validated);
        }
        Ok(self.body()?.to_value().unwrap_or(Value::Null))
    }

    /// Deserialize the (validated) body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.body_value()?).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Deserialize the (validated) query
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.query_value()).map_err(|e| Error::BadRequest(e.to_string()))
    }

    /// Deserialize the (validated) path parameters
    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_value(self.params_value()).map_err(|e| Error::BadRequest(e.to_string()))
    }

    pub(crate) fn query_object(&self) -> Value {
        Value::Object(self.inner.query.clone())
    }

    pub(crate) fn set_validated_params(&self, value: Value) {
        self.inner.validated.lock().params = Some(value);
    }

    pub(crate) fn set_validated_query(&self, value: Value) {
        self.inner.validated.lock().query = Some(value);
    }

    pub(crate) fn set_validated_body(&self, value: Value) {
        self.inner.validated.lock().body = Some(value);
    }

    // ========== Per-request store ==========

    /// Store a value for later hooks and the handler
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.inner.store.lock().insert(key, value);
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.inner.store.lock().get(key)
    }

    // ========== Application state and decorators ==========

    pub fn state<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.inner.shared.state.read().get(key)
    }

    /// Replace a process-wide state value. Visible to every request.
    pub fn set_state<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.inner.shared.state.write().insert(key, value);
    }

    pub fn decorator<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.inner.shared.decorators.read().get(key)
    }

    // ========== Response builder ==========

    /// Status for responses built from handler return values
    pub fn set_status(&self, status: u16) {
        self.inner.response.lock().status = Some(status);
    }

    pub fn status(&self) -> Option<u16> {
        self.inner.response.lock().status
    }

    /// Header added to the outgoing response unless it already sets it.
    /// Invalid names or values are ignored.
    pub fn set_header(&self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.inner.response.lock().headers.insert(name, value);
        }
    }

    /// Copy builder headers into `headers` without overriding existing ones
    pub(crate) fn merge_headers_into(&self, headers: &mut HeaderMap) {
        let parts = self.inner.response.lock();
        for (name, value) in parts.headers.iter() {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
    }
}
