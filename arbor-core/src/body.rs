// Request body and query string decoding

use bytes::Bytes;
use serde_json::{Map, Value};

/// A request body decoded according to its `Content-Type`
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`, as an object of strings
    Form(Value),
    Text(String),
    Binary(Bytes),
}

impl Body {
    /// Decode raw bytes. Missing content types are read as text.
    pub fn parse(content_type: Option<&str>, bytes: &Bytes) -> Result<Self, String> {
        if bytes.is_empty() {
            return Ok(Body::Empty);
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if mime == "application/json" || mime.ends_with("+json") {
            return serde_json::from_slice(bytes)
                .map(Body::Json)
                .map_err(|e| format!("invalid JSON body: {}", e));
        }

        if mime == "application/x-www-form-urlencoded" {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
                .map_err(|e| format!("invalid form body: {}", e))?;
            return Ok(Body::Form(Value::Object(group_pairs(pairs))));
        }

        if mime.is_empty() || mime.starts_with("text/") {
            return String::from_utf8(bytes.to_vec())
                .map(Body::Text)
                .map_err(|_| "body is not valid UTF-8".to_string());
        }

        Ok(Body::Binary(bytes.clone()))
    }

    /// JSON view used for validation. `None` when there is no body.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Body::Empty => None,
            Body::Json(value) | Body::Form(value) => Some(value.clone()),
            Body::Text(text) => Some(Value::String(text.clone())),
            Body::Binary(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// Parse a query string into an object. Repeated keys become arrays.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    group_pairs(pairs)
}

fn group_pairs(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            None => {
                map.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    map
}
