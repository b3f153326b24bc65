// Error types for the Arbor framework

use crate::config::ConfigError;
use crate::http::HttpMethod;
use crate::pattern::PatternError;
use crate::HttpStatus;
use arbor_validation::{SchemaError, ValidationErrors};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Registration-time errors
    #[error("Invalid route pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("Route already registered: {method} {pattern}")]
    DuplicateRoute { method: HttpMethod, pattern: String },

    #[error("Plugin `{plugin}` depends on `{missing}`, which is not registered")]
    PluginDependency { plugin: String, missing: String },

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Per-request errors
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap any error type
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Custom(Box::new(error))
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::Validation(_) | Error::BadRequest(_) | Error::Deserialization(_) => {
                HttpStatus::BadRequest
            }
            Error::NotFound(_) => HttpStatus::NotFound,
            Error::MethodNotAllowed(_) => HttpStatus::MethodNotAllowed,
            Error::Unauthorized(_) => HttpStatus::Unauthorized,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::Conflict(_) => HttpStatus::Conflict,
            Error::UnsupportedMediaType(_) => HttpStatus::UnsupportedMediaType,
            Error::UnprocessableEntity(_) => HttpStatus::UnprocessableEntity,
            Error::TooManyRequests(_) => HttpStatus::TooManyRequests,
            Error::ServiceUnavailable(_) => HttpStatus::ServiceUnavailable,

            // Everything else is a server-side failure
            _ => HttpStatus::InternalServerError,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }

    /// Message safe to show to clients for 4xx errors
    pub(crate) fn client_message(&self) -> String {
        match self {
            Error::NotFound(msg)
            | Error::MethodNotAllowed(msg)
            | Error::BadRequest(msg)
            | Error::Unauthorized(msg)
            | Error::Forbidden(msg)
            | Error::Conflict(msg)
            | Error::UnsupportedMediaType(msg)
            | Error::UnprocessableEntity(msg)
            | Error::TooManyRequests(msg)
            | Error::Deserialization(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization(error.to_string())
    }
}
