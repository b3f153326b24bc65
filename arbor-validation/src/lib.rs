//! Declarative request schemas for Arbor
//!
//! Schemas describe the shape of path parameters, query strings and
//! request bodies. They are compiled once into a [`CompiledSchema`] that
//! validates input, coerces strings into the declared types and injects
//! defaults for absent fields.
//!
//! # Examples
//!
//! ```
//! use arbor_validation::{compile, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::object([
//!     ("name", Schema::string().min_length(1)),
//!     ("age", Schema::number()),
//!     ("admin", Schema::boolean().default(false)),
//! ])
//! .shared();
//!
//! let checker = compile(&schema).unwrap();
//!
//! let data = checker.check(json!({"name": "Al", "age": "25"})).unwrap();
//! assert_eq!(data, json!({"name": "Al", "age": 25, "admin": false}));
//!
//! let errors = checker.check(json!({"name": "Al", "age": "x"})).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.errors[0].field, "age");
//! assert_eq!(errors.errors[0].expected, "number");
//! ```

mod cache;
mod compile;
mod errors;
mod formats;
mod schema;

pub use cache::{SchemaCache, compile, global_cache};
pub use compile::CompiledSchema;
pub use errors::{SchemaError, ValidationError, ValidationErrors};
pub use formats::matches_format;
pub use schema::{NumberRules, Schema, SchemaKind, StringFormat, StringRules};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{CompiledSchema, Schema, ValidationError, ValidationErrors, compile};
}
