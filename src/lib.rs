// Arbor - a trie-routed, schema-validated HTTP framework for Rust
//
// This crate bundles the router, request pipeline and server from
// `arbor-core` with the schema language from `arbor-validation`.

// Re-export core functionality
pub use arbor_core::*;

// Schemas live in their own crate
pub use arbor_validation;
pub use arbor_validation::{CompiledSchema, Schema, ValidationError, ValidationErrors};

// Prelude for common imports
pub mod prelude {
    pub use arbor_core::prelude::*;
    pub use arbor_validation::Schema;
}
