// Validation errors

use serde::Serialize;
use std::fmt;

/// Validation error for a single field
///
/// `expected` and `received` are always populated so clients can tell what
/// the schema wanted and what actually arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Dotted path of the offending field (`address.zip`, `tags[1]`)
    pub field: String,

    /// Human readable message
    pub message: String,

    /// What the schema expected (`number`, `email`, `length >= 3`)
    pub expected: String,

    /// What the input contained (`"abc"`, `missing`)
    pub received: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            expected: expected.into(),
            received: received.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (expected {}, received {})",
            self.field, self.message, self.expected, self.received
        )
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new validation errors collection
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add an error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Iterate over the errors
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Get errors for a specific field
    pub fn get_field_errors(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    /// Convert to the `details` array sent back to clients
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.errors).unwrap_or(serde_json::Value::Array(Vec::new()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self::new(vec![error])
    }
}

/// A schema that cannot be turned into a checker
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid pattern `{pattern}` at `{field}`: {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("default for `{field}` does not satisfy its own schema: {reason}")]
    InvalidDefault { field: String, reason: String },
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_shape() {
        let errors = ValidationErrors::from(ValidationError::new(
            "age",
            "age must be a number",
            "number",
            "\"x\"",
        ));

        let json = errors.to_json();
        assert_eq!(json[0]["field"], "age");
        assert_eq!(json[0]["expected"], "number");
        assert_eq!(json[0]["received"], "\"x\"");
    }

    #[test]
    fn test_field_lookup() {
        let mut errors = ValidationErrors::default();
        errors.add(ValidationError::new("a", "bad", "string", "1"));
        errors.add(ValidationError::new("b", "bad", "string", "2"));
        errors.add(ValidationError::new("a", "worse", "email", "\"x\""));

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get_field_errors("a").len(), 2);
        assert!(errors.get_field_errors("c").is_empty());
    }
}
