// Declarative schema model

use serde_json::Value;
use std::sync::Arc;

/// Well-known string formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Uuid,
    Uri,
}

impl StringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Uuid => "uuid",
            StringFormat::Uri => "uri",
        }
    }
}

/// Constraints for string schemas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub format: Option<StringFormat>,
    pub pattern: Option<String>,
    pub one_of: Vec<String>,
}

/// Constraints for numeric schemas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberRules {
    pub integer: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

/// The shape a schema describes
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    String(StringRules),
    Number(NumberRules),
    Boolean,
    Array {
        items: Box<Schema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        properties: Vec<(String, Schema)>,
        strict: bool,
    },
    Any,
}

/// A declarative description of the expected shape of some input.
///
/// Schemas are plain values built with the constructor functions and
/// modifier methods below. Modifiers that do not apply to the schema's kind
/// (for example `min_length` on a number) leave the schema unchanged.
///
/// ```
/// use arbor_validation::Schema;
///
/// let user = Schema::object([
///     ("name", Schema::string().min_length(1)),
///     ("email", Schema::string().email()),
///     ("age", Schema::integer().minimum(0.0).optional()),
///     ("role", Schema::string().one_of(["admin", "member"]).default("member")),
/// ]);
/// assert_eq!(user.type_name(), "object");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub kind: SchemaKind,
    pub optional: bool,
    pub nullable: bool,
    pub default: Option<Value>,
}

impl Schema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String(StringRules::default()))
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number(NumberRules::default()))
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Number(NumberRules {
            integer: true,
            ..NumberRules::default()
        }))
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean)
    }

    pub fn array(items: Schema) -> Self {
        Self::of(SchemaKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    /// Object schema. Every property is required unless marked `optional()`
    /// or given a `default`.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::of(SchemaKind::Object {
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
            strict: false,
        })
    }

    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    /// Wrap the schema in an `Arc`. Compiled checkers are cached by the
    /// identity of this `Arc`.
    pub fn shared(self) -> Arc<Schema> {
        Arc::new(self)
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value injected when the field is absent
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.min_length = Some(min);
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.max_length = Some(max);
        }
        self
    }

    pub fn format(mut self, format: StringFormat) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.format = Some(format);
        }
        self
    }

    pub fn email(self) -> Self {
        self.format(StringFormat::Email)
    }

    pub fn uuid(self) -> Self {
        self.format(StringFormat::Uuid)
    }

    pub fn uri(self) -> Self {
        self.format(StringFormat::Uri)
    }

    /// Regular expression the whole string must match
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.pattern = Some(pattern.into());
        }
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let SchemaKind::String(rules) = &mut self.kind {
            rules.one_of = values.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.minimum = Some(min);
        }
        self
    }

    pub fn maximum(mut self, max: f64) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            rules.maximum = Some(max);
        }
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        if let SchemaKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(min);
        }
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        if let SchemaKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(max);
        }
        self
    }

    /// Reject object keys that are not declared as properties
    pub fn strict(mut self) -> Self {
        if let SchemaKind::Object { strict, .. } = &mut self.kind {
            *strict = true;
        }
        self
    }

    /// Name of the JSON type this schema accepts
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::String(_) => "string",
            SchemaKind::Number(rules) if rules.integer => "integer",
            SchemaKind::Number(_) => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array { .. } => "array",
            SchemaKind::Object { .. } => "object",
            SchemaKind::Any => "any",
        }
    }

    /// Look up a property of an object schema
    pub fn property(&self, name: &str) -> Option<&Schema> {
        match &self.kind {
            SchemaKind::Object { properties, .. } => properties
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, schema)| schema),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_apply_to_matching_kind_only() {
        let s = Schema::string().min_length(2).minimum(4.0);
        match s.kind {
            SchemaKind::String(rules) => assert_eq!(rules.min_length, Some(2)),
            other => panic!("unexpected kind {:?}", other),
        }

        let n = Schema::number().min_length(2);
        assert_eq!(n, Schema::number());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Schema::integer().type_name(), "integer");
        assert_eq!(Schema::array(Schema::string()).type_name(), "array");
        assert_eq!(Schema::object([("a", Schema::any())]).type_name(), "object");
    }

    #[test]
    fn test_property_lookup() {
        let schema = Schema::object([("tags", Schema::array(Schema::string()))]);
        assert_eq!(schema.property("tags").map(Schema::type_name), Some("array"));
        assert!(schema.property("missing").is_none());
    }
}
