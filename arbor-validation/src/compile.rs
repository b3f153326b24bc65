// Schema compilation and checking

use crate::errors::{SchemaError, ValidationError, ValidationErrors};
use crate::formats::{anchored, matches_format};
use crate::schema::{Schema, SchemaKind, StringFormat};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write as _;

const RECEIVED_LIMIT: usize = 64;

/// A schema turned into a ready-to-run checker.
///
/// Regular expressions are compiled once and defaults are pre-coerced, so
/// checking a value does no setup work. Obtain one through
/// [`compile`](crate::compile) to share it process-wide, or with
/// [`CompiledSchema::new`] for a private, uncached instance.
#[derive(Debug)]
pub struct CompiledSchema {
    root: Node,
}

#[derive(Debug)]
struct Node {
    check: Check,
    optional: bool,
    nullable: bool,
    default: Option<Value>,
}

#[derive(Debug)]
enum Check {
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        format: Option<StringFormat>,
        pattern: Option<(String, Regex)>,
        one_of: Vec<String>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean,
    Array {
        items: Box<Node>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        fields: Vec<(String, Node)>,
        strict: bool,
    },
    Any,
}

impl Check {
    fn type_name(&self) -> &'static str {
        match self {
            Check::String { .. } => "string",
            Check::Number { integer: true, .. } => "integer",
            Check::Number { .. } => "number",
            Check::Boolean => "boolean",
            Check::Array { .. } => "array",
            Check::Object { .. } => "object",
            Check::Any => "any",
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Render a field path as `address.zip` / `tags[1]`
fn render_path(path: &[Segment], label: &str) -> String {
    if path.is_empty() {
        return label.to_string();
    }
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => {
                let _ = write!(out, "[{}]", index);
            }
        }
    }
    out
}

/// Compact description of a received value
fn describe(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= RECEIVED_LIMIT {
        return rendered;
    }
    let mut truncated: String = rendered.chars().take(RECEIVED_LIMIT).collect();
    truncated.push_str("...");
    truncated
}

struct Walk<'a> {
    label: &'a str,
    path: Vec<Segment>,
    errors: Vec<ValidationError>,
}

impl<'a> Walk<'a> {
    fn new(label: &'a str) -> Self {
        Self {
            label,
            path: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn field(&self) -> String {
        render_path(&self.path, self.label)
    }

    fn fail(&mut self, message: impl AsRef<str>, expected: impl Into<String>, received: String) {
        let field = self.field();
        let message = format!("{} {}", field, message.as_ref());
        self.errors
            .push(ValidationError::new(field, message, expected, received));
    }
}

fn compile_node(schema: &Schema, path: &mut Vec<Segment>) -> Result<Node, SchemaError> {
    let check = match &schema.kind {
        SchemaKind::String(rules) => {
            let pattern = match &rules.pattern {
                Some(source) => {
                    let regex = Regex::new(&anchored(source)).map_err(|e| {
                        SchemaError::InvalidPattern {
                            field: render_path(path, "value"),
                            pattern: source.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    Some((source.clone(), regex))
                }
                None => None,
            };
            Check::String {
                min_length: rules.min_length,
                max_length: rules.max_length,
                format: rules.format,
                pattern,
                one_of: rules.one_of.clone(),
            }
        }
        SchemaKind::Number(rules) => Check::Number {
            integer: rules.integer,
            minimum: rules.minimum,
            maximum: rules.maximum,
        },
        SchemaKind::Boolean => Check::Boolean,
        SchemaKind::Array {
            items,
            min_items,
            max_items,
        } => {
            path.push(Segment::Index(0));
            let items = compile_node(items, path);
            path.pop();
            Check::Array {
                items: Box::new(items?),
                min_items: *min_items,
                max_items: *max_items,
            }
        }
        SchemaKind::Object { properties, strict } => {
            let mut fields = Vec::with_capacity(properties.len());
            for (name, property) in properties {
                path.push(Segment::Key(name.clone()));
                let node = compile_node(property, path);
                path.pop();
                fields.push((name.clone(), node?));
            }
            Check::Object {
                fields,
                strict: *strict,
            }
        }
        SchemaKind::Any => Check::Any,
    };

    let mut node = Node {
        check,
        optional: schema.optional,
        nullable: schema.nullable,
        default: None,
    };

    // Defaults are checked once here and stored in coerced form.
    if let Some(default) = &schema.default {
        let mut walk = Walk::new("default");
        walk.path = path.clone();
        let coerced = visit(&node, Some(default.clone()), &mut walk);
        if let Some(error) = walk.errors.first() {
            return Err(SchemaError::InvalidDefault {
                field: render_path(path, "value"),
                reason: error.message.clone(),
            });
        }
        node.default = coerced;
    }

    Ok(node)
}

fn visit(node: &Node, input: Option<Value>, walk: &mut Walk<'_>) -> Option<Value> {
    let value = match input {
        Some(value) => value,
        None => match &node.default {
            Some(default) => return Some(default.clone()),
            None if node.optional => return None,
            None => {
                walk.fail("is required", node.check.type_name(), "missing".to_string());
                return None;
            }
        },
    };

    if value.is_null() && (node.nullable || matches!(node.check, Check::Any)) {
        return Some(Value::Null);
    }

    match &node.check {
        Check::Any => Some(value),
        Check::String {
            min_length,
            max_length,
            format,
            pattern,
            one_of,
        } => {
            let Value::String(text) = &value else {
                walk.fail("must be a string", "string", describe(&value));
                return None;
            };
            let before = walk.errors.len();
            let length = text.chars().count();
            if let Some(min) = min_length {
                if length < *min {
                    walk.fail(
                        format!("must be at least {} characters", min),
                        format!("length >= {}", min),
                        describe(&value),
                    );
                }
            }
            if let Some(max) = max_length {
                if length > *max {
                    walk.fail(
                        format!("must be at most {} characters", max),
                        format!("length <= {}", max),
                        describe(&value),
                    );
                }
            }
            if let Some(format) = format {
                if !matches_format(*format, text) {
                    walk.fail(
                        format!("must be a valid {}", format.as_str()),
                        format.as_str(),
                        describe(&value),
                    );
                }
            }
            if let Some((source, regex)) = pattern {
                if !regex.is_match(text) {
                    walk.fail(
                        format!("must match pattern {}", source),
                        format!("pattern /{}/", source),
                        describe(&value),
                    );
                }
            }
            if !one_of.is_empty() && !one_of.iter().any(|allowed| allowed == text) {
                walk.fail(
                    format!("must be one of: {}", one_of.join(", ")),
                    format!("one of [{}]", one_of.join(", ")),
                    describe(&value),
                );
            }
            (walk.errors.len() == before).then_some(value)
        }
        Check::Number {
            integer,
            minimum,
            maximum,
        } => {
            let Some((number, coerced)) = coerce_number(&value) else {
                let message = if *integer {
                    "must be an integer"
                } else {
                    "must be a number"
                };
                walk.fail(message, node.check.type_name(), describe(&value));
                return None;
            };
            let whole = if *integer {
                match integral(number, &coerced) {
                    Some(whole) => Some(whole),
                    None => {
                        walk.fail("must be an integer", "integer", describe(&value));
                        return None;
                    }
                }
            } else {
                None
            };
            let before = walk.errors.len();
            if let Some(min) = minimum {
                if number < *min {
                    walk.fail(
                        format!("must be at least {}", min),
                        format!(">= {}", min),
                        describe(&value),
                    );
                }
            }
            if let Some(max) = maximum {
                if number > *max {
                    walk.fail(
                        format!("must be at most {}", max),
                        format!("<= {}", max),
                        describe(&value),
                    );
                }
            }
            if walk.errors.len() != before {
                return None;
            }
            Some(whole.unwrap_or(coerced))
        }
        Check::Boolean => match &value {
            Value::Bool(_) => Some(value),
            Value::String(text) if text == "true" => Some(Value::Bool(true)),
            Value::String(text) if text == "false" => Some(Value::Bool(false)),
            _ => {
                walk.fail("must be a boolean", "boolean", describe(&value));
                None
            }
        },
        Check::Array {
            items,
            min_items,
            max_items,
        } => {
            let elements = match value {
                Value::Array(elements) => elements,
                Value::Object(_) | Value::Null => {
                    walk.fail("must be an array", "array", describe(&value));
                    return None;
                }
                scalar => vec![scalar],
            };
            let before = walk.errors.len();
            if let Some(min) = min_items {
                if elements.len() < *min {
                    walk.fail(
                        format!("must have at least {} items", min),
                        format!("items >= {}", min),
                        format!("{} items", elements.len()),
                    );
                }
            }
            if let Some(max) = max_items {
                if elements.len() > *max {
                    walk.fail(
                        format!("must have at most {} items", max),
                        format!("items <= {}", max),
                        format!("{} items", elements.len()),
                    );
                }
            }
            let mut out = Vec::with_capacity(elements.len());
            for (index, element) in elements.into_iter().enumerate() {
                walk.path.push(Segment::Index(index));
                if let Some(item) = visit(items, Some(element), walk) {
                    out.push(item);
                }
                walk.path.pop();
            }
            (walk.errors.len() == before).then_some(Value::Array(out))
        }
        Check::Object { fields, strict } => {
            let Value::Object(mut map) = value else {
                walk.fail("must be an object", "object", describe(&value));
                return None;
            };
            let before = walk.errors.len();
            let mut out = Map::new();
            for (name, field) in fields {
                walk.path.push(Segment::Key(name.clone()));
                if let Some(checked) = visit(field, map.remove(name), walk) {
                    out.insert(name.clone(), checked);
                }
                walk.path.pop();
            }
            for (key, extra) in map {
                if *strict {
                    walk.path.push(Segment::Key(key));
                    walk.fail(
                        "is not an allowed property",
                        "no additional properties",
                        describe(&extra),
                    );
                    walk.path.pop();
                } else {
                    out.insert(key, extra);
                }
            }
            (walk.errors.len() == before).then_some(Value::Object(out))
        }
    }
}

/// Read a number out of a JSON number or a numeric string.
/// Integral strings become integer JSON numbers.
fn coerce_number(value: &Value) -> Option<(f64, Value)> {
    match value {
        Value::Number(number) => number.as_f64().map(|f| (f, value.clone())),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(int) = text.parse::<i64>() {
                return Some((int as f64, Value::from(int)));
            }
            let float = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
            serde_json::Number::from_f64(float).map(|n| (float, Value::Number(n)))
        }
        _ => None,
    }
}

/// The integer form of a number, or `None` when it has a fractional part
/// or does not fit in an `i64`/`u64`.
fn integral(number: f64, coerced: &Value) -> Option<Value> {
    if coerced.is_i64() || coerced.is_u64() {
        return Some(coerced.clone());
    }
    if number.fract() != 0.0 {
        return None;
    }
    // 2^63 and 2^64 are exact in f64; i64::MAX and u64::MAX are not.
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;
    if (-I64_BOUND..I64_BOUND).contains(&number) {
        Some(Value::from(number as i64))
    } else if (0.0..U64_BOUND).contains(&number) {
        Some(Value::from(number as u64))
    } else {
        None
    }
}

impl CompiledSchema {
    /// Compile a schema without going through the process-wide cache
    pub fn new(schema: &Schema) -> Result<Self, SchemaError> {
        let mut path = Vec::new();
        Ok(Self {
            root: compile_node(schema, &mut path)?,
        })
    }

    /// Check a value, returning the coerced and defaulted output.
    ///
    /// Errors on the root value are reported under the field name `value`.
    pub fn check(&self, input: Value) -> Result<Value, ValidationErrors> {
        self.check_input(Some(input), "value")
    }

    /// Check a possibly absent input. `label` names the root in errors,
    /// nested fields are reported relative to it (`age`, `tags[0]`).
    pub fn check_input(
        &self,
        input: Option<Value>,
        label: &str,
    ) -> Result<Value, ValidationErrors> {
        let mut walk = Walk::new(label);
        let output = visit(&self.root, input, &mut walk);
        if walk.errors.is_empty() {
            Ok(output.unwrap_or(Value::Null))
        } else {
            Err(ValidationErrors::new(walk.errors))
        }
    }

    pub fn is_valid(&self, input: &Value) -> bool {
        self.check(input.clone()).is_ok()
    }

    /// Name of the JSON type the root accepts
    pub fn type_name(&self) -> &'static str {
        self.root.check.type_name()
    }
}
