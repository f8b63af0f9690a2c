//! Caller-declared description of a structured response.
//!
//! A [`SchemaNode`] tree is the single source of truth for both the example
//! shown to the model and the validation applied to its reply.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Placeholder used for `string` nodes in synthesized examples.
pub const EXAMPLE_STRING: &str = "example_string";

/// Placeholder used for `number` nodes in synthesized examples.
pub const EXAMPLE_NUMBER: i64 = 123;

/// Placeholder used for `boolean` nodes in synthesized examples.
pub const EXAMPLE_BOOLEAN: bool = true;

/// Placeholder used for `unknown` nodes in synthesized examples.
pub const EXAMPLE_VALUE: &str = "example_value";

/// Expected shape of a JSON value.
///
/// Serialized with a `type` tag, so schemas can be loaded from JSON files:
///
/// ```
/// use promptfit_core::SchemaNode;
///
/// let schema: SchemaNode = serde_json::from_str(r#"{
///     "type": "object",
///     "fields": {
///         "title": { "type": "string" },
///         "tags": { "type": "array", "element": { "type": "string" } }
///     }
/// }"#).unwrap();
///
/// assert_eq!(
///     schema,
///     SchemaNode::object([
///         ("title", SchemaNode::String),
///         ("tags", SchemaNode::array(SchemaNode::String)),
///     ])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaNode {
    /// A JSON object whose fields are all required, in declaration order.
    Object {
        /// Field name to field schema.
        fields: IndexMap<String, SchemaNode>,
    },
    /// A JSON array whose elements all match `element`.
    Array {
        /// Schema of every element.
        element: Box<SchemaNode>,
    },
    /// A JSON string.
    String,
    /// A JSON number, integer or floating point.
    Number,
    /// A JSON boolean.
    Boolean,
    /// Any JSON value.
    Unknown,
}

impl SchemaNode {
    /// Builds an object node from `(name, schema)` pairs, keeping their order.
    #[must_use]
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Builds an array node.
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    /// The kind of value this node accepts.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Object { .. } => ValueKind::Object,
            Self::Array { .. } => ValueKind::Array,
            Self::String => ValueKind::String,
            Self::Number => ValueKind::Number,
            Self::Boolean => ValueKind::Boolean,
            Self::Unknown => ValueKind::Any,
        }
    }

    /// Synthesizes a placeholder value with this node's shape.
    ///
    /// Objects map every field to its own example, arrays hold exactly one
    /// element example. The values carry no meaning; they only show the model
    /// field names, nesting and types.
    #[must_use]
    pub fn example(&self) -> Value {
        match self {
            Self::Object { fields } => Value::Object(
                fields
                    .iter()
                    .map(|(name, node)| (name.clone(), node.example()))
                    .collect::<Map<String, Value>>(),
            ),
            Self::Array { element } => Value::Array(vec![element.example()]),
            Self::String => Value::String(EXAMPLE_STRING.to_string()),
            Self::Number => Value::from(EXAMPLE_NUMBER),
            Self::Boolean => Value::Bool(EXAMPLE_BOOLEAN),
            Self::Unknown => Value::String(EXAMPLE_VALUE.to_string()),
        }
    }

    /// Renders this node as a JSON Schema document.
    ///
    /// Every object field is listed under `required`; additional properties
    /// are allowed, matching [`validate`](crate::extraction::validate).
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Object { fields } => {
                let properties: Map<String, Value> = fields
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_json_schema()))
                    .collect();
                let required: Vec<&String> = fields.keys().collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }
            Self::Array { element } => json!({
                "type": "array",
                "items": element.to_json_schema(),
            }),
            Self::String => json!({ "type": "string" }),
            Self::Number => json!({ "type": "number" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Unknown => json!({}),
        }
    }
}

/// Kind of a JSON value, as reported in validation violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// JSON object.
    Object,
    /// JSON array.
    Array,
    /// JSON string.
    String,
    /// JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON `null`.
    Null,
    /// A required field that is absent.
    Missing,
    /// Anything (expected kind of an `unknown` node).
    Any,
}

impl ValueKind {
    /// The kind of a concrete JSON value.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Null => Self::Null,
        }
    }

    /// Lowercase name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Missing => "missing",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_schema() -> SchemaNode {
        SchemaNode::object([
            ("title", SchemaNode::String),
            ("score", SchemaNode::Number),
            ("published", SchemaNode::Boolean),
            (
                "sections",
                SchemaNode::array(SchemaNode::object([
                    ("heading", SchemaNode::String),
                    ("notes", SchemaNode::array(SchemaNode::String)),
                ])),
            ),
            ("extra", SchemaNode::Unknown),
        ])
    }

    #[test]
    fn test_example_shape() {
        let example = report_schema().example();
        assert_eq!(
            example,
            json!({
                "title": "example_string",
                "score": 123,
                "published": true,
                "sections": [{ "heading": "example_string", "notes": ["example_string"] }],
                "extra": "example_value",
            })
        );
    }

    #[test]
    fn test_example_keeps_field_order() {
        let schema = SchemaNode::object([
            ("zeta", SchemaNode::String),
            ("alpha", SchemaNode::String),
            ("mid", SchemaNode::Number),
        ]);
        let rendered = serde_json::to_string(&schema.example()).unwrap();
        assert_eq!(
            rendered,
            r#"{"zeta":"example_string","alpha":"example_string","mid":123}"#
        );
    }

    #[test]
    fn test_top_level_array_and_primitive_examples() {
        assert_eq!(
            SchemaNode::array(SchemaNode::Number).example(),
            json!([123])
        );
        assert_eq!(SchemaNode::Boolean.example(), json!(true));
        assert_eq!(SchemaNode::Unknown.example(), json!("example_value"));
    }

    #[test]
    fn test_serde_format() {
        let schema = report_schema();
        let encoded = serde_json::to_value(&schema).unwrap();
        assert_eq!(encoded["type"], "object");
        assert_eq!(encoded["fields"]["sections"]["type"], "array");
        assert_eq!(encoded["fields"]["sections"]["element"]["type"], "object");
        assert_eq!(encoded["fields"]["extra"], json!({ "type": "unknown" }));

        let decoded: SchemaNode = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, schema);
    }

    #[test]
    fn test_unknown_type_tag_rejected() {
        let result = serde_json::from_str::<SchemaNode>(r#"{"type": "date"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_to_json_schema() {
        let schema = SchemaNode::object([
            ("title", SchemaNode::String),
            ("tags", SchemaNode::array(SchemaNode::String)),
        ]);
        assert_eq!(
            schema.to_json_schema(),
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "tags": { "type": "array", "items": { "type": "string" } },
                },
                "required": ["title", "tags"],
            })
        );
    }

    #[test]
    fn test_example_satisfies_rendered_json_schema() {
        let schema = report_schema();
        let validator = jsonschema::Validator::new(&schema.to_json_schema()).unwrap();
        assert!(validator.is_valid(&schema.example()));
        assert!(!validator.is_valid(&json!({ "title": 5 })));
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
        assert_eq!(ValueKind::of(&json!(1.5)), ValueKind::Number);
        assert_eq!(ValueKind::of(&json!([])), ValueKind::Array);
        assert_eq!(SchemaNode::Unknown.kind(), ValueKind::Any);
        assert_eq!(ValueKind::Missing.to_string(), "missing");
    }
}
