//! Structural validation of parsed responses against a [`SchemaNode`].

use serde_json::Value;

use super::error::Violation;
use crate::schema::{SchemaNode, ValueKind};

/// Checks `value` against `schema` and returns every violation found.
///
/// Object fields are all required; extra fields are ignored. Array elements
/// are each checked against the element schema. `Unknown` accepts anything.
/// Traversal does not stop at the first mismatch, but it does not descend
/// into a value whose own kind is already wrong.
///
/// # Examples
///
/// ```
/// use promptfit_core::extraction::validate;
/// use promptfit_core::{SchemaNode, ValueKind};
/// use serde_json::json;
///
/// let schema = SchemaNode::object([("title", SchemaNode::String)]);
/// let violations = validate(&schema, &json!({ "title": 7 }));
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].path, "/title");
/// assert_eq!(violations[0].actual, ValueKind::Number);
/// ```
#[must_use]
pub fn validate(schema: &SchemaNode, value: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    walk(schema, value, &mut String::new(), &mut violations);
    violations
}

fn walk(schema: &SchemaNode, value: &Value, path: &mut String, out: &mut Vec<Violation>) {
    match (schema, value) {
        (SchemaNode::Unknown, _)
        | (SchemaNode::String, Value::String(_))
        | (SchemaNode::Number, Value::Number(_))
        | (SchemaNode::Boolean, Value::Bool(_)) => {}
        (SchemaNode::Object { fields }, Value::Object(map)) => {
            for (name, node) in fields {
                let len = path.len();
                push_segment(path, name);
                match map.get(name) {
                    Some(child) => walk(node, child, path, out),
                    None => out.push(violation(path, node.kind(), ValueKind::Missing)),
                }
                path.truncate(len);
            }
        }
        (SchemaNode::Array { element }, Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                let len = path.len();
                push_segment(path, &index.to_string());
                walk(element, item, path, out);
                path.truncate(len);
            }
        }
        _ => out.push(violation(path, schema.kind(), ValueKind::of(value))),
    }
}

fn violation(path: &str, expected: ValueKind, actual: ValueKind) -> Violation {
    Violation {
        path: if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        },
        expected,
        actual,
    }
}

/// Appends a JSON-pointer segment, escaping `~` and `/`.
fn push_segment(path: &mut String, segment: &str) {
    path.push('/');
    for c in segment.chars() {
        match c {
            '~' => path.push_str("~0"),
            '/' => path.push_str("~1"),
            _ => path.push(c),
        }
    }
}
