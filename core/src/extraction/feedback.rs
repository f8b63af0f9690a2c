//! Repair-prompt builders for callers that choose to re-prompt.
//!
//! The extractor never retries on its own. An outer loop can append one of
//! these messages to the previous prompt and call the extractor again.

use serde_json::Value;

use super::error::{ExtractionError, Violation};
use crate::schema::SchemaNode;
use crate::trim::char_prefix;

/// How much of an unparseable response is echoed back, in characters.
pub const RAW_ECHO_CHARS: usize = 500;

/// Build validation feedback message for the model with complete error context.
///
/// Includes:
/// - Attempt counter (e.g., "Attempt 2/3")
/// - All violations with their paths
/// - The expected structure (synthesized example)
/// - Echoed submission (so the model can compare)
/// - Instruction to fix and resubmit
///
/// # Examples
///
/// ```
/// use promptfit_core::extraction::{build_validation_feedback, Violation};
/// use promptfit_core::{SchemaNode, ValueKind};
/// use serde_json::json;
///
/// let schema = SchemaNode::object([("name", SchemaNode::String)]);
/// let instance = json!({"name": 123});
/// let violations = vec![Violation {
///     path: "/name".to_string(),
///     expected: ValueKind::String,
///     actual: ValueKind::Number,
/// }];
///
/// let feedback = build_validation_feedback(&schema, &instance, &violations, 1, 3);
/// assert!(feedback.contains("Attempt 1/3"));
/// assert!(feedback.contains("JSON validation failed"));
/// ```
#[must_use]
pub fn build_validation_feedback(
    schema: &SchemaNode,
    instance: &Value,
    violations: &[Violation],
    attempt: usize,
    max_attempts: usize,
) -> String {
    let mut feedback = format!("Attempt {attempt}/{max_attempts}: JSON validation failed.\n\n");

    feedback.push_str("Errors:\n");
    for violation in violations {
        feedback.push_str("  - ");
        feedback.push_str(&violation.to_string());
        feedback.push('\n');
    }

    feedback.push_str("\nExpected structure:\n");
    feedback.push_str(&pretty(&schema.example()));

    feedback.push_str("\n\nYour submission:\n");
    feedback.push_str(&pretty(instance));

    feedback.push_str("\n\nPlease fix all errors and resubmit.");

    feedback
}

/// Build parse error feedback for when the model output is not valid JSON.
///
/// Includes:
/// - Attempt counter
/// - Parse error message
/// - Truncated raw output (first 500 chars)
/// - Expected structure (for reference)
/// - Instruction to respond with valid JSON
///
/// # Examples
///
/// ```
/// use promptfit_core::extraction::build_parse_error_feedback;
/// use promptfit_core::SchemaNode;
///
/// let schema = SchemaNode::object([("name", SchemaNode::String)]);
/// let feedback = build_parse_error_feedback("This is not JSON at all!", "expected value", 1, 3, &schema);
/// assert!(feedback.contains("Attempt 1/3"));
/// assert!(feedback.contains("Could not parse"));
/// ```
#[must_use]
pub fn build_parse_error_feedback(
    raw_text: &str,
    parse_error: &str,
    attempt: usize,
    max_attempts: usize,
    schema: &SchemaNode,
) -> String {
    let mut feedback = format!(
        "Attempt {attempt}/{max_attempts}: Could not parse your response as JSON.\n\n"
    );

    feedback.push_str("Parse error: ");
    feedback.push_str(parse_error);
    feedback.push_str("\n\n");

    feedback.push_str("Your response (first 500 chars):\n");
    let truncated = char_prefix(raw_text, RAW_ECHO_CHARS);
    feedback.push_str(truncated);
    if truncated.len() < raw_text.len() {
        feedback.push_str("...");
    }

    feedback.push_str("\n\nExpected structure:\n");
    feedback.push_str(&pretty(&schema.example()));

    feedback.push_str("\n\nPlease respond with valid JSON matching the structure above.");

    feedback
}

/// Feedback for a reply failure, or `None` for model and deserialization
/// errors, which the model cannot fix by rewriting its answer.
#[must_use]
pub fn build_feedback<E>(
    error: &ExtractionError<E>,
    schema: &SchemaNode,
    attempt: usize,
    max_attempts: usize,
) -> Option<String> {
    match error {
        ExtractionError::Parse {
            message,
            raw_response,
        } => Some(build_parse_error_feedback(
            raw_response,
            message,
            attempt,
            max_attempts,
            schema,
        )),
        ExtractionError::Validation {
            violations, value, ..
        } => Some(build_validation_feedback(
            schema,
            value,
            violations,
            attempt,
            max_attempts,
        )),
        ExtractionError::Model(_) | ExtractionError::Deserialize { .. } => None,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
