//! Prompt assembly for structured extraction.

use serde_json::Value;

const STRUCTURE_INSTRUCTION: &str =
    "You must respond with a valid JSON object that exactly matches this structure:";

const CLOSING_DIRECTIVE: &str = "Make sure to:
1. Include all required fields
2. Use the exact field names shown
3. Match the types exactly (strings, arrays, objects)
4. Format as valid JSON

Your response:";

/// Builds the full prompt sent to the model.
///
/// Layout: optional system preamble, the caller's prompt, the structure
/// instruction, the pretty-printed example and the closing directive.
///
/// # Examples
///
/// ```
/// use promptfit_core::extraction::build_prompt;
/// use serde_json::json;
///
/// let prompt = build_prompt(Some("Be terse."), "Summarize.", &json!({"title": "example_string"}));
/// assert!(prompt.starts_with("Be terse.\n\nSummarize."));
/// assert!(prompt.contains("\"title\": \"example_string\""));
/// assert!(prompt.ends_with("Your response:"));
/// ```
#[must_use]
pub fn build_prompt(system: Option<&str>, prompt: &str, example: &Value) -> String {
    let example_str = serde_json::to_string_pretty(example).unwrap_or_else(|_| example.to_string());

    let mut full = String::with_capacity(
        prompt.len() + example_str.len() + STRUCTURE_INSTRUCTION.len() + CLOSING_DIRECTIVE.len() + 64,
    );
    if let Some(system) = system {
        full.push_str(system);
        full.push_str("\n\n");
    }
    full.push_str(prompt);
    full.push_str("\n\n\n");
    full.push_str(STRUCTURE_INSTRUCTION);
    full.push('\n');
    full.push_str(&example_str);
    full.push_str("\n\n");
    full.push_str(CLOSING_DIRECTIVE);
    full
}
