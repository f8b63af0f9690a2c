//! Single-shot structured extraction.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::ExtractionError;
use super::model::LanguageModel;
use super::prompt::build_prompt;
use super::recover::recover_json;
use super::validate::validate;
use crate::schema::SchemaNode;

/// Coerces a model's free-form reply into a value matching a schema.
///
/// The extractor formats the prompt with an example synthesized from the
/// schema, invokes the model once, recovers the JSON candidate, parses it and
/// validates it. It never retries: parse and validation failures come back
/// as typed errors so the caller can re-prompt, fall back or abort.
///
/// # Examples
///
/// ```
/// use promptfit_core::{SchemaNode, StructuredExtractor};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = SchemaNode::object([
///     ("title", SchemaNode::String),
///     ("tags", SchemaNode::array(SchemaNode::String)),
/// ]);
/// let extractor = StructuredExtractor::new(schema);
///
/// let model = |_prompt: String| async {
///     Ok::<_, std::io::Error>(
///         "Here you go.\n```json\n{\"title\": \"Report\", \"tags\": [\"a\",\"b\"]}\n```".to_string(),
///     )
/// };
///
/// let value = extractor.extract(&model, "Summarize the findings").await?;
/// assert_eq!(value, json!({ "title": "Report", "tags": ["a", "b"] }));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StructuredExtractor {
    schema: SchemaNode,
    system: Option<String>,
}

impl StructuredExtractor {
    /// Creates an extractor for the given schema.
    #[must_use]
    pub const fn new(schema: SchemaNode) -> Self {
        Self {
            schema,
            system: None,
        }
    }

    /// Sets a system preamble placed before the caller's prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// The schema replies are validated against.
    #[must_use]
    pub const fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    /// The system preamble, if any.
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// The example value shown to the model.
    #[must_use]
    pub fn example(&self) -> Value {
        self.schema.example()
    }

    /// The full prompt that [`extract`](Self::extract) sends for `prompt`.
    #[must_use]
    pub fn build_prompt(&self, prompt: &str) -> String {
        build_prompt(self.system.as_deref(), prompt, &self.example())
    }

    /// Runs one extraction round trip.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Model` with the model's own error if the
    /// invocation fails, `ExtractionError::Parse` if no JSON could be parsed
    /// from the reply and `ExtractionError::Validation` listing every
    /// violation if the JSON does not match the schema.
    pub async fn extract<M>(
        &self,
        model: &M,
        prompt: &str,
    ) -> Result<Value, ExtractionError<M::Error>>
    where
        M: LanguageModel + ?Sized,
    {
        let full_prompt = self.build_prompt(prompt);
        debug!(prompt_chars = full_prompt.len(), "invoking model");

        let response = model
            .invoke(&full_prompt)
            .await
            .map_err(ExtractionError::Model)?;

        debug!(response_chars = response.len(), "model responded");
        self.parse_response(&response)
    }

    /// Like [`extract`](Self::extract), then deserializes into `T`.
    ///
    /// # Errors
    ///
    /// Everything [`extract`](Self::extract) returns, plus
    /// `ExtractionError::Deserialize` if the validated JSON does not fit `T`.
    pub async fn extract_typed<T, M>(
        &self,
        model: &M,
        prompt: &str,
    ) -> Result<T, ExtractionError<M::Error>>
    where
        T: DeserializeOwned,
        M: LanguageModel + ?Sized,
    {
        let value = self.extract(model, prompt).await?;
        serde_json::from_value(value.clone()).map_err(|e| ExtractionError::Deserialize {
            message: e.to_string(),
            value,
        })
    }

    /// Recovers, parses and validates an already obtained model reply.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Parse` or `ExtractionError::Validation`;
    /// never `ExtractionError::Model`.
    pub fn parse_response<E>(&self, response: &str) -> Result<Value, ExtractionError<E>> {
        let candidate = recover_json(response);
        debug!(source = ?candidate.source, "recovered JSON candidate");

        let value: Value = serde_json::from_str(candidate.text).map_err(|e| {
            warn!(error = %e, "model response is not valid JSON");
            ExtractionError::Parse {
                message: e.to_string(),
                raw_response: response.to_string(),
            }
        })?;

        let violations = validate(&self.schema, &value);
        if !violations.is_empty() {
            warn!(
                count = violations.len(),
                "model response does not match schema"
            );
            return Err(ExtractionError::Validation {
                violations,
                value,
                raw_response: response.to_string(),
            });
        }

        Ok(value)
    }
}

/// Runs one extraction against a caller-owned schema.
///
/// Equivalent to building a [`StructuredExtractor`] for `schema` and `system`
/// and calling [`StructuredExtractor::extract`].
///
/// # Errors
///
/// See [`StructuredExtractor::extract`].
pub async fn extract<M>(
    model: &M,
    schema: &SchemaNode,
    prompt: &str,
    system: Option<&str>,
) -> Result<Value, ExtractionError<M::Error>>
where
    M: LanguageModel + ?Sized,
{
    let mut extractor = StructuredExtractor::new(schema.clone());
    extractor.system = system.map(str::to_owned);
    extractor.extract(model, prompt).await
}
