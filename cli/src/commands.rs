//! Subcommand bodies, kept free of argument parsing so they can be tested.

use std::convert::Infallible;
use std::io::Read;
use std::path::Path;

use clap::ValueEnum;
use promptfit_core::extraction::build_feedback;
use promptfit_core::{
    ExtractionError, LanguageModel, PromptTrimmer, SchemaNode, StructuredExtractor, Tokenizer,
    TrimConfig,
};
use promptfit_text::{CharEstimateTokenizer, RecursiveCharacterSplitter, TiktokenTokenizer, WordTokenizer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::CliError;

/// Token counter selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TokenizerKind {
    /// Exact `o200k_base` BPE counts.
    #[default]
    O200k,
    /// Exact `cl100k_base` BPE counts.
    Cl100k,
    /// One token per whitespace-separated word.
    Words,
    /// One token per four characters.
    Chars,
}

impl TokenizerKind {
    /// Builds the tokenizer.
    pub fn build(self) -> Result<Box<dyn Tokenizer>, CliError> {
        let tokenizer: Box<dyn Tokenizer> = match self {
            Self::O200k => Box::new(TiktokenTokenizer::o200k()?),
            Self::Cl100k => Box::new(TiktokenTokenizer::cl100k()?),
            Self::Words => Box::new(WordTokenizer::default()),
            Self::Chars => Box::new(CharEstimateTokenizer),
        };
        Ok(tokenizer)
    }
}

/// Reads a file, or stdin when `path` is `None` or `-`.
pub fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) if path != Path::new("-") => {
            std::fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Stdin)?;
            Ok(buffer)
        }
    }
}

/// Loads a schema file in the `SchemaNode` JSON format.
pub fn load_schema(path: &Path) -> Result<SchemaNode, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Schema {
        path: path.to_path_buf(),
        source,
    })
}

/// Trims `text` with the selected tokenizer and the recursive splitter.
pub fn trim_text(text: &str, tokenizer: TokenizerKind, config: TrimConfig) -> Result<String, CliError> {
    let trimmer = PromptTrimmer::with_config(
        tokenizer.build()?,
        RecursiveCharacterSplitter::new(),
        config,
    );
    let trimmed = trimmer.trim(text);
    info!(
        input_chars = text.chars().count(),
        output_chars = trimmed.chars().count(),
        context_size = config.context_size,
        "trimmed prompt"
    );
    Ok(trimmed)
}

/// Trims an extraction prompt so that the fully assembled request, schema
/// instructions included, fits `config.context_size`.
pub fn fit_prompt(
    extractor: &StructuredExtractor,
    prompt: &str,
    tokenizer: TokenizerKind,
    config: TrimConfig,
) -> Result<String, CliError> {
    let tokenizer = tokenizer.build()?;
    let overhead = tokenizer.count_tokens(&extractor.build_prompt(""));
    if overhead >= config.context_size {
        warn!(
            overhead,
            context_size = config.context_size,
            "schema instructions alone exceed the context size"
        );
    }
    let budget = config.context_size.saturating_sub(overhead);

    let trimmer = PromptTrimmer::with_config(tokenizer, RecursiveCharacterSplitter::new(), config);
    let trimmed = trimmer.trim_to(prompt, budget);
    info!(
        input_chars = prompt.chars().count(),
        output_chars = trimmed.chars().count(),
        overhead,
        budget,
        "fitted extraction prompt"
    );
    Ok(trimmed)
}

/// The example a schema synthesizes, or its JSON Schema rendering.
pub fn render_example(schema: &SchemaNode, json_schema: bool) -> Result<String, CliError> {
    let value = if json_schema {
        schema.to_json_schema()
    } else {
        schema.example()
    };
    serde_json::to_string_pretty(&value).map_err(CliError::Render)
}

/// Recovers, parses and validates a saved model response.
pub fn validate_response(
    schema: &SchemaNode,
    response: &str,
) -> Result<Value, ExtractionError<Infallible>> {
    StructuredExtractor::new(schema.clone()).parse_response(response)
}

/// Runs extraction, re-prompting with repair feedback after parse or
/// validation failures until `max_attempts` calls have been made.
///
/// Model errors end the loop immediately. When every attempt fails the
/// last error is returned.
pub async fn extract_with_retries<M>(
    model: &M,
    extractor: &StructuredExtractor,
    prompt: &str,
    max_attempts: usize,
) -> Result<Value, ExtractionError<M::Error>>
where
    M: LanguageModel + ?Sized,
{
    let max_attempts = max_attempts.max(1);
    let mut current = prompt.to_string();
    let mut attempt = 1;

    loop {
        debug!(attempt, max_attempts, "extraction attempt");
        let error = match extractor.extract(model, &current).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt >= max_attempts {
            return Err(error);
        }
        let Some(feedback) = build_feedback(&error, extractor.schema(), attempt, max_attempts)
        else {
            return Err(error);
        };

        warn!(attempt, max_attempts, error = %error, "extraction failed, re-prompting");
        current = format!("{prompt}\n\n{feedback}");
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn schema() -> SchemaNode {
        SchemaNode::object([("title", SchemaNode::String), ("score", SchemaNode::Number)])
    }

    #[test]
    fn test_load_schema_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "object", "fields": {{"title": {{"type": "string"}}, "score": {{"type": "number"}}}}}}"#
        )
        .unwrap();
        assert_eq!(load_schema(file.path()).unwrap(), schema());
    }

    #[test]
    fn test_load_schema_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_schema(&missing), Err(CliError::Read { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"type": "tuple"}"#).unwrap();
        let error = load_schema(&bad).unwrap_err();
        assert!(matches!(error, CliError::Schema { .. }));
        assert!(error.to_string().contains("bad.json"));
    }

    #[test]
    fn test_render_example() {
        let rendered = render_example(&schema(), false).unwrap();
        assert_eq!(rendered, "{\n  \"title\": \"example_string\",\n  \"score\": 123\n}");

        let rendered = render_example(&schema(), true).unwrap();
        assert!(rendered.contains("\"required\""));
    }

    #[test]
    fn test_validate_response() {
        let value = validate_response(&schema(), "Sure:\n```json\n{\"title\": \"a\", \"score\": 1.5}\n```")
            .unwrap();
        assert_eq!(value["score"], 1.5);

        let error = validate_response(&schema(), "{\"title\": 3}").unwrap_err();
        assert_eq!(error.violations().len(), 2);
    }

    #[test]
    fn test_trim_text_words() {
        let text = "alpha beta gamma delta ".repeat(100);
        let config = TrimConfig::default().with_context_size(50);
        let trimmed = trim_text(&text, TokenizerKind::Words, config).unwrap();
        assert!(trimmed.split_whitespace().count() <= 50);
        assert!(text.starts_with(&trimmed));
    }

    #[test]
    fn test_fit_prompt_leaves_room_for_instructions() {
        let extractor = StructuredExtractor::new(schema()).with_system("You rate articles.");
        let text = "alpha beta gamma delta ".repeat(100);
        let config = TrimConfig::default().with_context_size(120);

        let fitted = fit_prompt(&extractor, &text, TokenizerKind::Words, config).unwrap();
        assert!(text.starts_with(&fitted));
        assert!(!fitted.is_empty());
        let assembled = extractor.build_prompt(&fitted);
        assert!(assembled.split_whitespace().count() <= 120);
    }

    #[tokio::test]
    async fn test_retries_stop_on_success() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let model = |prompt: String| {
            let attempt = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Ok::<_, std::io::Error>("no json here".to_string())
                } else {
                    assert!(prompt.contains("Attempt 1/3: Could not parse"));
                    Ok("{\"title\": \"ok\", \"score\": 2}".to_string())
                }
            }
        };

        let extractor = StructuredExtractor::new(schema());
        let value = extract_with_retries(&model, &extractor, "Rate it", 3).await.unwrap();
        assert_eq!(value["title"], "ok");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let model = |_prompt: String| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Ok::<_, std::io::Error>("{\"title\": 1}".to_string()) }
        };

        let extractor = StructuredExtractor::new(schema());
        let error = extract_with_retries(&model, &extractor, "Rate it", 3)
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Validation { .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_model_errors_are_not_retried() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let model = |_prompt: String| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err::<String, _>(std::io::Error::other("down")) }
        };

        let extractor = StructuredExtractor::new(schema());
        let error = extract_with_retries(&model, &extractor, "Rate it", 5)
            .await
            .unwrap_err();
        assert!(error.is_model_error());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
