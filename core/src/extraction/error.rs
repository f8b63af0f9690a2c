//! Error types for extraction operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::schema::ValueKind;

/// A single place where a response disagrees with the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON-pointer style location of the offending value (`/` is the root).
    pub path: String,
    /// Kind the schema requires at `path`.
    pub expected: ValueKind,
    /// Kind actually found at `path` ([`ValueKind::Missing`] for absent fields).
    pub actual: ValueKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "At path '{}': expected {}, found {}",
            self.path, self.expected, self.actual
        )
    }
}

/// Errors that can occur during an extraction.
///
/// `E` is the error type of the injected model; model failures are carried
/// through untouched so the caller can decide whether to retry or abort.
#[derive(Debug, Error)]
pub enum ExtractionError<E> {
    /// The model invocation itself failed.
    #[error(transparent)]
    Model(E),

    /// The recovered candidate text is not valid JSON.
    #[error("Failed to parse JSON response: {message}")]
    Parse {
        /// Parser error message.
        message: String,
        /// The complete, unmodified model response.
        raw_response: String,
    },

    /// The response is valid JSON but does not match the schema.
    #[error(
        "Failed to validate response structure: {} violation(s), first: {}",
        .violations.len(),
        .violations.first().map(ToString::to_string).unwrap_or_default()
    )]
    Validation {
        /// Every violation found, in document order.
        violations: Vec<Violation>,
        /// The parsed JSON that failed validation.
        value: Value,
        /// The complete, unmodified model response.
        raw_response: String,
    },

    /// The validated JSON could not be deserialized into the requested type.
    #[error("Deserialization to target type failed: {message}")]
    Deserialize {
        /// Deserializer error message.
        message: String,
        /// The validated JSON.
        value: Value,
    },
}

impl<E> ExtractionError<E> {
    /// Violations of a validation failure, empty for other variants.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }

    /// The raw model response, when one was received.
    #[must_use]
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Parse { raw_response, .. } | Self::Validation { raw_response, .. } => {
                Some(raw_response)
            }
            Self::Model(_) | Self::Deserialize { .. } => None,
        }
    }

    /// Whether the failure came from the model rather than its reply.
    #[must_use]
    pub const fn is_model_error(&self) -> bool {
        matches!(self, Self::Model(_))
    }

    /// Replaces the model error type, keeping reply failures intact.
    pub fn map_model<F, E2>(self, f: F) -> ExtractionError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Model(e) => ExtractionError::Model(f(e)),
            Self::Parse {
                message,
                raw_response,
            } => ExtractionError::Parse {
                message,
                raw_response,
            },
            Self::Validation {
                violations,
                value,
                raw_response,
            } => ExtractionError::Validation {
                violations,
                value,
                raw_response,
            },
            Self::Deserialize { message, value } => ExtractionError::Deserialize { message, value },
        }
    }
}
