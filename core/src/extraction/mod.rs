//! Schema-guided structured output extraction.
//!
//! This module turns an unstructured model reply into a validated value:
//!
//! - [`StructuredExtractor`] - Prompt assembly, single model call, recovery and validation
//! - [`LanguageModel`] - The injected model invocation
//! - [`recover_json`] - Fenced block / brace span / whole response candidate search
//! - [`validate`] - Structural validation collecting every [`Violation`]
//! - [`ExtractionError`] - Typed failures carrying the raw response
//! - [`build_validation_feedback`] - Repair prompts for outer retry loops

pub mod error;
pub mod extractor;
pub mod feedback;
pub mod model;
pub mod prompt;
pub mod recover;
#[cfg(feature = "rig")]
pub mod rig_model;
pub mod validate;

pub use error::{ExtractionError, Violation};
pub use extractor::{extract, StructuredExtractor};
pub use feedback::{build_feedback, build_parse_error_feedback, build_validation_feedback};
pub use model::LanguageModel;
pub use prompt::build_prompt;
pub use recover::{recover_json, Candidate, CandidateSource};
#[cfg(feature = "rig")]
pub use rig_model::RigModel;
pub use validate::validate;
