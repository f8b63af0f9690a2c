//! # promptfit-core
//!
//! Two primitives for working with a text-generation model under a strict
//! token budget:
//!
//! - [`PromptTrimmer`] narrows an oversized prompt to the largest prefix that
//!   fits a context window, using an injected [`Tokenizer`] and
//!   [`TextSplitter`]. It never fails.
//! - [`StructuredExtractor`] coerces a free-form model reply into a value
//!   validated against a caller-declared [`SchemaNode`], or a typed
//!   [`ExtractionError`].
//!
//! ## Example
//!
//! ```
//! use promptfit_core::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaNode::object([("title", SchemaNode::String)]);
//! let model = |_prompt: String| async {
//!     Ok::<_, std::io::Error>("{\"title\": \"Quarterly report\"}".to_string())
//! };
//!
//! let value = StructuredExtractor::new(schema).extract(&model, "Name it").await?;
//! assert_eq!(value, json!({ "title": "Quarterly report" }));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `rig`: [`extraction::RigModel`] adapter for Rig agents

/// Structured output extraction.
pub mod extraction;

/// Response schema description.
pub mod schema;

/// Text splitting interface.
pub mod splitter;

/// Token counting interface.
pub mod tokenizer;

/// Prompt trimming.
pub mod trim;

pub use extraction::{ExtractionError, LanguageModel, StructuredExtractor, Violation};
pub use schema::{SchemaNode, ValueKind};
pub use splitter::{SplitConfig, TextSplitter};
pub use tokenizer::Tokenizer;
pub use trim::{PromptTrimmer, TrimConfig};

/// Commonly used types and traits.
pub mod prelude {
    pub use crate::extraction::{
        build_feedback, ExtractionError, LanguageModel, StructuredExtractor, Violation,
    };
    pub use crate::schema::{SchemaNode, ValueKind};
    pub use crate::splitter::{SplitConfig, TextSplitter};
    pub use crate::tokenizer::Tokenizer;
    pub use crate::trim::{PromptTrimmer, TrimConfig};
}
