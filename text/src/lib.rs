//! Concrete collaborators for [`promptfit_core`]: tokenizers that measure
//! prompts and a recursive character splitter that finds semantic trim
//! points.

/// Token counters.
pub mod tokenizers;

/// Recursive character text splitter.
pub mod recursive;

pub use recursive::RecursiveCharacterSplitter;
pub use tokenizers::{CharEstimateTokenizer, Encoding, TiktokenTokenizer, TokenizerError, WordTokenizer};
