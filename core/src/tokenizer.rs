//! Token counting interface used to measure prompts against a budget.

use std::sync::Arc;

/// Maps text to the number of tokens a model would see for it.
///
/// Implementations must be deterministic for a fixed input and safe to share
/// across concurrent trims.
pub trait Tokenizer: Send + Sync {
    /// Count the tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize;

    /// Count tokens for several texts.
    fn count_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.count_tokens(t)).collect()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }
}
