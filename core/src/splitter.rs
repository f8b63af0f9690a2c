//! Text splitting interface used to find semantic trim points.

use std::sync::Arc;

/// Chunking parameters handed to a [`TextSplitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    /// Target maximum chunk length, in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl SplitConfig {
    /// Config with the given chunk size and no overlap.
    #[must_use]
    pub const fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap: 0,
        }
    }

    /// Set the chunk overlap.
    #[must_use]
    pub const fn with_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }
}

/// Splits text into ordered chunks, preferring higher-level boundaries
/// (paragraph, sentence, word) before raw character cuts.
///
/// Concatenating the returned chunks should (nearly) reconstruct the input.
pub trait TextSplitter: Send + Sync {
    /// Split `text` into chunks of at most `config.chunk_size` characters.
    fn split(&self, text: &str, config: &SplitConfig) -> Vec<String>;
}

impl<S: TextSplitter + ?Sized> TextSplitter for &S {
    fn split(&self, text: &str, config: &SplitConfig) -> Vec<String> {
        (**self).split(text, config)
    }
}

impl<S: TextSplitter + ?Sized> TextSplitter for Arc<S> {
    fn split(&self, text: &str, config: &SplitConfig) -> Vec<String> {
        (**self).split(text, config)
    }
}

impl<S: TextSplitter + ?Sized> TextSplitter for Box<S> {
    fn split(&self, text: &str, config: &SplitConfig) -> Vec<String> {
        (**self).split(text, config)
    }
}
