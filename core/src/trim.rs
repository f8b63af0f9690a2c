//! Token-aware prompt trimming.
//!
//! [`PromptTrimmer`] narrows an oversized prompt to the largest prefix it can
//! find that fits a token budget. Each round estimates how many characters to
//! drop from the token overflow, asks the splitter for a chunk of that size
//! and re-measures, because split points never line up exactly with token
//! boundaries. Trimming never fails: when semantic splitting stops paying off
//! it falls back to a hard character cut.

use std::borrow::Cow;

use tracing::debug;

use crate::splitter::{SplitConfig, TextSplitter};
use crate::tokenizer::Tokenizer;

/// Default context window, in tokens.
pub const DEFAULT_CONTEXT_SIZE: usize = 128_000;

/// Default characters-per-token estimate.
pub const DEFAULT_CHARS_PER_TOKEN: usize = 3;

/// Default floor below which a hard character cut is used, in characters.
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 140;

/// Configuration for [`PromptTrimmer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimConfig {
    /// Token budget used by [`PromptTrimmer::trim`] (default: 128,000).
    pub context_size: usize,
    /// Average characters per token used to turn a token overflow into a
    /// character target (default: 3).
    pub chars_per_token: usize,
    /// Smallest chunk worth splitting semantically (default: 140 characters).
    pub min_chunk_size: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            context_size: DEFAULT_CONTEXT_SIZE,
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }
}

impl TrimConfig {
    /// Set the default token budget.
    #[must_use]
    pub const fn with_context_size(mut self, context_size: usize) -> Self {
        self.context_size = context_size;
        self
    }

    /// Set the characters-per-token estimate. Zero is treated as one.
    #[must_use]
    pub const fn with_chars_per_token(mut self, chars_per_token: usize) -> Self {
        self.chars_per_token = chars_per_token;
        self
    }

    /// Set the hard-cut floor.
    #[must_use]
    pub const fn with_min_chunk_size(mut self, min_chunk_size: usize) -> Self {
        self.min_chunk_size = min_chunk_size;
        self
    }
}

/// Trims prompts to a token budget using an injected tokenizer and splitter.
///
/// # Examples
///
/// ```
/// use promptfit_core::{PromptTrimmer, SplitConfig, TextSplitter, Tokenizer};
///
/// struct Words;
/// impl Tokenizer for Words {
///     fn count_tokens(&self, text: &str) -> usize {
///         text.split_whitespace().count()
///     }
/// }
///
/// struct Prefix;
/// impl TextSplitter for Prefix {
///     fn split(&self, text: &str, config: &SplitConfig) -> Vec<String> {
///         vec![text.chars().take(config.chunk_size).collect()]
///     }
/// }
///
/// let trimmer = PromptTrimmer::new(Words, Prefix);
/// let text = "word ".repeat(1_000);
/// let trimmed = trimmer.trim_to(&text, 100);
/// assert!(Words.count_tokens(&trimmed) <= 100);
/// assert!(text.starts_with(&trimmed));
/// ```
#[derive(Debug, Clone)]
pub struct PromptTrimmer<T, S> {
    tokenizer: T,
    splitter: S,
    config: TrimConfig,
}

impl<T, S> PromptTrimmer<T, S>
where
    T: Tokenizer,
    S: TextSplitter,
{
    /// Creates a trimmer with the default configuration.
    #[must_use]
    pub fn new(tokenizer: T, splitter: S) -> Self {
        Self::with_config(tokenizer, splitter, TrimConfig::default())
    }

    /// Creates a trimmer with the given configuration.
    #[must_use]
    pub const fn with_config(tokenizer: T, splitter: S, config: TrimConfig) -> Self {
        Self {
            tokenizer,
            splitter,
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &TrimConfig {
        &self.config
    }

    /// The tokenizer used for measuring.
    #[must_use]
    pub const fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Trims `text` to the configured context size.
    #[must_use]
    pub fn trim(&self, text: &str) -> String {
        self.trim_to(text, self.config.context_size)
    }

    /// Trims `text` so that it fits in `budget` tokens.
    ///
    /// Returns `text` unchanged when it already fits. Otherwise returns a
    /// prefix of `text` that fits the budget, or the first `min_chunk_size`
    /// characters when the budget is too small for semantic splitting.
    /// Leading whitespace is kept even when the splitter trims it; trailing
    /// whitespace at the cut may be dropped.
    #[must_use]
    pub fn trim_to(&self, text: &str, budget: usize) -> String {
        let chars_per_token = self.config.chars_per_token.max(1);
        let mut current: Cow<'_, str> = Cow::Borrowed(text);
        let mut round = 0usize;

        loop {
            if current.is_empty() {
                return String::new();
            }

            let tokens = self.tokenizer.count_tokens(&current);
            if tokens <= budget {
                debug!(round, tokens, budget, "prompt fits budget");
                return current.into_owned();
            }

            round += 1;
            let length = current.chars().count();
            let overflow = tokens - budget;
            let chunk_size = length.saturating_sub(overflow.saturating_mul(chars_per_token));

            debug!(round, tokens, budget, length, chunk_size, "trimming prompt");

            if chunk_size < self.config.min_chunk_size {
                debug!(
                    floor = self.config.min_chunk_size,
                    "chunk below floor, using hard cut"
                );
                return char_prefix(&current, self.config.min_chunk_size).to_owned();
            }

            let candidate = self
                .splitter
                .split(&current, &SplitConfig::new(chunk_size))
                .into_iter()
                .next()
                .filter(|chunk| !chunk.is_empty())
                .map(|chunk| restore_leading_whitespace(&current, chunk))
                .filter(|chunk| chunk.chars().count() < length);

            current = match candidate {
                Some(chunk) => Cow::Owned(chunk),
                None => {
                    debug!(chunk_size, "splitter made no progress, using hard cut");
                    match current {
                        Cow::Borrowed(s) => Cow::Borrowed(char_prefix(s, chunk_size)),
                        Cow::Owned(s) => Cow::Owned(char_prefix(&s, chunk_size).to_owned()),
                    }
                }
            };
        }
    }
}

/// Splitters usually trim chunk edges. When `chunk` starts the body of
/// `source`, put back the whitespace that preceded it so the result stays a
/// prefix of `source`.
fn restore_leading_whitespace(source: &str, chunk: String) -> String {
    let body = source.trim_start();
    let lead = &source[..source.len() - body.len()];
    if lead.is_empty() || !body.starts_with(chunk.as_str()) {
        return chunk;
    }
    let mut restored = String::with_capacity(lead.len() + chunk.len());
    restored.push_str(lead);
    restored.push_str(&chunk);
    restored
}

/// The first `count` characters of `text`, cut on a char boundary.
#[must_use]
pub fn char_prefix(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
