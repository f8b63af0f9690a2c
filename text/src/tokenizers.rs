//! Token counters implementing [`Tokenizer`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use promptfit_core::Tokenizer;
use thiserror::Error;
use tiktoken_rs::CoreBPE;

/// Errors raised while building a tokenizer.
#[derive(Debug, Error)]
pub enum TokenizerError {
    /// The BPE ranks for an encoding could not be loaded.
    #[error("Failed to load {encoding} encoding: {message}")]
    Load {
        /// Encoding that failed.
        encoding: Encoding,
        /// Loader error message.
        message: String,
    },

    /// An encoding name was not recognised.
    #[error("Unknown encoding '{0}' (expected o200k_base or cl100k_base)")]
    UnknownEncoding(String),
}

/// BPE encodings supported by [`TiktokenTokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// GPT-4o / o-series encoding.
    #[default]
    O200kBase,
    /// GPT-4 / GPT-3.5-turbo encoding.
    Cl100kBase,
}

impl Encoding {
    /// Canonical encoding name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::O200kBase => "o200k_base",
            Self::Cl100kBase => "cl100k_base",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = TokenizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "o200k_base" | "o200k" => Ok(Self::O200kBase),
            "cl100k_base" | "cl100k" => Ok(Self::Cl100kBase),
            other => Err(TokenizerError::UnknownEncoding(other.to_string())),
        }
    }
}

/// Exact BPE token counts via `tiktoken`.
#[derive(Clone)]
pub struct TiktokenTokenizer {
    bpe: Arc<CoreBPE>,
    encoding: Encoding,
}

impl TiktokenTokenizer {
    /// Loads the given encoding.
    pub fn new(encoding: Encoding) -> Result<Self, TokenizerError> {
        let loaded = match encoding {
            Encoding::O200kBase => tiktoken_rs::o200k_base(),
            Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
        };
        let bpe = loaded.map_err(|e| TokenizerError::Load {
            encoding,
            message: e.to_string(),
        })?;
        Ok(Self {
            bpe: Arc::new(bpe),
            encoding,
        })
    }

    /// Loads `o200k_base`.
    pub fn o200k() -> Result<Self, TokenizerError> {
        Self::new(Encoding::O200kBase)
    }

    /// Loads `cl100k_base`.
    pub fn cl100k() -> Result<Self, TokenizerError> {
        Self::new(Encoding::Cl100kBase)
    }

    /// The loaded encoding.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Word-based estimate: whitespace-separated words times a ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordTokenizer {
    tokens_per_word: f64,
}

impl WordTokenizer {
    /// Estimator with the given tokens-per-word ratio.
    #[must_use]
    pub const fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }
}

impl Default for WordTokenizer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Tokenizer for WordTokenizer {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn count_tokens(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f64 * self.tokens_per_word).ceil() as usize
    }
}

/// Estimate token count from text using the standard 4-chars-per-token heuristic.
///
/// Uses `chars().count()` to handle UTF-8 correctly (not `len()` which counts bytes).
/// Returns ceiling division to avoid underestimation.
///
/// # Examples
///
/// ```
/// use promptfit_core::Tokenizer;
/// use promptfit_text::CharEstimateTokenizer;
///
/// assert_eq!(CharEstimateTokenizer.count_tokens("hello"), 2);  // 5 chars / 4 = 1.25 -> 2
/// assert_eq!(CharEstimateTokenizer.count_tokens("hello world"), 3);  // 11 chars / 4 = 2.75 -> 3
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharEstimateTokenizer;

impl Tokenizer for CharEstimateTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}
