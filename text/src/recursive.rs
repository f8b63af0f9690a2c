//! Recursive character text splitter.
//!
//! Splits on the highest-level separator present in the text (paragraph,
//! line, sentence, word, then single characters), recursing into any piece
//! that is still too large, and greedily merges adjacent small pieces back
//! up to the chunk size. Separators stay attached to the piece they
//! introduce, so concatenated chunks reproduce the source apart from
//! whitespace trimmed at chunk edges.

use std::collections::VecDeque;

use promptfit_core::{SplitConfig, TextSplitter};
use tracing::debug;

/// Paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A [`TextSplitter`] that prefers semantic boundaries.
///
/// # Examples
///
/// ```
/// use promptfit_core::{SplitConfig, TextSplitter};
/// use promptfit_text::RecursiveCharacterSplitter;
///
/// let text = "First paragraph here.\n\nSecond paragraph is a bit longer.";
/// let chunks = RecursiveCharacterSplitter::new().split(text, &SplitConfig::new(40));
/// assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph is a bit longer."]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursiveCharacterSplitter {
    separators: Vec<String>,
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self {
            separators: DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl RecursiveCharacterSplitter {
    /// Splitter with the default separators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the separator list, highest priority first. An empty string
    /// means "split between characters" and should come last.
    #[must_use]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// The active separators.
    #[must_use]
    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    fn split_recursive(
        &self,
        text: &str,
        separators: &[String],
        config: &SplitConfig,
        out: &mut Vec<String>,
    ) {
        let position = separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s.as_str()));
        let (separator, rest) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => (separators.last().map_or("", String::as_str), &[][..]),
        };

        let mut good: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < config.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                merge_pieces(&good, config, out);
                good.clear();
            }
            if rest.is_empty() {
                push_chunk(piece, out);
            } else {
                self.split_recursive(piece, rest, config, out);
            }
        }
        if !good.is_empty() {
            merge_pieces(&good, config, out);
        }
    }
}

impl TextSplitter for RecursiveCharacterSplitter {
    fn split(&self, text: &str, config: &SplitConfig) -> Vec<String> {
        let mut chunks = Vec::new();
        if text.is_empty() {
            return chunks;
        }
        self.split_recursive(text, &self.separators, config, &mut chunks);

        if let Some(largest) = chunks.iter().map(|c| char_len(c)).max() {
            if largest > config.chunk_size {
                debug!(
                    largest,
                    chunk_size = config.chunk_size,
                    "splitter produced an oversized chunk"
                );
            }
        }
        chunks
    }
}

/// Splits `text` before every occurrence of `separator`, keeping the
/// separator at the start of the following piece. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
        }
        start = index;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Greedily joins adjacent pieces into chunks of at most `chunk_size`
/// characters, carrying up to `chunk_overlap` characters into the next chunk.
fn merge_pieces(pieces: &[&str], config: &SplitConfig, out: &mut Vec<String>) {
    let mut current: VecDeque<(&str, usize)> = VecDeque::new();
    let mut total = 0usize;

    for &piece in pieces {
        let len = char_len(piece);
        if total + len > config.chunk_size && !current.is_empty() {
            push_chunk(&join(&current), out);
            while total > config.chunk_overlap
                || (total + len > config.chunk_size && total > 0)
            {
                match current.pop_front() {
                    Some((_, front_len)) => total -= front_len,
                    None => break,
                }
            }
        }
        current.push_back((piece, len));
        total += len;
    }

    if !current.is_empty() {
        push_chunk(&join(&current), out);
    }
}

fn join(pieces: &VecDeque<(&str, usize)>) -> String {
    let capacity = pieces.iter().map(|(p, _)| p.len()).sum();
    let mut joined = String::with_capacity(capacity);
    for (piece, _) in pieces {
        joined.push_str(piece);
    }
    joined
}

fn push_chunk(chunk: &str, out: &mut Vec<String>) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
