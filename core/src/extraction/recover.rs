//! Recovery of the JSON candidate from a free-form model response.
//!
//! Models wrap JSON in prose and code fences. Candidates are searched in a
//! fixed order: a fenced block labeled `json`, then the first balanced
//! `{...}` or `[...]` span, then the whole response. The bracket search is
//! best-effort: bracket-like text in surrounding prose can still be picked up.

use once_cell::sync::Lazy;
use regex_lite::Regex;

#[allow(clippy::expect_used)]
static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)```json[ \t]*\r?\n?(.*?)\r?\n?```").expect("fenced JSON pattern is valid")
});

/// Where a [`Candidate`] was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Contents of a fenced code block labeled `json`.
    Fenced,
    /// A bracketed `{...}` or `[...]` span inside the response.
    BraceSpan,
    /// The entire response.
    Whole,
}

/// Text that will be handed to the JSON parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    /// The candidate JSON text.
    pub text: &'a str,
    /// How it was located.
    pub source: CandidateSource,
}

/// Locates the JSON candidate inside `response`.
///
/// # Examples
///
/// ```
/// use promptfit_core::extraction::{recover_json, CandidateSource};
///
/// let response = "Sure! Here it is:\n```json\n{\"ok\": true}\n```\nAnything else?";
/// let candidate = recover_json(response);
/// assert_eq!(candidate.text, "{\"ok\": true}");
/// assert_eq!(candidate.source, CandidateSource::Fenced);
/// ```
#[must_use]
pub fn recover_json(response: &str) -> Candidate<'_> {
    if let Some(inner) = FENCED_JSON
        .captures(response)
        .and_then(|caps| caps.get(1))
    {
        return Candidate {
            text: inner.as_str().trim(),
            source: CandidateSource::Fenced,
        };
    }

    if let Some(span) = bracket_span(response) {
        return Candidate {
            text: span,
            source: CandidateSource::BraceSpan,
        };
    }

    Candidate {
        text: response.trim(),
        source: CandidateSource::Whole,
    }
}

/// The first balanced `{...}` or `[...]` span, whichever opener comes
/// first, ignoring brackets inside JSON strings.
///
/// When the brackets never balance (a truncated value, or a stray opener in
/// prose) the span from the first opener to the last matching closer is
/// used instead.
fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find(|c| c == '{' || c == '[')?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(c) {
                    break;
                }
                if closers.is_empty() {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
