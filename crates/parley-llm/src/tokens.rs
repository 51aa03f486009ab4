//! Approximate tokenization used to enforce a prompt budget.
//!
//! A token is a run of word characters or a single punctuation/symbol
//! character. This over-counts relative to a BPE vocabulary for rare words
//! and under-counts for long ones, which is close enough to keep requests
//! inside the model's input limit.

use std::sync::LazyLock;

use parley_core::TruncationSide;
use regex::Regex;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").expect("token pattern is valid"));

/// Result of fitting text into a token budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Truncated<'a> {
    /// The kept slice of the original text.
    pub text: &'a str,
    pub total_tokens: usize,
    pub kept_tokens: usize,
}

impl Truncated<'_> {
    pub fn was_truncated(&self) -> bool {
        self.kept_tokens < self.total_tokens
    }
}

pub fn count_tokens(text: &str) -> usize {
    TOKEN_RE.find_iter(text).count()
}

/// Cut `text` down to at most `max_tokens` tokens, dropping from `side`.
///
/// The returned slice starts or ends on a token boundary, never inside a
/// multi-byte character. Text within budget is returned unchanged.
pub fn truncate_to_tokens(text: &str, max_tokens: usize, side: TruncationSide) -> Truncated<'_> {
    let spans: Vec<(usize, usize)> = TOKEN_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    let total_tokens = spans.len();

    if total_tokens <= max_tokens {
        return Truncated {
            text,
            total_tokens,
            kept_tokens: total_tokens,
        };
    }

    let kept = if max_tokens == 0 {
        ""
    } else {
        match side {
            TruncationSide::Right => &text[..spans[max_tokens - 1].1],
            TruncationSide::Left => &text[spans[total_tokens - max_tokens].0..],
        }
    };

    Truncated {
        text: kept,
        total_tokens,
        kept_tokens: max_tokens,
    }
}
