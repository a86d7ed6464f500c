use serde::{Deserialize, Serialize};

use crate::types::Span;

/// Atomic lexical unit produced by a tokenizer.
///
/// Tokens are immutable once produced. The punctuation and skippable flags
/// drive punctuation skipping and fuzzy tolerance during graph traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Text exactly as it appeared in the source
    pub raw: String,
    /// Lowercased form used for comparison
    pub normalized: String,
    /// Byte positions of the token in the source text
    pub span: Span,
    /// Whether this token is punctuation
    pub punctuation: bool,
    /// Whether this token may be dropped under fuzzy matching
    pub skippable: bool,
}

impl Token {
    pub fn new(raw: impl Into<String>, span: Span) -> Self {
        let raw = raw.into();
        let normalized = raw.to_lowercase();
        Self {
            raw,
            normalized,
            span,
            punctuation: false,
            skippable: false,
        }
    }

    pub fn mark_punctuation(mut self) -> Self {
        self.punctuation = true;
        // Punctuation is always safe to drop under fuzzy matching
        self.skippable = true;
        self
    }

    pub fn mark_skippable(mut self) -> Self {
        self.skippable = true;
        self
    }

    /// Whether the normalized form is entirely ASCII digits
    pub fn is_numeric(&self) -> bool {
        !self.normalized.is_empty() && self.normalized.bytes().all(|b| b.is_ascii_digit())
    }
}
