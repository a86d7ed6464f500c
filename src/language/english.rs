use once_cell::sync::Lazy;
use regex::Regex;

use crate::language::Language;
use crate::types::{Span, Token};

/// Words that carry little meaning and may be dropped under fuzzy matching
const SKIPPABLE_WORDS: [&str; 9] = [
    "a", "an", "the", "please", "me", "of", "to", "just", "kindly",
];

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    // Words (with optional apostrophe suffix), digit runs, then any single
    // non-space symbol as punctuation.
    Regex::new(r"[A-Za-z]+(?:'[A-Za-z]+)?|[0-9]+|[^\sA-Za-z0-9]")
        .expect("token pattern is valid")
});

/// Default English tokenizer and token comparer
#[derive(Debug, Default)]
pub struct EnglishLanguage;

impl EnglishLanguage {
    pub fn new() -> Self {
        Self
    }
}

impl Language for EnglishLanguage {
    fn id(&self) -> &str {
        "en"
    }

    fn tokenize(&self, text: &str) -> Vec<Token> {
        TOKEN_PATTERN
            .find_iter(text)
            .map(|m| {
                let raw = m.as_str();
                let span = Span::new(m.start(), m.end());
                let token = Token::new(raw, span);
                if !raw.chars().any(|c| c.is_alphanumeric()) {
                    token.mark_punctuation()
                } else if SKIPPABLE_WORDS.contains(&token.normalized.as_str()) {
                    token.mark_skippable()
                } else {
                    token
                }
            })
            .collect()
    }

    fn compare_tokens(&self, grammar: &Token, input: &Token) -> f64 {
        if grammar.normalized == input.normalized {
            return 1.0;
        }
        // "5" should match "05" in inputs such as times
        if grammar.is_numeric() && input.is_numeric() {
            let a = grammar.normalized.trim_start_matches('0');
            let b = input.normalized.trim_start_matches('0');
            if a == b {
                return 1.0;
            }
        }
        0.0
    }

    fn compare_tokens_partial(&self, grammar: &Token, input: &Token) -> f64 {
        if grammar.normalized == input.normalized {
            return 1.0;
        }
        if !input.normalized.is_empty() && grammar.normalized.starts_with(&input.normalized) {
            return input.normalized.chars().count() as f64
                / grammar.normalized.chars().count() as f64;
        }
        0.0
    }
}
