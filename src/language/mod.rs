//! Tokenization and token comparison.
//!
//! A [`Language`] turns raw text into positioned [`Token`]s and decides how
//! closely two tokens match. The graph engine is language-agnostic; grammars
//! and inputs are only ever compared through this trait.

mod english;

pub use english::EnglishLanguage;

use std::sync::Arc;

use crate::types::Token;

/// Tokenization and comparison rules for one natural language.
///
/// Implementations must be deterministic. Comparison scores are in `[0, 1]`
/// where `0` means no match and `1` means an exact match.
pub trait Language: Send + Sync {
    /// Short identifier such as `"en"`
    fn id(&self) -> &str;

    /// Split raw text into an ordered token sequence with stable positions
    fn tokenize(&self, text: &str) -> Vec<Token>;

    /// Score how well an input token matches a grammar token
    fn compare_tokens(&self, grammar: &Token, input: &Token) -> f64;

    /// Score a possibly half-typed input token against a grammar token.
    ///
    /// Used for the final input token when partial matching is active, so
    /// that `"mar"` can still match the grammar token `"march"`.
    fn compare_tokens_partial(&self, grammar: &Token, input: &Token) -> f64;
}

/// Convenience constructor for the default English language
pub fn english() -> Arc<dyn Language> {
    Arc::new(EnglishLanguage::new())
}
