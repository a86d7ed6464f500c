//! Pluggable value-matcher strategies.
//!
//! A value matcher consumes one or more tokens at the current position and
//! produces a raw JSON value. Matchers are the extension seam for custom
//! value types; the engine only sees the [`ValueMatcher`] trait.

mod enumeration;
mod number;

pub use enumeration::Enumeration;
pub use number::Integer;

use anyhow::Result;
use serde_json::Value;

use crate::language::Language;
use crate::types::Token;

/// Read-only view of the input handed to a value matcher.
///
/// `tokens` starts at the current traversal position and runs to the end of
/// the input.
pub struct ValueContext<'a> {
    pub tokens: &'a [Token],
    pub partial: bool,
    pub language: &'a dyn Language,
}

impl ValueContext<'_> {
    /// Whether the matcher is looking at the final input token
    pub fn at_last_token(&self) -> bool {
        self.tokens.len() == 1
    }
}

/// A successful value extraction
#[derive(Debug, Clone)]
pub struct ValueMatch {
    /// Number of tokens consumed from the start of the context
    pub consumed: usize,
    /// Extracted raw value
    pub value: Value,
    /// Score contribution, proportional to tokens consumed
    pub score: f64,
}

/// Strategy that recognizes one kind of value at the current position.
///
/// Returning `Ok(None)` is a plain no-match and lets sibling alternatives
/// proceed. Returning `Err` aborts the entire match invocation.
pub trait ValueMatcher: Send + Sync {
    fn try_match(&self, ctx: &ValueContext<'_>) -> Result<Option<ValueMatch>>;
}

/// Score granted per token consumed by a value matcher.
///
/// Kept slightly below the literal-token score of 1.0 so that a grammar
/// spelling a value out literally wins ties against a generic matcher.
pub(crate) const VALUE_TOKEN_SCORE: f64 = 0.9;
