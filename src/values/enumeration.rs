use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use crate::language::Language;
use crate::types::Token;
use crate::values::{ValueContext, ValueMatch, ValueMatcher, VALUE_TOKEN_SCORE};

/// Matches one of a fixed set of token sequences, longest option first.
///
/// Each option is tokenized once at construction with the same language the
/// grammar uses, so comparison at match time is token-by-token.
pub struct Enumeration {
    options: Vec<EnumOption>,
}

struct EnumOption {
    value: String,
    tokens: Vec<Token>,
}

impl Enumeration {
    pub fn new<S: AsRef<str>>(language: &Arc<dyn Language>, options: &[S]) -> Arc<dyn ValueMatcher> {
        let mut options: Vec<EnumOption> = options
            .iter()
            .map(|option| EnumOption {
                value: option.as_ref().to_string(),
                tokens: language.tokenize(option.as_ref()),
            })
            .collect();
        // Longest option wins when one option is a prefix of another
        options.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()));
        Arc::new(Self { options })
    }
}

impl ValueMatcher for Enumeration {
    fn try_match(&self, ctx: &ValueContext<'_>) -> Result<Option<ValueMatch>> {
        for option in &self.options {
            if option.tokens.is_empty() || option.tokens.len() > ctx.tokens.len() {
                continue;
            }
            let matched = option
                .tokens
                .iter()
                .zip(ctx.tokens)
                .all(|(grammar, input)| ctx.language.compare_tokens(grammar, input) > 0.0);
            if matched {
                return Ok(Some(ValueMatch {
                    consumed: option.tokens.len(),
                    value: json!(option.value),
                    score: option.tokens.len() as f64 * VALUE_TOKEN_SCORE,
                }));
            }
        }
        Ok(None)
    }
}
