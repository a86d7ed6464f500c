use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use crate::values::{ValueContext, ValueMatch, ValueMatcher, VALUE_TOKEN_SCORE};

/// Matches a single token of ASCII digits as an integer
pub struct Integer;

impl Integer {
    pub fn new() -> Arc<dyn ValueMatcher> {
        Arc::new(Self)
    }
}

impl ValueMatcher for Integer {
    fn try_match(&self, ctx: &ValueContext<'_>) -> Result<Option<ValueMatch>> {
        let Some(token) = ctx.tokens.first() else {
            return Ok(None);
        };
        if !token.is_numeric() {
            return Ok(None);
        }
        let Ok(value) = token.normalized.parse::<i64>() else {
            // Digit runs beyond i64 range are a no-match, not a failure
            return Ok(None);
        };
        Ok(Some(ValueMatch {
            consumed: 1,
            value: json!(value),
            score: VALUE_TOKEN_SCORE,
        }))
    }
}
