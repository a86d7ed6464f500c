//! Scored match results and their deduplicating collection.

mod match_set;

pub use match_set::{MatchEq, MatchSet};

use serde::Serialize;
use serde_json::Value;

/// Score metadata captured when a match was recorded
#[derive(Debug, Clone, Serialize)]
pub struct MatchMetadata {
    /// Whether partial matching was requested for this run
    pub partial: bool,
    /// Total number of tokens in the input
    pub total_tokens: usize,
    /// How far into the input the match reached
    pub depth: usize,
    /// Raw accumulated score over the consumed tokens
    pub score: f64,
}

/// A completed, scored recognition result.
///
/// Immutable once created. `index` is the token position just after the last
/// consumed token, so a match spans the whole input when
/// `index == metadata.total_tokens`.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub index: usize,
    pub data: Value,
    pub metadata: MatchMetadata,
}

impl Match {
    pub fn new(index: usize, data: Value, metadata: MatchMetadata) -> Self {
        Self {
            index,
            data,
            metadata,
        }
    }

    /// Ranking score, normalized by input length so that matches which
    /// explain more of the input with fewer penalties rank higher
    pub fn score(&self) -> f64 {
        if self.metadata.total_tokens == 0 {
            return 0.0;
        }
        self.metadata.score / self.metadata.total_tokens as f64
    }

    /// Whether the match consumed every input token
    pub fn is_complete(&self) -> bool {
        self.index >= self.metadata.total_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn match_with(score: f64, total_tokens: usize, index: usize) -> Match {
        Match::new(
            index,
            json!(null),
            MatchMetadata {
                partial: false,
                total_tokens,
                depth: index,
                score,
            },
        )
    }

    #[test]
    fn test_score_normalized_by_input_length() {
        let direct = match_with(2.0, 2, 2);
        let fuzzy = match_with(2.0, 3, 3);
        assert!(direct.score() > fuzzy.score());
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(match_with(1.0, 0, 0).score(), 0.0);
    }

    #[test]
    fn test_is_complete() {
        assert!(match_with(2.0, 2, 2).is_complete());
        assert!(!match_with(1.0, 2, 1).is_complete());
    }
}
