use std::sync::Arc;

use serde_json::Value;

use crate::results::Match;

/// Payload equality used to deduplicate matches
pub type MatchEq = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Deduplicating, rankable collection of matches.
///
/// Equality over payloads is caller-supplied; structural JSON equality is the
/// default. Of two equal matches the higher-scoring one is retained, and ties
/// keep the earlier discovery.
pub struct MatchSet {
    matches: Vec<Match>,
    is_equal: MatchEq,
}

impl MatchSet {
    pub fn new(is_equal: Option<MatchEq>) -> Self {
        Self {
            matches: Vec::new(),
            is_equal: is_equal.unwrap_or_else(|| Arc::new(|a, b| a == b)),
        }
    }

    pub fn add(&mut self, m: Match) {
        let is_equal = &self.is_equal;
        if let Some(existing) = self
            .matches
            .iter_mut()
            .find(|existing| is_equal(&existing.data, &m.data))
        {
            if m.score() > existing.score() {
                *existing = m;
            }
            return;
        }
        self.matches.push(m);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// All matches ordered by descending score, discovery order on ties
    pub fn into_sorted(self) -> Vec<Match> {
        let mut matches = self.matches;
        matches.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches
    }

    /// The single highest-scoring match, earliest discovery on ties
    pub fn best(self) -> Option<Match> {
        let mut best: Option<Match> = None;
        for m in self.matches {
            match &best {
                Some(current) if current.score() >= m.score() => {}
                _ => best = Some(m),
            }
        }
        best
    }
}
