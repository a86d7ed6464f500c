//! Traversal context for one match attempt.
//!
//! An `Encounter` owns all mutable state of a single depth-first exploration
//! of a graph over one tokenized input. It is created per match attempt and
//! discarded afterwards; graphs stay read-only and can be shared across any
//! number of concurrent encounters.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::error::EngineError;
use crate::graph::matcher::MatchOptions;
use crate::graph::node::Node;
use crate::graph::Graph;
use crate::language::Language;
use crate::results::{Match, MatchMetadata, MatchSet};
use crate::types::Token;

/// One scored continuation point produced by a sub-graph delegation
#[derive(Debug, Clone)]
pub(crate) struct Variant {
    pub(crate) index: usize,
    pub(crate) score: f64,
    pub(crate) data: Value,
}

/// Memo cache key for sub-graph results at one start position.
///
/// The effective matching flags and the payload transform are part of the
/// key. Variants are cached already-transformed, so an entry must never be
/// reused under different matching rules or a different transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    pub(crate) target: usize,
    pub(crate) mapper: usize,
    pub(crate) partial: bool,
    pub(crate) skip_punctuation: bool,
    pub(crate) fuzzy: bool,
}

/// Single-owner mutable state for one match attempt
pub struct Encounter<'a> {
    language: Arc<dyn Language>,
    root: Arc<Graph>,
    tokens: Vec<Token>,

    current_index: usize,
    current_score: f64,

    /// Captured payloads along the current branch
    data: Vec<Value>,
    /// Captures below the floor belong to ancestors and stay invisible
    data_floor: usize,
    /// Scoped sub-match collectors, innermost last
    collectors: Vec<Vec<Match>>,

    /// Sub-graph results memoized per start position
    memo: HashMap<usize, HashMap<MemoKey, Rc<Vec<Variant>>>>,
    /// Delegations currently on the call stack as (target, position) pairs
    active: HashSet<(usize, usize)>,

    partial: bool,
    fuzzy: bool,
    skip_punctuation: bool,
    partial_requested: bool,
    only_complete: bool,
    verbose: bool,
    use_memo: bool,

    matches: MatchSet,
    on_match: Option<Box<dyn FnMut(Match) + 'a>>,
}

impl<'a> Encounter<'a> {
    pub(crate) fn new(
        language: Arc<dyn Language>,
        root: Arc<Graph>,
        text: &str,
        options: MatchOptions<'a>,
    ) -> Self {
        let tokens = language.tokenize(text);
        let partial = options.partial && root.options.supports_partial.unwrap_or(true);
        let fuzzy = options.fuzzy && root.options.supports_fuzzy.unwrap_or(true);
        let skip_punctuation = options
            .skip_punctuation
            .unwrap_or_else(|| root.options.skip_punctuation.unwrap_or(false));

        Self {
            language,
            root,
            tokens,
            current_index: 0,
            current_score: 0.0,
            data: Vec::new(),
            data_floor: 0,
            collectors: Vec::new(),
            memo: HashMap::new(),
            active: HashSet::new(),
            partial,
            fuzzy,
            skip_punctuation,
            partial_requested: options.partial,
            only_complete: options.only_complete,
            verbose: options.verbose,
            use_memo: options.use_memo,
            matches: MatchSet::new(options.match_is_equal),
            on_match: options.on_match,
        }
    }

    /// Explore the root graph from its roots at position zero
    pub(crate) fn run(&mut self) -> Result<(), EngineError> {
        log::debug!(
            "matching {} tokens against graph {:?}",
            self.tokens.len(),
            self.root.name()
        );
        let root = Arc::clone(&self.root);
        self.advance(&root.roots, 0.0, 0, None)
    }

    /// Consume the encounter and hand back the collected matches
    pub(crate) fn finish(self) -> MatchSet {
        self.matches
    }

    // ==================== Position and token access ====================

    pub(crate) fn position(&self) -> usize {
        self.current_index
    }

    pub(crate) fn current_score(&self) -> f64 {
        self.current_score
    }

    /// The token at the current position, if any input remains
    pub(crate) fn token(&self) -> Option<&Token> {
        self.tokens.get(self.current_index)
    }

    pub(crate) fn at_last_token(&self) -> bool {
        self.current_index + 1 == self.tokens.len()
    }

    pub(crate) fn remaining_tokens(&self) -> &[Token] {
        &self.tokens[self.current_index.min(self.tokens.len())..]
    }

    pub(crate) fn language(&self) -> &dyn Language {
        self.language.as_ref()
    }

    pub(crate) fn root_graph(&self) -> Arc<Graph> {
        Arc::clone(&self.root)
    }

    pub(crate) fn partial(&self) -> bool {
        self.partial
    }

    pub(crate) fn fuzzy(&self) -> bool {
        self.fuzzy
    }

    pub(crate) fn skips_punctuation(&self) -> bool {
        self.skip_punctuation
    }

    /// Position just after the last non-punctuation token before `index`.
    ///
    /// Lets a sub-graph offer the outer grammar ownership of punctuation the
    /// sub-graph skipped at its end.
    pub(crate) fn previous_non_skipped(&self, index: usize) -> usize {
        let mut index = index.min(self.tokens.len());
        while index > 0 && self.tokens[index - 1].punctuation {
            index -= 1;
        }
        index
    }

    fn skip_punctuation_after(&self, mut index: usize) -> usize {
        while index < self.tokens.len() && self.tokens[index].punctuation {
            index += 1;
        }
        index
    }

    // ==================== Capture stack ====================

    /// Payloads captured since the innermost delegation began
    pub(crate) fn data(&self) -> &[Value] {
        &self.data[self.data_floor..]
    }

    // ==================== Reentrancy guard ====================

    pub(crate) fn is_active(&self, target: usize, position: usize) -> bool {
        self.active.contains(&(target, position))
    }

    pub(crate) fn mark_active(&mut self, target: usize, position: usize) {
        self.active.insert((target, position));
    }

    pub(crate) fn clear_active(&mut self, target: usize, position: usize) {
        self.active.remove(&(target, position));
    }

    // ==================== Memo cache ====================

    pub(crate) fn cached_variants(
        &self,
        position: usize,
        key: &MemoKey,
    ) -> Option<Rc<Vec<Variant>>> {
        if !self.use_memo {
            return None;
        }
        self.memo.get(&position)?.get(key).cloned()
    }

    pub(crate) fn store_variants(
        &mut self,
        position: usize,
        key: MemoKey,
        variants: Rc<Vec<Variant>>,
    ) {
        if !self.use_memo {
            return;
        }
        self.memo.entry(position).or_default().insert(key, variants);
    }

    // ==================== Scoped state ====================

    /// Run `body` with a fresh sub-match collector and capture floor.
    ///
    /// Both are restored on every exit path. The body's error is returned
    /// alongside whatever was collected so the caller can restore its own
    /// state before propagating.
    pub(crate) fn with_collector<F>(&mut self, body: F) -> (Vec<Match>, Result<(), EngineError>)
    where
        F: FnOnce(&mut Self) -> Result<(), EngineError>,
    {
        let saved_floor = self.data_floor;
        self.data_floor = self.data.len();
        self.collectors.push(Vec::new());

        let result = body(self);

        let collected = self.collectors.pop().unwrap_or_default();
        self.data_floor = saved_floor;
        (collected, result)
    }

    /// Run `body` with the matching flags overridden, restoring the caller's
    /// flags on every exit path including failure
    pub(crate) fn with_flags<F>(
        &mut self,
        partial: bool,
        skip_punctuation: bool,
        fuzzy: bool,
        body: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Self) -> Result<(), EngineError>,
    {
        let saved = (self.partial, self.skip_punctuation, self.fuzzy);
        self.partial = partial;
        self.skip_punctuation = skip_punctuation;
        self.fuzzy = fuzzy;

        let result = body(self);

        (self.partial, self.skip_punctuation, self.fuzzy) = saved;
        result
    }

    // ==================== Stepping ====================

    /// The core step: move forward and try every outgoing node in declared
    /// order, restoring position, score and capture stack after each attempt
    /// so siblings never observe each other's transient state.
    pub(crate) fn advance(
        &mut self,
        outgoing: &[Node],
        score: f64,
        consumed: usize,
        data: Option<Value>,
    ) -> Result<(), EngineError> {
        let next_index = self.current_index + consumed;
        let next_score = self.current_score + score;

        let next_after_punctuation = if self.skip_punctuation {
            self.skip_punctuation_after(next_index)
        } else {
            next_index
        };

        let pushed = if let Some(payload) = &data {
            self.data.push(payload.clone());
            true
        } else {
            false
        };

        let saved_index = self.current_index;
        let saved_score = self.current_score;

        let mut result = Ok(());
        for node in outgoing {
            self.current_index = if node.supports_punctuation() {
                next_index
            } else {
                next_after_punctuation
            };
            self.current_score = next_score;
            if self.verbose {
                log::debug!("attempting {:?} at index {}", node, self.current_index);
            } else {
                log::trace!("attempting {:?} at index {}", node, self.current_index);
            }

            let attempt = node.attempt(self);

            self.current_index = saved_index;
            self.current_score = saved_score;
            if let Err(err) = attempt {
                result = Err(err);
                break;
            }
        }

        if pushed {
            self.data.pop();
        }
        result?;

        // A skippable token right after the consumed span may be dropped at
        // unchanged score, so no grammar rule needs to mention disposable
        // tokens. The final token is never dropped silently.
        if self.fuzzy {
            if let Some(token) = self.tokens.get(next_index) {
                if token.skippable && next_index + 1 != self.tokens.len() {
                    return self.advance(outgoing, score, consumed + 1, data);
                }
            }
        }
        Ok(())
    }

    /// Record a completed match at the current position.
    ///
    /// Terminal nodes call this. The match goes to the innermost scoped
    /// collector when one is installed, otherwise through the caller's sink
    /// or into the shared match set.
    pub(crate) fn record(&mut self, data: Value) {
        let metadata = MatchMetadata {
            partial: self.partial_requested,
            total_tokens: self.tokens.len(),
            depth: self.current_index,
            score: self.current_score,
        };
        let mut m = Match::new(self.current_index, data, metadata);
        if self.verbose {
            log::debug!("recorded match at {} score {:.3}", m.index, m.metadata.score);
        } else {
            log::trace!("recorded match at {} score {:.3}", m.index, m.metadata.score);
        }

        if let Some(collector) = self.collectors.last_mut() {
            collector.push(m);
            return;
        }

        if let Some(mapper) = self.root.options.result_mapper.clone() {
            m.data = mapper(m.data);
        }

        if let Some(on_match) = self.on_match.as_mut() {
            on_match(m);
            return;
        }

        if self.only_complete && !m.is_complete() {
            return;
        }
        self.matches.add(m);
    }
}
