//! Sub-graph delegation with memoization and reentrancy guarding.

use std::rc::Rc;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::EngineError;
use crate::graph::encounter::{Encounter, MemoKey, Variant};
use crate::graph::node::{Node, PayloadFilter, PayloadMapper};
use crate::graph::Graph;
use crate::results::Match;

/*
 * Small penalty applied when a sub-graph match completes. Ties between one
 * large decomposition and several small ones resolve toward fewer, larger
 * sub-matches.
 */
pub(crate) const SUB_MATCH_PENALTY: f64 = 0.001;

/// Node that embeds one graph inside another.
///
/// Delegation results are memoized per (target, start position) within one
/// encounter, and an active-delegation guard stops self-referential grammars
/// from re-entering the same target at the same position.
pub struct SubNode {
    target: SubTarget,
    filter: Option<PayloadFilter>,
    mapper: Option<PayloadMapper>,
    supports_partial: Option<bool>,
    skip_punctuation: Option<bool>,
    fuzzy: Option<bool>,
    name: Option<String>,
}

pub(crate) enum SubTarget {
    /// Another built graph
    Graph(Arc<Graph>),
    /// The root graph currently being matched
    SelfRef,
}

impl SubNode {
    /// Delegate to a built graph, inheriting its declared defaults
    pub(crate) fn graph(target: Arc<Graph>) -> Self {
        let options = &target.options;
        Self {
            filter: None,
            mapper: options.result_mapper.clone(),
            supports_partial: options.supports_partial,
            skip_punctuation: options.skip_punctuation,
            fuzzy: options.supports_fuzzy,
            name: options.name.clone(),
            target: SubTarget::Graph(target),
        }
    }

    /// Delegate to a built graph and tag each result as a named value
    pub(crate) fn tagged(id: &str, target: Arc<Graph>) -> Self {
        let mut sub = Self::graph(target);
        let id = id.to_string();
        let inner = sub.mapper.take();
        sub.mapper = Some(Arc::new(move |value| {
            let value = match &inner {
                Some(mapper) => mapper(value),
                None => value,
            };
            json!({ "id": id, "value": value })
        }));
        sub
    }

    /// Delegate back into the graph being matched
    pub(crate) fn self_ref() -> Self {
        Self {
            target: SubTarget::SelfRef,
            filter: None,
            mapper: None,
            supports_partial: None,
            skip_punctuation: None,
            fuzzy: None,
            name: None,
        }
    }

    pub(crate) fn with_filter(mut self, filter: PayloadFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn display_name(&self) -> &str {
        match (&self.name, &self.target) {
            (Some(name), _) => name,
            (None, SubTarget::SelfRef) => "self",
            (None, SubTarget::Graph(_)) => "sub",
        }
    }

    /// Whether two sub-nodes can be merged as a shared phrase prefix
    pub(crate) fn mergeable_with(&self, other: &SubNode) -> bool {
        if self.filter.is_some()
            || other.filter.is_some()
            || self.mapper.is_some()
            || other.mapper.is_some()
        {
            return false;
        }
        match (&self.target, &other.target) {
            (SubTarget::SelfRef, SubTarget::SelfRef) => true,
            (SubTarget::Graph(a), SubTarget::Graph(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn attempt(
        &self,
        encounter: &mut Encounter<'_>,
        outgoing: &[Node],
    ) -> Result<(), EngineError> {
        let target = match &self.target {
            SubTarget::Graph(graph) => Arc::clone(graph),
            SubTarget::SelfRef => encounter.root_graph(),
        };
        let key = Arc::as_ptr(&target) as usize;
        let position = encounter.position();

        if encounter.is_active(key, position) {
            // Already delegating to this target at this exact position
            return Ok(());
        }

        let supports_partial = self.supports_partial.or(target.options.supports_partial);
        if encounter.token().is_none() {
            if encounter.partial() {
                if supports_partial != Some(true) {
                    // Nothing left to read. Assume the sub-graph would match
                    // once more input arrives.
                    return encounter.advance(outgoing, 1.0, 0, None);
                }
            } else if supports_partial == Some(true) {
                return Ok(());
            }
        }

        // Effective flags while inside the target grammar
        let delegated_partial = if encounter.partial() {
            supports_partial.unwrap_or(true)
        } else {
            false
        };
        let delegated_skip = self
            .skip_punctuation
            .or(target.options.skip_punctuation)
            .unwrap_or_else(|| encounter.skips_punctuation());
        let delegated_fuzzy = self
            .fuzzy
            .or(target.options.supports_fuzzy)
            .unwrap_or_else(|| encounter.fuzzy());

        let memo_key = MemoKey {
            target: key,
            mapper: self
                .mapper
                .as_ref()
                .map(|mapper| Arc::as_ptr(mapper) as *const () as usize)
                .unwrap_or(0),
            partial: delegated_partial,
            skip_punctuation: delegated_skip,
            fuzzy: delegated_fuzzy,
        };

        encounter.mark_active(key, position);

        let variants = match encounter.cached_variants(position, &memo_key) {
            Some(cached) => {
                log::trace!(
                    "memo hit for {} at {} ({} variants)",
                    self.display_name(),
                    position,
                    cached.len()
                );
                cached
            }
            None => {
                let (collected, result) = encounter.with_collector(|encounter| {
                    encounter.with_flags(
                        delegated_partial,
                        delegated_skip,
                        delegated_fuzzy,
                        |encounter| encounter.advance(&target.roots, 0.0, 0, None),
                    )
                });
                if let Err(err) = result {
                    encounter.clear_active(key, position);
                    return Err(err);
                }
                let variants = Rc::new(self.collect_variants(encounter, collected, delegated_skip));
                encounter.store_variants(position, memo_key, Rc::clone(&variants));
                variants
            }
        };

        let result = self.expand_variants(encounter, outgoing, &variants);
        encounter.clear_active(key, position);
        result
    }

    /// Turn collected sub-matches into continuation variants, applying the
    /// payload transform before they become cacheable
    fn collect_variants(
        &self,
        encounter: &Encounter<'_>,
        collected: Vec<Match>,
        skip_punctuation: bool,
    ) -> Vec<Variant> {
        let mut variants = Vec::with_capacity(collected.len());
        for m in collected {
            let index = m.index;
            let score = m.metadata.score;
            let data = match &self.mapper {
                Some(mapper) => mapper(m.data),
                None => m.data,
            };

            // When trailing punctuation was skipped, also offer the pre-skip
            // position. The outer grammar may want that punctuation itself.
            // Never backs up past the position the delegation started at.
            let before_punctuation = if skip_punctuation {
                encounter.previous_non_skipped(index).max(encounter.position())
            } else {
                index
            };

            if before_punctuation != index {
                variants.push(Variant {
                    index,
                    score,
                    data: data.clone(),
                });
                variants.push(Variant {
                    index: before_punctuation,
                    score,
                    data,
                });
            } else {
                variants.push(Variant { index, score, data });
            }
        }
        variants
    }

    /// Continue the outer graph from every admissible variant
    fn expand_variants(
        &self,
        encounter: &mut Encounter<'_>,
        outgoing: &[Node],
        variants: &[Variant],
    ) -> Result<(), EngineError> {
        let mut expanded: Vec<(usize, Value)> = Vec::new();
        for variant in variants {
            if let Some(filter) = &self.filter {
                if !filter(&variant.data) {
                    continue;
                }
            }
            // Identical (position, payload) variants expand once
            if expanded
                .iter()
                .any(|(index, data)| *index == variant.index && *data == variant.data)
            {
                continue;
            }
            expanded.push((variant.index, variant.data.clone()));

            let score_delta = variant.score - encounter.current_score() - SUB_MATCH_PENALTY;
            let consumed = variant.index - encounter.position();
            let payload = if variant.data.is_null() {
                None
            } else {
                Some(variant.data.clone())
            };
            encounter.advance(outgoing, score_delta, consumed, payload)?;
        }
        Ok(())
    }
}
