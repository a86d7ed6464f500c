//! Token-graph construction and the matching engine.
//!
//! # Module Structure
//!
//! - [`node`] - Graph vertices: token, value, sub-graph and terminal nodes
//! - [`sub`] - Sub-graph delegation with memoization and cycle guarding
//! - [`encounter`] - The traversal context driving one match attempt
//! - [`builder`] - Declarative phrase-by-phrase graph construction
//! - [`matcher`] - Entry point binding a language and a graph

pub mod builder;
pub mod encounter;
pub mod matcher;
pub mod node;
pub mod sub;

#[cfg(test)]
mod tests;

pub use builder::{GraphBuilder, Phrase, PhrasePart, ValueSource};
pub use matcher::{MatchOptions, Matcher};
pub use node::Node;
pub use sub::SubNode;

use std::sync::Arc;

use crate::graph::node::PayloadMapper;
use crate::language::Language;

/// Immutable node graph together with its grammar-level defaults.
///
/// Built once, shared read-only across any number of concurrent match
/// attempts.
pub struct Graph {
    pub(crate) roots: Vec<Node>,
    pub(crate) options: GraphOptions,
}

impl Graph {
    pub fn builder(language: Arc<dyn Language>) -> GraphBuilder {
        GraphBuilder::new(language)
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }
}

/// Defaults a grammar declares for itself at build time.
///
/// `None` means no opinion; delegating sub-nodes then inherit whatever the
/// surrounding context uses.
#[derive(Default)]
pub(crate) struct GraphOptions {
    pub(crate) name: Option<String>,
    pub(crate) supports_partial: Option<bool>,
    pub(crate) skip_punctuation: Option<bool>,
    pub(crate) supports_fuzzy: Option<bool>,
    pub(crate) result_mapper: Option<PayloadMapper>,
    pub(crate) only_best: bool,
}
