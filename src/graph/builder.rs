//! Declarative construction of node graphs.
//!
//! Phrases are sequences of literal text, nested graphs and named value
//! slots. Each added phrase is trie-merged into the existing roots through
//! structural node equality, so phrases sharing a prefix share nodes.

use std::sync::Arc;

use serde_json::Value;

use crate::graph::node::{DataMapper, Node, PayloadFilter, PayloadMapper};
use crate::graph::sub::SubNode;
use crate::graph::{Graph, GraphOptions};
use crate::language::Language;
use crate::values::ValueMatcher;

/// What a named value slot delegates to
#[derive(Clone)]
pub enum ValueSource {
    /// External matcher strategy
    Matcher(Arc<dyn ValueMatcher>),
    /// Sub-grammar whose results become the slot value
    Graph(Arc<Graph>),
}

/// One element of a phrase
pub enum PhrasePart {
    /// Literal text, tokenized into one token node per token
    Text(String),
    /// Nested graph, matched through a delegating sub-node
    Graph(Arc<Graph>),
    /// Nested graph whose results must pass an admission filter
    FilteredGraph {
        graph: Arc<Graph>,
        filter: PayloadFilter,
    },
    /// Named value slot
    Value { id: String, source: ValueSource },
    /// Reference back to the graph being built
    SelfRef,
}

impl PhrasePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn graph(graph: Arc<Graph>) -> Self {
        Self::Graph(graph)
    }

    pub fn filtered_graph<F>(graph: Arc<Graph>, filter: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::FilteredGraph {
            graph,
            filter: Arc::new(filter),
        }
    }

    pub fn value(id: impl Into<String>, matcher: Arc<dyn ValueMatcher>) -> Self {
        Self::Value {
            id: id.into(),
            source: ValueSource::Matcher(matcher),
        }
    }

    pub fn graph_value(id: impl Into<String>, graph: Arc<Graph>) -> Self {
        Self::Value {
            id: id.into(),
            source: ValueSource::Graph(graph),
        }
    }

    pub fn self_ref() -> Self {
        Self::SelfRef
    }
}

/// A full phrase, convertible from plain text or explicit parts
pub struct Phrase(pub Vec<PhrasePart>);

impl From<&str> for Phrase {
    fn from(text: &str) -> Self {
        Phrase(vec![PhrasePart::text(text)])
    }
}

impl From<PhrasePart> for Phrase {
    fn from(part: PhrasePart) -> Self {
        Phrase(vec![part])
    }
}

impl From<Vec<PhrasePart>> for Phrase {
    fn from(parts: Vec<PhrasePart>) -> Self {
        Phrase(parts)
    }
}

impl<const N: usize> From<[PhrasePart; N]> for Phrase {
    fn from(parts: [PhrasePart; N]) -> Self {
        Phrase(parts.into())
    }
}

/// Builds an immutable [`Graph`] phrase by phrase
pub struct GraphBuilder {
    language: Arc<dyn Language>,
    roots: Vec<Node>,
    options: GraphOptions,
}

impl GraphBuilder {
    pub fn new(language: Arc<dyn Language>) -> Self {
        Self {
            language,
            roots: Vec::new(),
            options: GraphOptions::default(),
        }
    }

    /// Name the graph, used in logs and as a sub-node label
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    /// Declare that this grammar can resolve incomplete input
    pub fn allow_partial(mut self) -> Self {
        self.options.supports_partial = Some(true);
        self
    }

    /// Declare that disposable tokens may be skipped inside this grammar
    pub fn supports_fuzzy(mut self) -> Self {
        self.options.supports_fuzzy = Some(true);
        self
    }

    /// Declare that punctuation is skipped between this grammar's tokens
    pub fn skip_punctuation(mut self) -> Self {
        self.options.skip_punctuation = Some(true);
        self
    }

    /// Map every final result of this graph into its output shape
    pub fn map_results<F>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let mapper: PayloadMapper = Arc::new(mapper);
        self.options.result_mapper = Some(mapper);
        self
    }

    /// Only the single best interpretation of this graph is of interest
    pub fn only_best(mut self) -> Self {
        self.options.only_best = true;
        self
    }

    /// Add one phrase with its payload mapper
    pub fn add<P, M>(mut self, phrase: P, mapper: M) -> Self
    where
        P: Into<Phrase>,
        M: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        let mapper: DataMapper = Arc::new(mapper);
        let mut chain = self.expand(phrase.into());
        chain.push(Node::end(mapper));
        merge_chain(&mut self.roots, chain.into_iter());
        self
    }

    pub fn build(self) -> Arc<Graph> {
        Arc::new(Graph {
            roots: self.roots,
            options: self.options,
        })
    }

    fn expand(&self, phrase: Phrase) -> Vec<Node> {
        let mut chain = Vec::new();
        for part in phrase.0 {
            match part {
                PhrasePart::Text(text) => {
                    for token in self.language.tokenize(&text) {
                        chain.push(Node::token(token));
                    }
                }
                PhrasePart::Graph(graph) => chain.push(Node::sub(SubNode::graph(graph))),
                PhrasePart::FilteredGraph { graph, filter } => {
                    chain.push(Node::sub(SubNode::graph(graph).with_filter(filter)))
                }
                PhrasePart::Value { id, source } => match source {
                    ValueSource::Matcher(matcher) => chain.push(Node::value(id, matcher)),
                    ValueSource::Graph(graph) => {
                        chain.push(Node::sub(SubNode::tagged(&id, graph)))
                    }
                },
                PhrasePart::SelfRef => chain.push(Node::sub(SubNode::self_ref())),
            }
        }
        chain
    }
}

/// Insert a node chain, descending into structurally equal existing nodes
fn merge_chain(nodes: &mut Vec<Node>, mut chain: std::vec::IntoIter<Node>) {
    let Some(next) = chain.next() else {
        return;
    };
    if let Some(existing) = nodes.iter_mut().find(|node| node.structurally_equal(&next)) {
        merge_chain(&mut existing.outgoing, chain);
    } else {
        let mut head = next;
        if let Some(rest) = link_chain(chain) {
            head.outgoing.push(rest);
        }
        nodes.push(head);
    }
}

/// Fold the remaining chain into one linear run of nodes
fn link_chain(mut chain: std::vec::IntoIter<Node>) -> Option<Node> {
    let mut head = chain.next()?;
    if let Some(rest) = link_chain(chain) {
        head.outgoing.push(rest);
    }
    Some(head)
}
