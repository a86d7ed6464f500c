//! Graph vertices and their matching behavior.
//!
//! A node attempts itself at the context's current position and, on success,
//! continues into its own outgoing list through the context's advance step.
//! Nodes never mutate the graph and restore any transient context state
//! before returning, so sibling alternatives are tried in isolation.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::EngineError;
use crate::graph::encounter::Encounter;
use crate::graph::sub::SubNode;
use crate::types::Token;
use crate::values::{ValueContext, ValueMatcher};

/// Maps the visible capture slice into a match payload
pub type DataMapper = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
/// Maps one payload into another, applied to sub-match results before caching
pub type PayloadMapper = Arc<dyn Fn(Value) -> Value + Send + Sync>;
/// Admission filter over sub-match payloads
pub type PayloadFilter = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Graph vertex with an ordered outgoing list.
///
/// Outgoing order is priority order. Alternatives are nothing more than
/// multiple entries in the same outgoing list.
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) outgoing: Vec<Node>,
}

pub(crate) enum NodeKind {
    /// Matches one input token against a grammar token
    Token(TokenNode),
    /// Delegates token consumption to an external value matcher
    Value(ValueNode),
    /// Delegates into another graph with memoization and cycle guarding
    Sub(SubNode),
    /// Terminal node that maps captures and records a completed match
    End(EndNode),
}

pub(crate) struct TokenNode {
    pub(crate) token: Token,
}

pub(crate) struct ValueNode {
    pub(crate) id: String,
    pub(crate) matcher: Arc<dyn ValueMatcher>,
}

pub(crate) struct EndNode {
    pub(crate) mapper: DataMapper,
}

impl Node {
    pub(crate) fn token(token: Token) -> Self {
        Self {
            kind: NodeKind::Token(TokenNode { token }),
            outgoing: Vec::new(),
        }
    }

    pub(crate) fn value(id: impl Into<String>, matcher: Arc<dyn ValueMatcher>) -> Self {
        Self {
            kind: NodeKind::Value(ValueNode {
                id: id.into(),
                matcher,
            }),
            outgoing: Vec::new(),
        }
    }

    pub(crate) fn sub(sub: SubNode) -> Self {
        Self {
            kind: NodeKind::Sub(sub),
            outgoing: Vec::new(),
        }
    }

    pub(crate) fn end(mapper: DataMapper) -> Self {
        Self {
            kind: NodeKind::End(EndNode { mapper }),
            outgoing: Vec::new(),
        }
    }

    /// Attempt this node at the context's current position
    pub(crate) fn attempt(&self, encounter: &mut Encounter<'_>) -> Result<(), EngineError> {
        match &self.kind {
            NodeKind::Token(node) => node.attempt(encounter, &self.outgoing),
            NodeKind::Value(node) => node.attempt(encounter, &self.outgoing),
            NodeKind::Sub(node) => node.attempt(encounter, &self.outgoing),
            NodeKind::End(node) => {
                node.attempt(encounter);
                Ok(())
            }
        }
    }

    /// Whether this node may consume punctuation itself instead of having it
    /// skipped away before the attempt
    pub(crate) fn supports_punctuation(&self) -> bool {
        matches!(&self.kind, NodeKind::Token(node) if node.token.punctuation)
    }

    /// Structural equality used to merge shared phrase prefixes at build
    /// time. End nodes are never merged so every phrase keeps its mapper.
    pub(crate) fn structurally_equal(&self, other: &Node) -> bool {
        match (&self.kind, &other.kind) {
            (NodeKind::Token(a), NodeKind::Token(b)) => {
                a.token.normalized == b.token.normalized
            }
            (NodeKind::Value(a), NodeKind::Value(b)) => {
                a.id == b.id && Arc::ptr_eq(&a.matcher, &b.matcher)
            }
            (NodeKind::Sub(a), NodeKind::Sub(b)) => a.mergeable_with(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Token(node) => write!(f, "Token({:?})", node.token.normalized),
            NodeKind::Value(node) => write!(f, "Value({})", node.id),
            NodeKind::Sub(node) => write!(f, "Sub({})", node.display_name()),
            NodeKind::End(_) => write!(f, "End"),
        }
    }
}

impl TokenNode {
    fn attempt(
        &self,
        encounter: &mut Encounter<'_>,
        outgoing: &[Node],
    ) -> Result<(), EngineError> {
        let score = match encounter.token() {
            Some(input) if encounter.partial() && encounter.at_last_token() => encounter
                .language()
                .compare_tokens_partial(&self.token, input),
            Some(input) => encounter.language().compare_tokens(&self.token, input),
            None => return Ok(()),
        };
        if score > 0.0 {
            encounter.advance(outgoing, score, 1, None)
        } else {
            Ok(())
        }
    }
}

impl ValueNode {
    fn attempt(
        &self,
        encounter: &mut Encounter<'_>,
        outgoing: &[Node],
    ) -> Result<(), EngineError> {
        if encounter.token().is_none() {
            // Out of input. Under partial matching assume the value arrives
            // with further typing.
            if encounter.partial() {
                return encounter.advance(outgoing, 1.0, 0, None);
            }
            return Ok(());
        }

        let result = {
            let ctx = ValueContext {
                tokens: encounter.remaining_tokens(),
                partial: encounter.partial(),
                language: encounter.language(),
            };
            self.matcher.try_match(&ctx)
        };
        let matched = result.map_err(|err| EngineError::Value {
            id: self.id.clone(),
            reason: format!("{:#}", err),
        })?;

        if let Some(m) = matched {
            let consumed = m.consumed.min(encounter.remaining_tokens().len());
            let payload = json!({ "id": self.id, "value": m.value });
            return encounter.advance(outgoing, m.score, consumed, Some(payload));
        }
        Ok(())
    }
}

impl EndNode {
    fn attempt(&self, encounter: &mut Encounter<'_>) {
        let payload = (self.mapper)(encounter.data());
        encounter.record(payload);
    }
}
