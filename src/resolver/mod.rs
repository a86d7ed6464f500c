//! Intent resolution over phrase templates.
//!
//! A resolver turns templates such as `"show orders for {date}"` into a
//! graph whose matches carry a map of named slot values. The intent registry
//! runs many resolvers over one input and merges their ranked results.

mod template;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::graph::builder::ValueSource;
use crate::graph::{Graph, GraphBuilder, MatchOptions, Matcher, PhrasePart};
use crate::language::Language;
use crate::results::{Match, MatchEq};
use crate::values::ValueMatcher;

use template::{parse_template, TemplatePart};

/// An intent recognized in the input with its filled slots
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedIntent {
    pub intent: String,
    pub values: Map<String, Value>,
    pub score: f64,
    pub partial: bool,
}

impl ResolvedIntent {
    fn from_match(intent: &str, m: Match) -> Self {
        let score = m.score();
        let partial = m.metadata.partial;
        let values = match m.data {
            Value::Object(values) => values,
            _ => Map::new(),
        };
        Self {
            intent: intent.to_string(),
            values,
            score,
            partial,
        }
    }
}

/// Options for one resolution run
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Resolve incomplete input, for typeahead-style use
    pub partial: bool,
    /// Allow disposable tokens between phrase words
    pub fuzzy: bool,
    /// Promote per-step traversal tracing to debug level
    pub verbose: bool,
}

/// Builds the graph for one intent from value registrations and templates
pub struct ResolverBuilder {
    language: Arc<dyn Language>,
    values: HashMap<String, ValueSource>,
    builder: GraphBuilder,
}

impl ResolverBuilder {
    pub fn new(language: Arc<dyn Language>) -> Self {
        // Resolver grammars tolerate typing in progress and filler words
        let builder = GraphBuilder::new(Arc::clone(&language))
            .allow_partial()
            .supports_fuzzy();
        Self {
            language,
            values: HashMap::new(),
            builder,
        }
    }

    /// Register a value matcher under the id used in `{id}` slots
    pub fn value(mut self, id: impl Into<String>, matcher: Arc<dyn ValueMatcher>) -> Self {
        self.values.insert(id.into(), ValueSource::Matcher(matcher));
        self
    }

    /// Register a sub-grammar whose matches become the slot value
    pub fn value_graph(mut self, id: impl Into<String>, graph: Arc<Graph>) -> Self {
        self.values.insert(id.into(), ValueSource::Graph(graph));
        self
    }

    /// Add one phrase template.
    ///
    /// Referencing an unregistered `{id}` fails here, never at match time.
    pub fn phrase(mut self, template: &str) -> Result<Self, EngineError> {
        let mut parts = Vec::new();
        for part in parse_template(template)? {
            match part {
                TemplatePart::Text(text) => parts.push(PhrasePart::text(text)),
                TemplatePart::Slot(id) => {
                    let source = self
                        .values
                        .get(&id)
                        .ok_or_else(|| EngineError::UnknownValue(id.clone()))?
                        .clone();
                    parts.push(match source {
                        ValueSource::Matcher(matcher) => PhrasePart::value(id.as_str(), matcher),
                        ValueSource::Graph(graph) => PhrasePart::graph_value(id.as_str(), graph),
                    });
                }
            }
        }
        self.builder = self.builder.add(parts, collect_slots);
        Ok(self)
    }

    pub(crate) fn named(mut self, name: &str) -> Self {
        self.builder = self.builder.name(name);
        self
    }

    pub fn build(self) -> Arc<Graph> {
        self.builder.build()
    }

    /// The language this resolver tokenizes with
    pub fn language(&self) -> &Arc<dyn Language> {
        &self.language
    }
}

/// Gather captured `{id, value}` payloads into one slot map
fn collect_slots(captures: &[Value]) -> Value {
    let mut values = Map::new();
    for capture in captures {
        if let (Some(id), Some(value)) = (
            capture.get("id").and_then(Value::as_str),
            capture.get("value"),
        ) {
            values.insert(id.to_string(), value.clone());
        }
    }
    Value::Object(values)
}

/// Registers intents and builds the immutable [`Intents`] registry
pub struct IntentsBuilder {
    language: Arc<dyn Language>,
    intents: Vec<(String, Arc<Graph>)>,
}

impl std::fmt::Debug for IntentsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentsBuilder")
            .field(
                "intents",
                &self.intents.iter().map(|(id, _)| id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl IntentsBuilder {
    pub fn new(language: Arc<dyn Language>) -> Self {
        Self {
            language,
            intents: Vec::new(),
        }
    }

    /// Define one intent through its resolver
    pub fn intent<F>(mut self, id: &str, define: F) -> Result<Self, EngineError>
    where
        F: FnOnce(ResolverBuilder) -> Result<ResolverBuilder, EngineError>,
    {
        let resolver = define(ResolverBuilder::new(Arc::clone(&self.language)))?;
        self.intents.push((id.to_string(), resolver.named(id).build()));
        Ok(self)
    }

    pub fn build(self) -> Intents {
        let intents = self
            .intents
            .into_iter()
            .map(|(id, graph)| {
                let matcher = Matcher::new(Arc::clone(&self.language), graph);
                (id, matcher)
            })
            .collect();
        Intents { intents }
    }
}

/// Immutable registry matching input against every registered intent
pub struct Intents {
    intents: Vec<(String, Matcher)>,
}

impl Intents {
    /// Resolve the text against all intents, ranked by descending score
    pub fn match_text(
        &self,
        text: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<ResolvedIntent>, EngineError> {
        let mut resolved = Vec::new();
        for (id, matcher) in &self.intents {
            // Complete runs keep one best interpretation per intent; partial
            // runs keep each distinct slot fill as its own suggestion.
            let is_equal: MatchEq = if options.partial {
                Arc::new(|a: &Value, b: &Value| a == b)
            } else {
                Arc::new(|_: &Value, _: &Value| true)
            };

            let mut match_options = MatchOptions::default().match_is_equal(is_equal);
            match_options.partial = options.partial;
            match_options.fuzzy = options.fuzzy;
            match_options.verbose = options.verbose;
            match_options.only_complete = !options.partial;

            let matches = matcher.match_text(text, match_options)?;
            if matcher.graph().options.only_best {
                if let Some(m) = matches.best() {
                    resolved.push(ResolvedIntent::from_match(id, m));
                }
            } else {
                for m in matches.into_sorted() {
                    resolved.push(ResolvedIntent::from_match(id, m));
                }
            }
        }
        resolved.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(resolved)
    }

    /// Resolve the text, returning only the top-ranked intent
    pub fn best(
        &self,
        text: &str,
        options: &ResolveOptions,
    ) -> Result<Option<ResolvedIntent>, EngineError> {
        Ok(self.match_text(text, options)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::english;
    use crate::values::{Enumeration, Integer};
    use serde_json::json;

    fn sample_intents() -> Intents {
        let lang = english();
        IntentsBuilder::new(Arc::clone(&lang))
            .intent("orders:show", |r| {
                let dates = Enumeration::new(r.language(), &["today", "tomorrow", "yesterday"]);
                r.value("date", dates)
                    .phrase("show orders")?
                    .phrase("show orders for {date}")
            })
            .unwrap()
            .intent("lights:set", |r| {
                let level = Integer::new();
                r.value("level", level).phrase("set lights to {level}")
            })
            .unwrap()
            .build()
    }

    #[test]
    fn test_resolves_intent_with_slot() {
        let intents = sample_intents();
        let resolved = intents
            .match_text("show orders for today", &ResolveOptions::default())
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].intent, "orders:show");
        assert_eq!(resolved[0].values.get("date"), Some(&json!("today")));
        assert!(!resolved[0].partial);
    }

    #[test]
    fn test_resolves_numeric_slot() {
        let intents = sample_intents();
        let best = intents
            .best("set lights to 70", &ResolveOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(best.intent, "lights:set");
        assert_eq!(best.values.get("level"), Some(&json!(70)));
    }

    #[test]
    fn test_unmatched_text_resolves_nothing() {
        let intents = sample_intents();
        let resolved = intents
            .match_text("delete everything", &ResolveOptions::default())
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_incomplete_input_needs_partial() {
        let intents = sample_intents();
        let options = ResolveOptions::default();
        assert!(intents.match_text("show orders for", &options).unwrap().is_empty());

        let partial = ResolveOptions {
            partial: true,
            ..ResolveOptions::default()
        };
        let resolved = intents.match_text("show orders for", &partial).unwrap();
        assert!(!resolved.is_empty());
        assert_eq!(resolved[0].intent, "orders:show");
        assert!(resolved[0].partial);
    }

    #[test]
    fn test_fuzzy_tolerates_filler_words() {
        let intents = sample_intents();
        let options = ResolveOptions {
            fuzzy: true,
            ..ResolveOptions::default()
        };
        let resolved = intents.match_text("show me orders", &options).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].intent, "orders:show");

        // Without fuzzy the filler word blocks the phrase
        let resolved = intents
            .match_text("show me orders", &ResolveOptions::default())
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_unknown_slot_fails_at_build_time() {
        let lang = english();
        let err = IntentsBuilder::new(lang)
            .intent("bad", |r| r.phrase("show {missing}"))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownValue(id) if id == "missing"));
    }

    #[test]
    fn test_graph_backed_slot() {
        let lang = english();
        let time = GraphBuilder::new(Arc::clone(&lang))
            .name("time")
            .add("5 pm", |_| json!({"hour": 17}))
            .add("noon", |_| json!({"hour": 12}))
            .build();
        let intents = IntentsBuilder::new(Arc::clone(&lang))
            .intent("alarm:set", |r| {
                r.value_graph("time", Arc::clone(&time))
                    .phrase("wake me at {time}")
            })
            .unwrap()
            .build();

        let best = intents
            .best("wake me at 5 pm", &ResolveOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(best.intent, "alarm:set");
        assert_eq!(best.values.get("time"), Some(&json!({"hour": 17})));
    }

    #[test]
    fn test_ranking_prefers_more_specific_intent() {
        let lang = english();
        let intents = IntentsBuilder::new(Arc::clone(&lang))
            .intent("orders:show", |r| r.phrase("show orders"))
            .unwrap()
            .intent("orders:all", |r| {
                let scope = Enumeration::new(r.language(), &["orders"]);
                r.value("scope", scope).phrase("show {scope}")
            })
            .unwrap()
            .build();

        let resolved = intents
            .match_text("show orders", &ResolveOptions::default())
            .unwrap();
        assert_eq!(resolved.len(), 2);
        // The literal phrase outranks the generic slot fill
        assert_eq!(resolved[0].intent, "orders:show");
    }
}
