//! Engine entry point binding a language and a graph.

use std::sync::Arc;

use crate::error::EngineError;
use crate::graph::encounter::Encounter;
use crate::graph::Graph;
use crate::language::Language;
use crate::results::{Match, MatchEq, MatchSet};

/// Options for one match invocation
pub struct MatchOptions<'a> {
    /// Accept incomplete-but-plausible matches pending more input
    pub partial: bool,
    /// Allow skippable tokens to be dropped at a score penalty
    pub fuzzy: bool,
    /// Skip punctuation between tokens; `None` uses the graph's default
    pub skip_punctuation: Option<bool>,
    /// Drop matches that do not span the whole input
    pub only_complete: bool,
    /// Promote per-step traversal tracing to debug level
    pub verbose: bool,
    /// Payload equality used to deduplicate matches
    pub match_is_equal: Option<MatchEq>,
    /// Override result sink, receiving every match as it is recorded
    pub on_match: Option<Box<dyn FnMut(Match) + 'a>>,
    pub(crate) use_memo: bool,
}

impl Default for MatchOptions<'_> {
    fn default() -> Self {
        Self {
            partial: false,
            fuzzy: false,
            skip_punctuation: None,
            only_complete: false,
            verbose: false,
            match_is_equal: None,
            on_match: None,
            use_memo: true,
        }
    }
}

impl<'a> MatchOptions<'a> {
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }

    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }

    pub fn skip_punctuation(mut self, skip: bool) -> Self {
        self.skip_punctuation = Some(skip);
        self
    }

    pub fn only_complete(mut self) -> Self {
        self.only_complete = true;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn match_is_equal(mut self, is_equal: MatchEq) -> Self {
        self.match_is_equal = Some(is_equal);
        self
    }

    pub fn on_match<F>(mut self, sink: F) -> Self
    where
        F: FnMut(Match) + 'a,
    {
        self.on_match = Some(Box::new(sink));
        self
    }
}

/// Matches input text against one graph.
///
/// Cheap to clone and safe to share; every invocation builds its own
/// traversal context, so one matcher can serve arbitrarily many concurrent
/// callers.
#[derive(Clone)]
pub struct Matcher {
    language: Arc<dyn Language>,
    graph: Arc<Graph>,
}

impl Matcher {
    pub fn new(language: Arc<dyn Language>, graph: Arc<Graph>) -> Self {
        Self { language, graph }
    }

    pub fn language(&self) -> &Arc<dyn Language> {
        &self.language
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Match the text, returning the deduplicated score-ordered result set
    pub fn match_text<'a>(
        &self,
        text: &str,
        options: MatchOptions<'a>,
    ) -> Result<MatchSet, EngineError> {
        let mut encounter = Encounter::new(
            Arc::clone(&self.language),
            Arc::clone(&self.graph),
            text,
            options,
        );
        encounter.run()?;
        Ok(encounter.finish())
    }

    /// Match the text, returning only the single best match
    pub fn best(&self, text: &str, options: MatchOptions<'_>) -> Result<Option<Match>, EngineError> {
        Ok(self.match_text(text, options)?.best())
    }
}
