pub mod error;
pub mod graph;
pub mod language;
pub mod resolver;
pub mod results;
pub mod types;
pub mod values;

pub use error::EngineError;
pub use graph::{Graph, GraphBuilder, MatchOptions, Matcher, Phrase, PhrasePart};
pub use language::{english, EnglishLanguage, Language};
pub use resolver::{Intents, IntentsBuilder, ResolveOptions, ResolvedIntent, ResolverBuilder};
pub use results::{Match, MatchSet};
pub use types::{Span, Token};
pub use values::{Enumeration, Integer, ValueContext, ValueMatch, ValueMatcher};
