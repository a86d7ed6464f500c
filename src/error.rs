use thiserror::Error;

/// Errors that can occur while building grammars or matching input
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no value matcher registered for '{0}'")]
    UnknownValue(String),

    #[error("invalid phrase template: {0}")]
    Template(String),

    #[error("phrase template has no parts")]
    EmptyTemplate,

    #[error("value matcher '{id}' failed: {reason}")]
    Value { id: String, reason: String },
}
