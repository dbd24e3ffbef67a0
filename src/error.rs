// Error types for context construction, filters and configuration
use thiserror::Error;

/// Failures of the context factory. These are process-configuration bugs:
/// a pipeline that sees one should stop serving rather than retry.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context type '{name}' could not be constructed: {reason}")]
    Construction { name: String, reason: String },

    #[error("unknown context type '{0}'")]
    UnknownContextType(String),
}

impl ContextError {
    pub fn construction(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction { name: name.into(), reason: reason.into() }
    }
}

/// Raised by a filter's `run`. The chain records it and stops.
#[derive(Debug, Clone, Error)]
#[error("filter '{filter}' failed: {message}")]
pub struct FilterError {
    pub filter: String,
    pub message: String,
}

impl FilterError {
    pub fn new(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self { filter: filter.into(), message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Context(#[from] ContextError),
}
