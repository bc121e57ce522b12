use std::{path::PathBuf, time::Duration};

use strum_macros::Display;

/// The external capability a timed-out call was made to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Provider {
    Embedding,
    Completion,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("index at {path} is corrupt: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("nothing has been persisted at {path}")]
    NotFound { path: PathBuf },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("completion failed: {0}")]
    Completion(String),

    #[error("completion did not finish within {after:?}")]
    CompletionTimeout { after: Duration },

    #[error("{provider} provider did not answer within {after:?}")]
    ProviderTimeout { provider: Provider, after: Duration },

    #[error("unknown tool `{name}`")]
    UnknownTool { name: String },

    #[error("model kept requesting tools after {max_cycles} dispatch cycles")]
    ToolLoopExceeded { max_cycles: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session store error: {0}")]
    Session(String),

    #[error("template rendering failed: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::CorruptIndex {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from a backend call (model or embedding service).
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::Embedding(_)
                | Self::Completion(_)
                | Self::CompletionTimeout { .. }
                | Self::ProviderTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = Error::ProviderTimeout {
            provider: Provider::Embedding,
            after: Duration::from_secs(3),
        };
        assert_eq!(err.to_string(), "embedding provider did not answer within 3s");
        assert!(err.is_provider_failure());

        let err = Error::UnknownTool {
            name: "lookup".into(),
        };
        assert_eq!(err.to_string(), "unknown tool `lookup`");
        assert!(!err.is_provider_failure());
    }
}
