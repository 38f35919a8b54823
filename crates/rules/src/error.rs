//! Error types for configuration and evaluation.

use crate::backend::BackendError;

/// Invalid event definition configuration, rejected at construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("stream id must not be empty")]
    EmptyStream,

    #[error("unknown threshold type '{0}', expected MORE or LESS")]
    UnknownThresholdType(String),

    #[error("empty field name in {0}")]
    EmptyFieldName(&'static str),

    #[error("unsupported definition kind '{0}', expected AggregationCount")]
    UnsupportedKind(String),

    #[error("definition id must not be empty")]
    EmptyId,
}

/// Failure of a single evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("{operation} request failed: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: BackendError,
    },
}

impl EvaluationError {
    pub(crate) fn backend(operation: &'static str) -> impl FnOnce(BackendError) -> Self {
        move |source| EvaluationError::Backend { operation, source }
    }
}
