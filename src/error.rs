use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by generation and evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Unsupported or out-of-range configuration, or an empty run group.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The run has no result artifact for the required iteration count.
    #[error("run '{run}' is incomplete: no result artifact for {iterations} iterations")]
    IncompleteRun { run: String, iterations: usize },

    /// Node counts, trace lengths or matrix dimensions disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A matrix violated its construction invariants.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub fn is_incomplete_run(&self) -> bool {
        matches!(self, EvalError::IncompleteRun { .. })
    }
}
