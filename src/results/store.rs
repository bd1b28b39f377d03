use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{EvalError, EvalResult};
use crate::results::model::{ExperimentRun, RunArtifact, RunId};
use crate::storage::read_json;

/// Source of per-run result artifacts keyed by run and iteration count.
pub trait ResultStore {
    /// `Ok(None)` means the run has not reached `iterations` yet.
    fn load(&self, run: &str, iterations: usize) -> EvalResult<Option<RunArtifact>>;

    /// Like [`ResultStore::load`], but a missing artifact is an
    /// [`EvalError::IncompleteRun`].
    fn require(&self, run: &str, iterations: usize) -> EvalResult<ExperimentRun> {
        match self.load(run, iterations)? {
            Some(artifact) => Ok(ExperimentRun {
                id: run.to_string(),
                iterations,
                artifact,
            }),
            None => Err(EvalError::IncompleteRun {
                run: run.to_string(),
                iterations,
            }),
        }
    }
}

/// Artifacts stored as `<root>/<run>/model_sample<iterations>.json`.
#[derive(Debug, Clone)]
pub struct FsResultStore {
    root: PathBuf,
}

impl FsResultStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, run: &str, iterations: usize) -> PathBuf {
        self.root
            .join(run)
            .join(format!("model_sample{iterations}.json"))
    }
}

impl ResultStore for FsResultStore {
    fn load(&self, run: &str, iterations: usize) -> EvalResult<Option<RunArtifact>> {
        let path = self.artifact_path(run, iterations);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultStore {
    artifacts: HashMap<(RunId, usize), RunArtifact>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, run: impl Into<RunId>, iterations: usize, artifact: RunArtifact) {
        self.artifacts.insert((run.into(), iterations), artifact);
    }
}

impl ResultStore for MemoryResultStore {
    fn load(&self, run: &str, iterations: usize) -> EvalResult<Option<RunArtifact>> {
        Ok(self.artifacts.get(&(run.to_string(), iterations)).cloned())
    }
}
