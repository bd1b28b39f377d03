use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};
use crate::partition::NodeDistribution;

/// Parameters identifying one synthetic dataset.
///
/// `alpha` is the user-facing mixing value in `[0, 0.5]`: 0 keeps the two
/// populations maximally different, 0.5 makes them identical. The link
/// probability model consumes the doubled value returned by [`Self::mixing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub cluster_count: usize,
    pub population1_graphs: usize,
    pub population2_graphs: usize,
    pub distribution: NodeDistribution,
    pub alpha: f64,
    pub seed: Option<u64>,
    pub node_count: usize,
    /// Largest absolute population difference still treated as "no difference".
    pub difference_tolerance: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            cluster_count: 2,
            population1_graphs: 5,
            population2_graphs: 5,
            distribution: NodeDistribution::Balanced,
            alpha: 0.0,
            seed: Some(0),
            node_count: 100,
            difference_tolerance: 0.0,
        }
    }
}

impl SyntheticConfig {
    pub fn mixing(&self) -> f64 {
        2.0 * self.alpha
    }

    pub fn graph_count(&self) -> usize {
        self.population1_graphs + self.population2_graphs
    }

    pub fn validate(&self) -> EvalResult<()> {
        if self.cluster_count == 0 {
            return Err(EvalError::Configuration(
                "cluster_count must be at least 1".to_string(),
            ));
        }
        if self.node_count == 0 {
            return Err(EvalError::Configuration(
                "node_count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=0.5).contains(&self.alpha) {
            return Err(EvalError::Configuration(format!(
                "alpha must be in [0, 0.5], got {}",
                self.alpha
            )));
        }
        if self.graph_count() == 0 {
            return Err(EvalError::Configuration(
                "at least one graph must be requested across both populations".to_string(),
            ));
        }
        if !(self.difference_tolerance >= 0.0) {
            return Err(EvalError::Configuration(format!(
                "difference_tolerance must be non-negative, got {}",
                self.difference_tolerance
            )));
        }
        Ok(())
    }
}

/// Maps a run's initial cluster count to the iteration count whose artifact
/// marks the run as done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationPolicy {
    pub default_iterations: usize,
    pub large_init_threshold: usize,
    pub large_init_iterations: usize,
}

impl Default for IterationPolicy {
    fn default() -> Self {
        Self {
            default_iterations: 100,
            large_init_threshold: 100,
            large_init_iterations: 30,
        }
    }
}

impl IterationPolicy {
    pub fn required_iterations(&self, initial_clusters: Option<i64>) -> usize {
        match initial_clusters {
            Some(noc) if noc >= self.large_init_threshold as i64 => self.large_init_iterations,
            _ => self.default_iterations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub iterations: IterationPolicy,
    /// Configuration key holding the model's initial cluster count.
    pub initial_clusters_key: String,
    /// Per-iteration parameters summarised for every group.
    pub traced_parameters: Vec<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            iterations: IterationPolicy::default(),
            initial_clusters_key: "noc".to_string(),
            traced_parameters: vec!["logP".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub synthetic: SyntheticConfig,
    pub evaluation: EvaluationConfig,
}

impl AppConfig {
    pub fn from_path(path: &Path) -> EvalResult<Self> {
        let file = File::open(path).map_err(|source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| EvalError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.synthetic.validate()?;
        Ok(config)
    }
}
