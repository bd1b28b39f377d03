use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::SyntheticConfig;
use crate::error::{EvalError, EvalResult};
use crate::partition::{NodeDistribution, PartitionMatrix};
use crate::storage::{read_json, write_json, DenseMatrixRecord};
use crate::synthetic::generator::{AdjacencyMatrix, GraphStack, SyntheticDataset};

const ARTIFACT_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphRecord {
    edges: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphStackRecord {
    node_count: usize,
    population1_count: usize,
    graphs: Vec<GraphRecord>,
}

impl GraphStackRecord {
    fn from_stack(stack: &GraphStack) -> Self {
        Self {
            node_count: stack.node_count(),
            population1_count: stack.population1_count(),
            graphs: stack
                .graphs()
                .iter()
                .map(|graph| GraphRecord {
                    edges: graph.edges(),
                })
                .collect(),
        }
    }

    fn into_stack(self) -> EvalResult<GraphStack> {
        let graphs = self
            .graphs
            .iter()
            .map(|graph| AdjacencyMatrix::from_edges(self.node_count, &graph.edges))
            .collect::<EvalResult<Vec<_>>>()?;
        GraphStack::new(graphs, self.population1_count)
    }
}

/// Artifact names derived from a dataset's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetNames {
    pub graphs: String,
    pub partition: String,
    pub expected: String,
    pub population1: String,
    pub population2: String,
}

impl DatasetNames {
    pub fn for_config(config: &SyntheticConfig) -> Self {
        let k = config.cluster_count;
        let dist = config.distribution;
        let eta_suffix = format!("{k}_{}", format_significant(config.alpha, 2));
        Self {
            graphs: format!(
                "A_{k}_{}_{}_{dist}_{}",
                config.population1_graphs,
                config.population2_graphs,
                format_significant(config.alpha, 3)
            ),
            partition: format!("Zini_{k}_{dist}"),
            expected: expected_name(k, dist, config.alpha),
            population1: format!("eta_p1_{eta_suffix}"),
            population2: format!("eta_p2_{eta_suffix}"),
        }
    }
}

fn expected_name(cluster_count: usize, distribution: NodeDistribution, alpha: f64) -> String {
    format!(
        "Zexp_{cluster_count}_{distribution}_{}",
        format_significant(alpha, 2)
    )
}

/// Round to `digits` significant digits and print without trailing zeros.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() || digits == 0 {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = digits as i32 - 1 - magnitude;
    let scale = 10f64.powi(decimals);
    let rounded = (value * scale).round() / scale;
    format!("{rounded}")
}

/// Directory of persisted synthetic datasets.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, dataset: &SyntheticDataset) -> EvalResult<DatasetNames> {
        fs::create_dir_all(&self.root).map_err(|source| EvalError::Io {
            path: self.root.clone(),
            source,
        })?;
        let names = DatasetNames::for_config(&dataset.config);

        write_json(
            &self.artifact_path(&names.graphs),
            &GraphStackRecord::from_stack(&dataset.graphs),
        )?;
        write_json(
            &self.artifact_path(&names.partition),
            &DenseMatrixRecord::from_matrix(dataset.partition.as_matrix()),
        )?;
        write_json(
            &self.artifact_path(&names.expected),
            &DenseMatrixRecord::from_matrix(dataset.expected.as_matrix()),
        )?;
        write_json(
            &self.artifact_path(&names.population1),
            &DenseMatrixRecord::from_matrix(dataset.etas.population1.as_matrix()),
        )?;
        write_json(
            &self.artifact_path(&names.population2),
            &DenseMatrixRecord::from_matrix(dataset.etas.population2.as_matrix()),
        )?;

        info!("Wrote dataset {} to {:?}", names.graphs, self.root);
        Ok(names)
    }

    pub fn load_expected_partition(
        &self,
        cluster_count: usize,
        distribution: NodeDistribution,
        alpha: f64,
    ) -> EvalResult<PartitionMatrix> {
        let path = self.artifact_path(&expected_name(cluster_count, distribution, alpha));
        let record: DenseMatrixRecord = read_json(&path)?;
        PartitionMatrix::from_matrix(record.to_matrix()?)
    }

    pub fn load_graph_stack(&self, config: &SyntheticConfig) -> EvalResult<GraphStack> {
        let names = DatasetNames::for_config(config);
        let record: GraphStackRecord = read_json(&self.artifact_path(&names.graphs))?;
        record.into_stack()
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{ARTIFACT_EXTENSION}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_configuration() {
        let config = SyntheticConfig {
            cluster_count: 5,
            population1_graphs: 10,
            population2_graphs: 5,
            distribution: NodeDistribution::Unbalanced,
            alpha: 0.25,
            ..SyntheticConfig::default()
        };
        let names = DatasetNames::for_config(&config);
        assert_eq!(names.graphs, "A_5_10_5_unbalanced_0.25");
        assert_eq!(names.partition, "Zini_5_unbalanced");
        assert_eq!(names.expected, "Zexp_5_unbalanced_0.25");
        assert_eq!(names.population1, "eta_p1_5_0.25");
        assert_eq!(names.population2, "eta_p2_5_0.25");
    }

    #[test]
    fn significant_digits_trim_trailing_zeros() {
        assert_eq!(format_significant(0.0, 2), "0");
        assert_eq!(format_significant(0.5, 3), "0.5");
        assert_eq!(format_significant(0.123456, 3), "0.123");
    }
}
