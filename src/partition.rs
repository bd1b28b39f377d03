use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};

/// How the nodes of a synthetic dataset are spread over its clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeDistribution {
    Balanced,
    Unbalanced,
}

/// Hand-specified cluster sizes for the unbalanced layout; each list sums to 100.
const UNBALANCED_SIZES: [(usize, &[usize]); 3] = [
    (2, &[70, 30]),
    (5, &[60, 20, 10, 5, 5]),
    (10, &[20, 20, 10, 10, 10, 10, 5, 5, 5, 5]),
];

impl NodeDistribution {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeDistribution::Balanced => "balanced",
            NodeDistribution::Unbalanced => "unbalanced",
        }
    }

    /// Cluster block sizes for `cluster_count` clusters over `node_count` nodes.
    ///
    /// Balanced blocks all have `node_count / cluster_count` nodes; the integer
    /// division truncates, so the partition covers `cluster_count * block` nodes
    /// and any remainder is left out of the dataset.
    pub fn block_sizes(self, cluster_count: usize, node_count: usize) -> EvalResult<Vec<usize>> {
        if cluster_count == 0 {
            return Err(EvalError::Configuration(
                "cluster count must be at least 1".to_string(),
            ));
        }
        match self {
            NodeDistribution::Balanced => {
                let block = node_count / cluster_count;
                if block == 0 {
                    return Err(EvalError::Configuration(format!(
                        "cannot split {node_count} nodes into {cluster_count} balanced clusters"
                    )));
                }
                Ok(vec![block; cluster_count])
            }
            NodeDistribution::Unbalanced => {
                let sizes = UNBALANCED_SIZES
                    .iter()
                    .find(|(k, _)| *k == cluster_count)
                    .map(|(_, sizes)| sizes.to_vec())
                    .ok_or_else(|| {
                        EvalError::Configuration(format!(
                            "unbalanced distribution is not defined for K={cluster_count} (supported: 2, 5, 10)"
                        ))
                    })?;
                let total: usize = sizes.iter().sum();
                if total != node_count {
                    return Err(EvalError::Configuration(format!(
                        "unbalanced distribution for K={cluster_count} covers {total} nodes, not {node_count}"
                    )));
                }
                Ok(sizes)
            }
        }
    }
}

impl fmt::Display for NodeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeDistribution {
    type Err = EvalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "balanced" => Ok(NodeDistribution::Balanced),
            "unbalanced" => Ok(NodeDistribution::Unbalanced),
            other => Err(EvalError::Configuration(format!(
                "unknown node distribution '{other}'"
            ))),
        }
    }
}

/// Hard N×K cluster assignment: each row holds exactly one 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionMatrix {
    matrix: DMatrix<f64>,
    labels: Vec<usize>,
}

impl PartitionMatrix {
    /// Validate a 0/1 matrix whose rows each sum to one.
    pub fn from_matrix(matrix: DMatrix<f64>) -> EvalResult<Self> {
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(EvalError::Validation(format!(
                "partition must have at least one node and one cluster, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        let mut labels = Vec::with_capacity(matrix.nrows());
        for (row_idx, row) in matrix.row_iter().enumerate() {
            let mut label = None;
            for (col, value) in row.iter().enumerate() {
                if *value == 1.0 {
                    if label.is_some() {
                        return Err(EvalError::Validation(format!(
                            "node {row_idx} is assigned to more than one cluster"
                        )));
                    }
                    label = Some(col);
                } else if *value != 0.0 {
                    return Err(EvalError::Validation(format!(
                        "node {row_idx} has non-binary entry {value} in cluster {col}"
                    )));
                }
            }
            let label = label.ok_or_else(|| {
                EvalError::Validation(format!("node {row_idx} is not assigned to any cluster"))
            })?;
            labels.push(label);
        }
        Ok(Self { matrix, labels })
    }

    pub fn from_labels(labels: &[usize], cluster_count: usize) -> EvalResult<Self> {
        if let Some((node, label)) = labels
            .iter()
            .enumerate()
            .find(|(_, label)| **label >= cluster_count)
        {
            return Err(EvalError::Validation(format!(
                "node {node} has label {label}, but only {cluster_count} clusters exist"
            )));
        }
        let matrix = DMatrix::from_fn(labels.len(), cluster_count, |i, k| {
            if labels[i] == k {
                1.0
            } else {
                0.0
            }
        });
        Self::from_matrix(matrix)
    }

    /// Contiguous blocks: the first `sizes[0]` nodes form cluster 0, and so on.
    pub fn from_block_sizes(sizes: &[usize]) -> EvalResult<Self> {
        let labels: Vec<usize> = sizes
            .iter()
            .enumerate()
            .flat_map(|(k, size)| std::iter::repeat(k).take(*size))
            .collect();
        Self::from_labels(&labels, sizes.len())
    }

    pub fn node_count(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn cluster_count(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.cluster_count()];
        for label in &self.labels {
            sizes[*label] += 1;
        }
        sizes
    }
}

/// Row-wise index of the largest entry; the first maximum wins on ties.
///
/// Works for soft assignment matrices as well as hard ones.
pub fn argmax_labels(matrix: &DMatrix<f64>) -> Vec<usize> {
    matrix
        .row_iter()
        .map(|row| {
            let mut best = 0;
            let mut best_value = f64::NEG_INFINITY;
            for (col, value) in row.iter().enumerate() {
                if *value > best_value {
                    best = col;
                    best_value = *value;
                }
            }
            best
        })
        .collect()
}
