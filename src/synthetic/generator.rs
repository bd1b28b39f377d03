use log::{debug, info};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::config::SyntheticConfig;
use crate::error::{EvalError, EvalResult};
use crate::partition::PartitionMatrix;
use crate::synthetic::link_probability::{
    LinkProbabilityMatrix, LinkProbabilityModel, PopulationEtas,
};

/// Binary symmetric node adjacency without self-loops.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    matrix: DMatrix<u8>,
}

impl AdjacencyMatrix {
    pub fn new(matrix: DMatrix<u8>) -> EvalResult<Self> {
        if !matrix.is_square() {
            return Err(EvalError::Validation(format!(
                "adjacency matrix must be square, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if matrix.iter().any(|v| *v > 1) {
            return Err(EvalError::Validation(
                "adjacency matrix entries must be 0 or 1".to_string(),
            ));
        }
        if (0..matrix.nrows()).any(|i| matrix[(i, i)] != 0) {
            return Err(EvalError::Validation(
                "adjacency matrix has a self-loop".to_string(),
            ));
        }
        if matrix != matrix.transpose() {
            return Err(EvalError::Validation(
                "adjacency matrix is not symmetric".to_string(),
            ));
        }
        Ok(Self { matrix })
    }

    /// Build from undirected edges given as node index pairs.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> EvalResult<Self> {
        let mut matrix = DMatrix::zeros(node_count, node_count);
        for &(i, j) in edges {
            if i >= node_count || j >= node_count {
                return Err(EvalError::ShapeMismatch(format!(
                    "edge ({i}, {j}) out of range for {node_count} nodes"
                )));
            }
            matrix[(i, j)] = 1;
            matrix[(j, i)] = 1;
        }
        Self::new(matrix)
    }

    pub fn node_count(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        self.matrix[(i, j)] == 1
    }

    /// Undirected edges `(i, j)` with `i < j`, in row-major order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let n = self.node_count();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.has_edge(i, j))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.matrix.iter().map(|v| *v as usize).sum::<usize>() / 2
    }

    pub fn as_matrix(&self) -> &DMatrix<u8> {
        &self.matrix
    }
}

/// Ordered graph instances: the first `population1_count` belong to population 1.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStack {
    graphs: Vec<AdjacencyMatrix>,
    population1_count: usize,
}

impl GraphStack {
    pub fn new(graphs: Vec<AdjacencyMatrix>, population1_count: usize) -> EvalResult<Self> {
        if population1_count > graphs.len() {
            return Err(EvalError::ShapeMismatch(format!(
                "population 1 claims {population1_count} graphs but the stack holds {}",
                graphs.len()
            )));
        }
        if let Some(first) = graphs.first() {
            let n = first.node_count();
            if let Some(other) = graphs.iter().find(|g| g.node_count() != n) {
                return Err(EvalError::ShapeMismatch(format!(
                    "graph stack mixes {n}-node and {}-node graphs",
                    other.node_count()
                )));
            }
        }
        Ok(Self {
            graphs,
            population1_count,
        })
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.graphs.first().map(AdjacencyMatrix::node_count).unwrap_or(0)
    }

    pub fn population1_count(&self) -> usize {
        self.population1_count
    }

    pub fn graphs(&self) -> &[AdjacencyMatrix] {
        &self.graphs
    }

    pub fn population1(&self) -> &[AdjacencyMatrix] {
        &self.graphs[..self.population1_count]
    }

    pub fn population2(&self) -> &[AdjacencyMatrix] {
        &self.graphs[self.population1_count..]
    }
}

/// Everything produced for one synthetic configuration.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub config: SyntheticConfig,
    pub seed: u64,
    pub graphs: GraphStack,
    pub partition: PartitionMatrix,
    pub expected: PartitionMatrix,
    pub etas: PopulationEtas,
}

pub struct SyntheticGraphGenerator {
    config: SyntheticConfig,
}

impl SyntheticGraphGenerator {
    pub fn new(config: SyntheticConfig) -> EvalResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Generate the partition, population matrices, graph stack and expected
    /// partition. The same config and seed always yield the same dataset.
    pub fn generate(&self) -> EvalResult<SyntheticDataset> {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(random_seed);
        if config.seed.is_none() {
            info!("No seed supplied, using time-derived seed {seed}");
        }

        let sizes = config
            .distribution
            .block_sizes(config.cluster_count, config.node_count)?;
        let partition = PartitionMatrix::from_block_sizes(&sizes)?;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let etas = LinkProbabilityModel::new(config.cluster_count, config.mixing())?
            .sample(&mut rng)?;

        let graphs = Self::sample_graphs(
            &partition,
            &etas.population1,
            &etas.population2,
            config.population1_graphs,
            config.population2_graphs,
            seed,
        )?;
        let expected = Self::expected_partition(
            &partition,
            &etas.population1,
            &etas.population2,
            config.difference_tolerance,
        )?;

        info!(
            "Generated {} graphs over {} nodes (K={}, {}, alpha {}), expected clusters {}",
            graphs.len(),
            partition.node_count(),
            config.cluster_count,
            config.distribution,
            config.alpha,
            expected.cluster_count()
        );

        Ok(SyntheticDataset {
            config: config.clone(),
            seed,
            graphs,
            partition,
            expected,
            etas,
        })
    }

    /// Sample `s1 + s2` graphs; graph `s` draws its thresholds from its own
    /// generator seeded with `seed + 1 + s`, so sampling order does not matter.
    pub fn sample_graphs(
        partition: &PartitionMatrix,
        population1: &LinkProbabilityMatrix,
        population2: &LinkProbabilityMatrix,
        s1: usize,
        s2: usize,
        seed: u64,
    ) -> EvalResult<GraphStack> {
        let m1 = node_link_probabilities(partition, population1)?;
        let m2 = node_link_probabilities(partition, population2)?;

        let graphs: Vec<AdjacencyMatrix> = (0..s1 + s2)
            .into_par_iter()
            .map(|s| {
                let mut rng =
                    Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(1 + s as u64));
                let means = if s < s1 { &m1 } else { &m2 };
                sample_adjacency(means, &mut rng)
            })
            .collect::<EvalResult<_>>()?;

        GraphStack::new(graphs, s1)
    }

    /// Clusters whose off-diagonal link probabilities differ between the
    /// populations by more than `tolerance`.
    pub fn difference_clusters(
        population1: &LinkProbabilityMatrix,
        population2: &LinkProbabilityMatrix,
        tolerance: f64,
    ) -> EvalResult<Vec<usize>> {
        let k = population1.cluster_count();
        if population2.cluster_count() != k {
            return Err(EvalError::ShapeMismatch(format!(
                "population matrices have {k} and {} clusters",
                population2.cluster_count()
            )));
        }
        let diff = population1.as_matrix() - population2.as_matrix();
        Ok((0..k)
            .filter(|&c| (0..k).any(|j| j != c && diff[(c, j)].abs() > tolerance))
            .collect())
    }

    /// Ground-truth partition a recovery method can be expected to find.
    ///
    /// Each difference cluster keeps its own column. Nodes of all other
    /// clusters merge into one trailing remainder column, which is omitted when
    /// no such nodes exist. Without difference clusters every node lands in a
    /// single cluster.
    pub fn expected_partition(
        partition: &PartitionMatrix,
        population1: &LinkProbabilityMatrix,
        population2: &LinkProbabilityMatrix,
        tolerance: f64,
    ) -> EvalResult<PartitionMatrix> {
        if population1.cluster_count() != partition.cluster_count() {
            return Err(EvalError::ShapeMismatch(format!(
                "partition has {} clusters, link probabilities have {}",
                partition.cluster_count(),
                population1.cluster_count()
            )));
        }
        let diff_clusters = Self::difference_clusters(population1, population2, tolerance)?;
        debug!("Difference clusters: {:?}", diff_clusters);

        let node_count = partition.node_count();
        if diff_clusters.is_empty() {
            return PartitionMatrix::from_labels(&vec![0; node_count], 1);
        }

        let mut new_label = vec![None; partition.cluster_count()];
        for (position, cluster) in diff_clusters.iter().enumerate() {
            new_label[*cluster] = Some(position);
        }
        let remainder = diff_clusters.len();
        let labels: Vec<usize> = partition
            .labels()
            .iter()
            .map(|label| new_label[*label].unwrap_or(remainder))
            .collect();
        let has_remainder = labels.iter().any(|label| *label == remainder);
        let cluster_count = if has_remainder {
            remainder + 1
        } else {
            remainder
        };
        PartitionMatrix::from_labels(&labels, cluster_count)
    }
}

/// `Z · eta · Zᵗ`: link probability between every pair of nodes.
pub fn node_link_probabilities(
    partition: &PartitionMatrix,
    eta: &LinkProbabilityMatrix,
) -> EvalResult<DMatrix<f64>> {
    if partition.cluster_count() != eta.cluster_count() {
        return Err(EvalError::ShapeMismatch(format!(
            "partition has {} clusters, link probabilities have {}",
            partition.cluster_count(),
            eta.cluster_count()
        )));
    }
    let z = partition.as_matrix();
    Ok(z * eta.as_matrix() * z.transpose())
}

/// One graph: an edge exists where the mean strictly exceeds a uniform
/// threshold. Only the strict upper triangle is used and then mirrored.
fn sample_adjacency<R: Rng>(means: &DMatrix<f64>, rng: &mut R) -> EvalResult<AdjacencyMatrix> {
    let n = means.nrows();
    let mut thresholds = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            thresholds[(i, j)] = rng.gen::<f64>();
        }
    }
    let matrix = DMatrix::from_fn(n, n, |i, j| {
        let (row, col) = if i < j { (i, j) } else { (j, i) };
        if row != col && means[(row, col)] > thresholds[(row, col)] {
            1u8
        } else {
            0u8
        }
    });
    AdjacencyMatrix::new(matrix)
}

fn random_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::NodeDistribution;

    fn eta(values: &[f64], k: usize) -> LinkProbabilityMatrix {
        LinkProbabilityMatrix::new(DMatrix::from_row_slice(k, k, values)).expect("eta")
    }

    #[test]
    fn node_probabilities_follow_cluster_membership() {
        let partition = PartitionMatrix::from_block_sizes(&[2, 1]).expect("partition");
        let eta = eta(&[0.9, 0.2, 0.2, 0.8], 2);
        let m = node_link_probabilities(&partition, &eta).expect("means");
        assert_eq!(m[(0, 1)], 0.9);
        assert_eq!(m[(0, 2)], 0.2);
        assert_eq!(m[(2, 2)], 0.8);
    }

    #[test]
    fn certain_and_impossible_links() {
        let partition = PartitionMatrix::from_block_sizes(&[3, 3]).expect("partition");
        let always = eta(&[1.0, 0.0, 0.0, 1.0], 2);
        let stack =
            SyntheticGraphGenerator::sample_graphs(&partition, &always, &always, 1, 0, 9)
                .expect("stack");
        let graph = &stack.graphs()[0];
        assert!(graph.has_edge(0, 1) && graph.has_edge(3, 5));
        assert!(!graph.has_edge(0, 3), "zero probability never beats a threshold");
        assert!(!graph.has_edge(0, 0));
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn identical_populations_collapse_to_one_cluster() {
        let partition = PartitionMatrix::from_block_sizes(&[4, 4, 2]).expect("partition");
        let same = eta(&[0.5, 0.3, 0.3, 0.3, 0.5, 0.3, 0.3, 0.3, 0.5], 3);
        let expected =
            SyntheticGraphGenerator::expected_partition(&partition, &same, &same, 0.0)
                .expect("expected");
        assert_eq!(expected.cluster_count(), 1);
        assert_eq!(expected.node_count(), 10);
    }

    #[test]
    fn undistinguished_clusters_merge_into_remainder() {
        let partition = PartitionMatrix::from_block_sizes(&[2, 2, 2]).expect("partition");
        let p1 = eta(&[0.9, 0.3, 0.2, 0.3, 0.9, 0.2, 0.2, 0.2, 0.9], 3);
        let p2 = eta(&[0.9, 0.1, 0.2, 0.1, 0.9, 0.2, 0.2, 0.2, 0.9], 3);
        let diff = SyntheticGraphGenerator::difference_clusters(&p1, &p2, 0.0).expect("diff");
        assert_eq!(diff, vec![0, 1]);
        let expected =
            SyntheticGraphGenerator::expected_partition(&partition, &p1, &p2, 0.0)
                .expect("expected");
        assert_eq!(expected.labels(), &[0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn no_remainder_column_when_every_cluster_differs() {
        let partition = PartitionMatrix::from_block_sizes(&[3, 2]).expect("partition");
        let p1 = eta(&[0.9, 0.3, 0.3, 0.9], 2);
        let p2 = eta(&[0.1, 0.7, 0.7, 0.1], 2);
        let expected =
            SyntheticGraphGenerator::expected_partition(&partition, &p1, &p2, 0.0)
                .expect("expected");
        assert_eq!(expected, partition);
    }

    #[test]
    fn generation_is_reproducible_for_a_seed() {
        let config = SyntheticConfig {
            cluster_count: 5,
            distribution: NodeDistribution::Unbalanced,
            alpha: 0.1,
            seed: Some(42),
            ..SyntheticConfig::default()
        };
        let first = SyntheticGraphGenerator::new(config.clone())
            .and_then(|g| g.generate())
            .expect("first dataset");
        let second = SyntheticGraphGenerator::new(config)
            .and_then(|g| g.generate())
            .expect("second dataset");
        assert_eq!(first.graphs, second.graphs);
        assert_eq!(first.etas.population1, second.etas.population1);
        assert_eq!(first.expected, second.expected);
    }

    #[test]
    fn stack_rejects_mixed_node_counts() {
        let a = AdjacencyMatrix::from_edges(3, &[(0, 1)]).expect("a");
        let b = AdjacencyMatrix::from_edges(4, &[(2, 3)]).expect("b");
        assert!(matches!(
            GraphStack::new(vec![a, b], 1),
            Err(EvalError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn adjacency_rejects_self_loops() {
        let mut matrix = DMatrix::zeros(2, 2);
        matrix[(1, 1)] = 1u8;
        assert!(AdjacencyMatrix::new(matrix).is_err());
    }
}
